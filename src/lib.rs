//! Convert constrained markup (an HTML subset plus `**bold**`,
//! `{red}..{/red}` and `[text](url)`) into `.docx` files.

pub mod assemble;
pub mod docx;
pub mod error;
pub mod inline;
pub mod markup;
pub mod model;
pub mod request;
pub mod table;
pub mod walker;

pub use error::{Error, Result};
pub use model::DocumentModel;

/// Parse and walk `text` into an encoder-ready document. Never fails.
pub fn markup_to_document(text: &str) -> DocumentModel {
    let nodes = markup::parse(text);
    assemble::assemble(walker::walk_document(&nodes))
}

pub fn markup_to_docx(text: &str) -> Result<Vec<u8>> {
    docx::encode(&markup_to_document(text))
}
