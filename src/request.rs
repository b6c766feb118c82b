//! Request/response contract for the generate operation, independent of
//! any particular HTTP server.

use crate::docx::DOCX_MIME;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

pub const INVALID_TEXT_MESSAGE: &str = "Input \"text\" must be a string.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate docx.";
pub const DOWNLOAD_FILENAME: &str = "output.docx";

#[derive(Debug, Serialize)]
struct FilePayload<'a> {
    file: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Response {
    fn json(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body,
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }).to_string().into_bytes())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Pull the `text` field out of a JSON request body. The body must be an
/// object.
pub fn parse_request(body: &[u8]) -> Result<String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::InvalidInput(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(Error::InvalidInput(format!("body is {}", kind_of(&value))));
    };
    match fields.remove("text").unwrap_or(Value::Null) {
        Value::String(text) => Ok(text),
        other => Err(Error::InvalidInput(format!("text is {}", kind_of(&other)))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "missing or null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn generate(text: &str, download: bool) -> Result<Response> {
    let bytes = crate::markup_to_docx(text)?;
    info!(input = text.len(), output = bytes.len(), download, "generated docx");

    if download {
        return Ok(Response {
            status: 200,
            headers: vec![
                (
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME),
                ),
                ("Content-Type", DOCX_MIME.to_string()),
            ],
            body: bytes,
        });
    }

    let encoded = STANDARD.encode(&bytes);
    let body = serde_json::to_vec(&FilePayload { file: &encoded })?;
    Ok(Response::json(200, body))
}

/// Handle one generate request. Failures past validation are reported
/// with a fixed message; the detail only goes to the log.
pub fn handle_request(body: &[u8], download: bool) -> Response {
    let text = match parse_request(body) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "rejected request");
            return Response::error(400, INVALID_TEXT_MESSAGE);
        }
    };

    match generate(&text, download) {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, "failed to generate docx");
            Response::error(500, GENERIC_FAILURE_MESSAGE)
        }
    }
}
