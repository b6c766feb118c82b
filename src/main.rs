use anyhow::{bail, Context, Result};
use clap::Parser;
use docx_from_markup::request::{handle_request, DOWNLOAD_FILENAME};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Markup text to convert.
    #[arg(long, conflicts_with_all = ["text_file", "request_file"])]
    text: Option<String>,

    /// File holding the markup text.
    #[arg(long, conflicts_with = "request_file")]
    text_file: Option<PathBuf>,

    /// JSON request body (`{"text": "..."}`). Read from stdin when no input is given.
    #[arg(long)]
    request_file: Option<PathBuf>,

    /// Write the raw .docx instead of a base64 JSON payload.
    #[arg(long)]
    download: bool,

    /// Output path. Defaults to output.docx with --download, stdout otherwise.
    #[arg(long)]
    out: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(path: &Path) -> Result<String> {
    let mut s = String::new();
    File::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .read_to_string(&mut s)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(s)
}

fn request_body(args: &Args) -> Result<Vec<u8>> {
    if let Some(text) = &args.text {
        return Ok(serde_json::to_vec(&serde_json::json!({ "text": text }))?);
    }
    if let Some(path) = &args.text_file {
        let text = read_file(path)?;
        return Ok(serde_json::to_vec(&serde_json::json!({ "text": text }))?);
    }
    if let Some(path) = &args.request_file {
        return Ok(read_file(path)?.into_bytes());
    }
    let mut body = Vec::new();
    std::io::stdin()
        .read_to_end(&mut body)
        .context("read request from stdin")?;
    Ok(body)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let body = request_body(&args)?;
    let resp = handle_request(&body, args.download);
    if !resp.is_success() {
        let msg = String::from_utf8_lossy(&resp.body).into_owned();
        bail!("request failed with status {}: {}", resp.status, msg);
    }

    let out = match (&args.out, args.download) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(DOWNLOAD_FILENAME)),
        (None, false) => None,
    };

    match out {
        Some(path) => {
            let mut f =
                File::create(&path).with_context(|| format!("create {}", path.display()))?;
            f.write_all(&resp.body)
                .with_context(|| format!("write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = resp.body.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&resp.body)?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
