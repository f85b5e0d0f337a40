//! Line-delimited JSON over stdin/stdout: one request line in, one reply
//! line out, flushed immediately. Log output never goes through here.

use crate::model::{GenParams, LlmBackend};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

#[derive(Deserialize, Debug)]
pub struct Request {
    #[serde(default)]
    pub prompt: String,
}

/// Exactly one of `response` or `error`, never both.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum Reply {
    Response { response: String },
    Error { error: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid request line: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Generate(#[from] anyhow::Error),
}

fn handle_line<B: LlmBackend>(
    backend: &B,
    params: &GenParams,
    line: &str,
) -> Result<String, RequestError> {
    let req: Request = serde_json::from_str(line)?;
    Ok(backend.complete(&req.prompt, params)?)
}

fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, reply).map_err(io::Error::from)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Serve requests until end of input or a blank line. A failed request
/// produces an `error` reply and the loop keeps going; a failed write means
/// the peer is gone and ends the loop.
pub fn serve<B, R, W>(backend: &B, params: &GenParams, reader: R, mut writer: W) -> io::Result<()>
where
    B: LlmBackend,
    R: BufRead,
    W: Write,
{
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            break;
        }

        let reply = match handle_line(backend, params, &line) {
            Ok(text) => Reply::Response { response: text },
            Err(e) => {
                tracing::error!(error = %e, "request failed");
                Reply::Error { error: e.to_string() }
            }
        };

        if write_reply(&mut writer, &reply).is_err() {
            break;
        }
    }
    Ok(())
}
