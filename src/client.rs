//! Client side of the wire protocol.
//!
//! Every CLI invocation is disconnected from the last: dial, send one
//! request, read one response, hang up. Connection-refused is the signal
//! that no daemon is running.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::server::protocol::{self, Request, Response};

/// Dial the daemon at `addr`, send `request`, and read the response.
pub async fn call(addr: &str, request: &Request) -> Result<Response> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|_| Error::DaemonUnreachable(addr.to_string()))?;
    let (reader, mut writer) = stream.into_split();

    writer
        .write_all(protocol::encode(request).as_bytes())
        .await?;
    writer.flush().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    if line.trim().is_empty() {
        return Err(Error::Decode("empty response from daemon".to_string()));
    }
    serde_json::from_str(line.trim())
        .map_err(|e| Error::Decode(format!("bad response envelope: {e}")))
}

/// Liveness probe: true when a daemon answers `ping` at `addr`.
pub async fn ping(addr: &str) -> bool {
    matches!(call(addr, &Request::bare("ping")).await, Ok(r) if r.is_success())
}
