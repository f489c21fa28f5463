//! stdio transport: one JSON-RPC message per line.
//!
//! stdout carries protocol traffic only; logs go to stderr.

use crate::mcp::{McpServer, TransportError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Serve on the process's stdin and stdout until stdin closes.
pub async fn serve(server: &McpServer) -> Result<(), TransportError> {
    info!("MCP server ready on stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(server, stdin, stdout).await?;
    info!("stdin closed, stopping");
    Ok(())
}

/// Read newline-delimited messages from `reader` and write each reply as a
/// single line to `writer`. Blank lines are skipped.
pub async fn serve_lines<R, W>(
    server: &McpServer,
    reader: R,
    mut writer: W,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(reply) = server.handle_message(line).await {
            debug!("Replying with {} bytes", reply.len());
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    Ok(())
}
