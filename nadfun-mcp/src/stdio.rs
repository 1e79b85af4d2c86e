//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Stdout carries protocol messages only; logs go to stderr.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::server::{NadfunTools, ToolContext};

pub async fn serve_stdio(tools: &NadfunTools, ctx: ToolContext) -> std::io::Result<()> {
    tracing::info!(session = ctx.session_id.is_some(), "MCP server running on stdio");
    serve_lines(tools, &ctx, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Serve until `reader` reaches EOF. Requests are handled one at a time in
/// arrival order.
pub async fn serve_lines<R, W>(
    tools: &NadfunTools,
    ctx: &ToolContext,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
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
        if let Some(out) = tools.handle_message(line, ctx).await {
            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
