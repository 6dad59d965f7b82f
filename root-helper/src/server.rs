use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use wgctl_broker::execute;
use wgctl_protocol::HelperRequest;
use wgctl_protocol::HelperResponse;

/// Runs the worker loop over an arbitrary line-oriented transport. One
/// request in flight at a time, one response line per request line, strict
/// FIFO. A request that fails to decode – or fails to run – produces an
/// `error` response and the loop keeps reading; only end-of-input ends it.
pub async fn serve<R, W>(reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let response = handle_line(&line).await;
        let payload = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    debug!("request stream closed, worker exiting");
    Ok(())
}

async fn handle_line(line: &str) -> HelperResponse {
    let request = match serde_json::from_str::<HelperRequest>(line) {
        Ok(request) => request,
        Err(_) => return HelperResponse::invalid_request(),
    };
    // An empty argv decodes fine but names no command to run; treat it as the
    // same protocol violation as a wrong shape.
    if request.argv().is_empty() {
        return HelperResponse::invalid_request();
    }

    match execute(request.argv()).await {
        Ok(output) => HelperResponse::Exec {
            stdout: output.stdout,
            stderr: output.stderr,
            returncode: output.exit_code,
        },
        Err(err) => HelperResponse::error(err.to_string()),
    }
}
