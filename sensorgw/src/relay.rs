//! Line-oriented JSON bridge between the client and a presentation
//! process: one event per line out, one request per line in.

use sensorgw_core::{GatewayError, GatewayEvent, GatewayHandle, GatewayRequest, SensorKind, TelemetrySink};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Write every event as a JSON line until the bus closes.
pub async fn forward_events<W>(
    mut events: broadcast::Receiver<GatewayEvent>,
    mut out: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event consumer lagging; oldest events dropped");
                continue;
            }
            Err(RecvError::Closed) => return Ok(()),
        };
        let mut line = serde_json::to_vec(&event).map_err(std::io::Error::other)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
    }
}

/// Parse JSON request lines and hand them to the client. Malformed lines
/// are logged and skipped. Returns at end of input.
pub async fn read_requests<R>(input: R, handle: &GatewayHandle) -> Result<(), GatewayError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<GatewayRequest>(line) {
            Ok(request) => {
                debug!(?request, "request");
                handle.request(request).await?;
            }
            Err(e) => warn!(error = %e, "malformed request line skipped"),
        }
    }
    Ok(())
}

/// Feed requests from `input` until `shutdown` resolves. Closed input
/// only stops the requests; the client keeps running.
pub async fn serve_until<R, F>(input: R, handle: &GatewayHandle, shutdown: F)
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let input_closed = tokio::select! {
        result = read_requests(input, handle) => {
            match result {
                Ok(()) => info!("request input closed"),
                Err(e) => warn!(error = %e, "request input failed"),
            }
            true
        }
        _ = &mut shutdown => false,
    };
    if input_closed {
        shutdown.await;
    }
}

/// Telemetry sink that logs each reading.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, kind: SensorKind, value: f64) {
        info!(target: "telemetry", %kind, value, "reading");
    }
}
