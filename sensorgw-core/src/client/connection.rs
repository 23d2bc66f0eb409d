use futures::{SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::FrameCodec;
use crate::error::GatewayError;
use crate::frame::Frame;

const CHANNEL_CAPACITY: usize = 100;

/// One TCP session with the application server.
///
/// A writer task drains outbound frames onto the socket and a reader task
/// forwards decoded frames. `recv` returning `None` means the session is
/// over: end of stream, a read error, or a malformed length.
#[derive(Debug)]
pub struct ServerConnection {
    // Channel to the background writer task
    tx: mpsc::Sender<Frame>,
    // Channel from the background reader task
    rx: mpsc::Receiver<Frame>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ServerConnection {
    pub fn new(stream: TcpStream) -> Self {
        let (mut net_writer, mut net_reader) = Framed::new(stream, FrameCodec::default()).split();

        // Client -> Network
        let (user_tx, mut network_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);

        // Network -> Client
        let (network_tx, user_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(frame) = network_rx.recv().await {
                if let Err(e) = net_writer.send(frame).await {
                    warn!(error = %e, "network write error");
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(frame) => {
                        if network_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "network read error");
                        break;
                    }
                }
            }
            debug!("reader finished");
        });

        Self {
            tx: user_tx,
            rx: user_rx,
            reader,
            writer,
        }
    }

    pub async fn connect(info: &ConnectionInfo) -> Result<Self, GatewayError> {
        let stream = TcpStream::connect(info.address()).await?;
        // Frames are small and latency matters more than batching.
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    pub async fn send(&self, frame: Frame) -> Result<(), GatewayError> {
        self.tx.send(frame).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Where the application server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
