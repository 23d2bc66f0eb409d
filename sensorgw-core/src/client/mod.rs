//! The gateway client: one task that owns the server link, the device
//! roster and the network descriptor.
//!
//! Frames and presentation requests are handled one at a time on that
//! task, so handlers never race. Consumers talk to it through a
//! [`GatewayHandle`].

pub mod connection;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::GatewayError;
use crate::events::{DEFAULT_EVENT_CAPACITY, EventBus, GatewayEvent};
use crate::frame::Frame;
use crate::request::GatewayRequest;
use crate::state::LinkPhase;
use crate::telemetry::TelemetrySink;

pub use connection::{ConnectionInfo, ServerConnection};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Wait between losing the link and the next connect attempt.
    pub reconnect_delay: Duration,
    pub event_capacity: usize,
    pub request_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
        }
    }
}

/// Cloneable entry point to a running client.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    requests: mpsc::Sender<GatewayRequest>,
    events: EventBus,
}

impl GatewayHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Queue a presentation request. Fails only once the client has
    /// stopped.
    pub async fn request(&self, request: GatewayRequest) -> Result<(), GatewayError> {
        self.requests.send(request).await?;
        Ok(())
    }
}

/// How a connected session ended.
enum SessionEnd {
    Lost,
    Shutdown,
}

pub struct GatewayClient {
    info: ConnectionInfo,
    options: ClientOptions,
    phase: LinkPhase,
    dispatcher: Dispatcher,
    requests: mpsc::Receiver<GatewayRequest>,
}

impl GatewayClient {
    fn new(
        info: ConnectionInfo,
        options: ClientOptions,
        sink: Arc<dyn TelemetrySink>,
    ) -> (Self, GatewayHandle) {
        let events = EventBus::new(options.event_capacity);
        let (tx, rx) = mpsc::channel(options.request_capacity);
        let client = Self {
            info,
            options,
            phase: LinkPhase::default(),
            dispatcher: Dispatcher::new(events.clone(), sink),
            requests: rx,
        };
        let handle = GatewayHandle {
            requests: tx,
            events,
        };
        (client, handle)
    }

    /// Start the client on the current runtime. It runs until every
    /// [`GatewayHandle`] is dropped or the returned task is aborted.
    pub fn spawn(
        info: ConnectionInfo,
        options: ClientOptions,
        sink: Arc<dyn TelemetrySink>,
    ) -> (GatewayHandle, JoinHandle<()>) {
        let (client, handle) = Self::new(info, options, sink);
        (handle, tokio::spawn(client.run()))
    }

    async fn run(mut self) {
        loop {
            if let Err(e) = self.phase.begin_connect() {
                warn!(error = %e, "resetting link state");
                self.phase.force_disconnect();
                continue;
            }
            self.publish_phase();
            info!(server = %self.info, "connecting");

            match ServerConnection::connect(&self.info).await {
                Ok(conn) => {
                    if self.phase.complete_connect().is_ok() {
                        self.publish_phase();
                    }
                    info!(server = %self.info, "connected");
                    if let SessionEnd::Shutdown = self.serve(conn).await {
                        break;
                    }
                    let uptime = self.phase.connected_duration();
                    warn!(server = %self.info, ?uptime, "connection lost");
                }
                Err(e) => warn!(server = %self.info, error = %e, "connect failed"),
            }

            if let Err(e) = self.phase.lose() {
                warn!(error = %e, phase = %self.phase, "unexpected phase after session");
                self.phase.force_disconnect();
            }
            self.publish_phase();

            if !self.wait_reconnect().await {
                break;
            }
        }
        debug!("gateway client stopped");
    }

    async fn serve(&mut self, mut conn: ServerConnection) -> SessionEnd {
        // Every fresh link starts with a network info query.
        if conn.send(Frame::get_network_info_req()).await.is_err() {
            return SessionEnd::Lost;
        }

        loop {
            tokio::select! {
                frame = conn.recv() => {
                    let Some(frame) = frame else {
                        return SessionEnd::Lost;
                    };
                    if let Some(reply) = self.dispatcher.dispatch(&frame) {
                        if conn.send(reply).await.is_err() {
                            return SessionEnd::Lost;
                        }
                    }
                }
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        return SessionEnd::Shutdown;
                    };
                    match self.dispatcher.handle_request(request) {
                        Ok(Some(frame)) => {
                            if conn.send(frame).await.is_err() {
                                return SessionEnd::Lost;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "request dropped"),
                    }
                }
            }
        }
    }

    /// Sleep out the reconnect delay while still answering requests.
    /// Returns `false` when the client should stop.
    async fn wait_reconnect(&mut self) -> bool {
        if !self.phase.schedule_reconnect() {
            return true;
        }
        self.publish_phase();
        debug!(delay = ?self.options.reconnect_delay, "reconnect scheduled");

        let timer = tokio::time::sleep(self.options.reconnect_delay);
        tokio::pin!(timer);
        loop {
            tokio::select! {
                _ = &mut timer => return true,
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        return false;
                    };
                    match self.dispatcher.handle_request(request) {
                        Ok(Some(frame)) => {
                            warn!(command_id = frame.command_id(), error = %GatewayError::NotConnected, "request dropped");
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "request dropped"),
                    }
                }
            }
        }
    }

    fn publish_phase(&self) {
        self.dispatcher
            .events()
            .publish(GatewayEvent::LinkState(self.phase.to_status()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LinkStatus;
    use crate::telemetry::NullSink;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn next_event(rx: &mut broadcast::Receiver<GatewayEvent>) -> GatewayEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap()
    }

    #[test]
    fn default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.reconnect_delay, Duration::from_secs(5));
        assert_eq!(options.event_capacity, 256);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_timer_is_armed_once() {
        let (mut client, handle) = GatewayClient::new(
            ConnectionInfo::new("127.0.0.1", 1),
            ClientOptions::default(),
            Arc::new(NullSink),
        );
        let mut events = handle.subscribe();

        let start = tokio::time::Instant::now();
        assert!(client.wait_reconnect().await);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
        assert_eq!(
            events.try_recv().unwrap(),
            GatewayEvent::LinkState(LinkStatus::ReconnectPending)
        );

        // Already pending: no second timer and no second event.
        let start = tokio::time::Instant::now();
        assert!(client.wait_reconnect().await);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_served_while_waiting_to_reconnect() {
        let (mut client, handle) = GatewayClient::new(
            ConnectionInfo::new("127.0.0.1", 1),
            ClientOptions::default(),
            Arc::new(NullSink),
        );
        let mut events = handle.subscribe();
        handle.request(GatewayRequest::GetNetworkInfo).await.unwrap();

        assert!(client.wait_reconnect().await);
        assert_eq!(
            events.try_recv().unwrap(),
            GatewayEvent::LinkState(LinkStatus::ReconnectPending)
        );
        assert_eq!(events.try_recv().unwrap(), GatewayEvent::NetworkInfo(None));

        drop(handle);
        client.phase.force_disconnect();
        assert!(!client.wait_reconnect().await);
    }

    async fn link_states_until_pending(
        events: &mut broadcast::Receiver<GatewayEvent>,
    ) -> Vec<LinkStatus> {
        let mut seen = Vec::new();
        while seen.last() != Some(&LinkStatus::ReconnectPending) {
            if let GatewayEvent::LinkState(status) = next_event(events).await {
                seen.push(status);
            }
        }
        seen
    }

    #[tokio::test]
    async fn dropped_session_goes_through_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let options = ClientOptions {
            reconnect_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let (handle, task) =
            GatewayClient::spawn(ConnectionInfo::new("127.0.0.1", port), options, Arc::new(NullSink));
        let mut events = handle.subscribe();

        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);

        assert_eq!(
            link_states_until_pending(&mut events).await,
            vec![
                LinkStatus::Connecting,
                LinkStatus::Connected,
                LinkStatus::Disconnected,
                LinkStatus::ReconnectPending,
            ]
        );

        drop(handle);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failed_connect_goes_through_disconnected() {
        let port = closed_port().await;
        let options = ClientOptions {
            reconnect_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let (handle, _task) =
            GatewayClient::spawn(ConnectionInfo::new("127.0.0.1", port), options, Arc::new(NullSink));
        let mut events = handle.subscribe();

        assert_eq!(
            link_states_until_pending(&mut events).await,
            vec![
                LinkStatus::Connecting,
                LinkStatus::Disconnected,
                LinkStatus::ReconnectPending,
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_server_schedules_reconnect_and_answers_locally() {
        let port = closed_port().await;
        let options = ClientOptions {
            reconnect_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let (handle, task) =
            GatewayClient::spawn(ConnectionInfo::new("127.0.0.1", port), options, Arc::new(NullSink));
        let mut events = handle.subscribe();

        let seen = link_states_until_pending(&mut events).await;
        assert!(seen.contains(&LinkStatus::Disconnected));

        handle.request(GatewayRequest::GetNetworkInfo).await.unwrap();
        assert_eq!(next_event(&mut events).await, GatewayEvent::NetworkInfo(None));

        // Frame-producing requests are dropped while disconnected.
        handle
            .request(GatewayRequest::SetPermitJoin {
                action: crate::request::PermitJoinAction::Open,
            })
            .await
            .unwrap();
        handle.request(GatewayRequest::GetDeviceArray).await.unwrap();
        assert_eq!(next_event(&mut events).await, GatewayEvent::DeviceArray(Vec::new()));

        drop(handle);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
