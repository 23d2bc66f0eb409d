//! Integration tests: a fake application server on localhost drives the
//! client through bootstrap, roster updates, requests and reconnects.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use sensorgw_core::{
    ClientOptions, Command, ConnectionInfo, DeviceAddress, Frame, FrameCodec, GatewayClient,
    GatewayEvent, GatewayHandle, GatewayRequest, LinkStatus, NetworkState, PermitJoinAction,
    SensorKind,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const EXT: u64 = 0x0012_4B00_1122_3344;

// ── Helpers ──────────────────────────────────────────────────────

async fn ephemeral_listener() -> (TcpListener, ConnectionInfo) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let info = ConnectionInfo::new(addr.ip().to_string(), addr.port());
    (listener, info)
}

fn fast_options() -> ClientOptions {
    ClientOptions {
        reconnect_delay: Duration::from_millis(50),
        ..Default::default()
    }
}

async fn accept(listener: &TcpListener) -> Framed<TcpStream, FrameCodec> {
    let (socket, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("client never connected")
        .unwrap();
    Framed::new(socket, FrameCodec::default())
}

async fn next_frame(server: &mut Framed<TcpStream, FrameCodec>) -> Frame {
    timeout(Duration::from_secs(5), server.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream closed")
        .unwrap()
}

/// Wait for the first event matching `pred`, skipping the rest.
async fn wait_for<F>(events: &mut broadcast::Receiver<GatewayEvent>, pred: F) -> GatewayEvent
where
    F: Fn(&GatewayEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn network_cnf(status: u8) -> Frame {
    let mut p = vec![status];
    p.extend_from_slice(&0xACDCu16.to_le_bytes());
    p.extend_from_slice(&0xAABBu16.to_le_bytes());
    p.extend_from_slice(&0x0012_4B00_0000_0001u64.to_le_bytes());
    p.extend_from_slice(&[11, 0, 0, 2, 3]);
    Frame::new(Command::GetNwkInfoCnf, p).unwrap()
}

fn device_joined(short_address: u16) -> Frame {
    let mut p = Vec::new();
    p.extend_from_slice(&0xACDCu16.to_le_bytes());
    p.extend_from_slice(&short_address.to_le_bytes());
    p.extend_from_slice(&EXT.to_le_bytes());
    p.extend_from_slice(&[0, 0, 1, 1, 0, 1]);
    Frame::new(Command::DeviceJoinedInd, p).unwrap()
}

fn start(info: ConnectionInfo) -> (GatewayHandle, Arc<Mutex<Vec<(SensorKind, f64)>>>) {
    let readings = Arc::new(Mutex::new(Vec::new()));
    let sink_readings = Arc::clone(&readings);
    let sink = move |kind: SensorKind, value: f64| {
        sink_readings.lock().unwrap().push((kind, value));
    };
    let (handle, _task) = GatewayClient::spawn(info, fast_options(), Arc::new(sink));
    (handle, readings)
}

// ── Bootstrap ────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_queries_network_then_device_array() {
    let (listener, info) = ephemeral_listener().await;
    let (handle, _) = start(info);
    let mut events = handle.subscribe();

    let mut server = accept(&listener).await;
    let first = next_frame(&mut server).await;
    assert_eq!(first.command().unwrap(), Command::GetNwkInfoReq);
    assert!(first.payload().is_empty());

    // Not started yet: nothing follows.
    server.send(network_cnf(0)).await.unwrap();
    server.send(network_cnf(1)).await.unwrap();

    let follow_up = next_frame(&mut server).await;
    assert_eq!(follow_up.command().unwrap(), Command::GetDeviceArrayReq);

    let event = wait_for(&mut events, |e| matches!(e, GatewayEvent::NetworkInfo(Some(_)))).await;
    let GatewayEvent::NetworkInfo(Some(info)) = event else {
        unreachable!()
    };
    assert_eq!(info.channel, 11);
    assert_eq!(info.state, NetworkState::Started);
}

// ── Roster and sensor data ───────────────────────────────────────

#[tokio::test]
async fn joined_device_reports_and_can_be_toggled() {
    let (listener, info) = ephemeral_listener().await;
    let (handle, readings) = start(info);
    let mut events = handle.subscribe();

    let mut server = accept(&listener).await;
    next_frame(&mut server).await;

    server.send(device_joined(0x0007)).await.unwrap();
    let event = wait_for(&mut events, |e| matches!(e, GatewayEvent::DeviceUpdate(_))).await;
    let GatewayEvent::DeviceUpdate(device) = event else {
        unreachable!()
    };
    assert_eq!(device.short_address, 0x0007);
    assert_eq!(device.ext_address, EXT);

    // Temperature and light, sent in a single write with a trailing frame.
    let mut p = vec![2];
    p.extend_from_slice(&0x0007u16.to_le_bytes());
    p.push((-50i8) as u8);
    p.push(5);
    p.extend_from_slice(&EXT.to_le_bytes());
    p.extend_from_slice(&0x0003u16.to_le_bytes());
    p.extend_from_slice(&22u16.to_le_bytes());
    p.extend_from_slice(&31u16.to_le_bytes());
    p.extend_from_slice(&512u16.to_le_bytes());
    let data = Frame::new(Command::DeviceDataRxInd, p).unwrap();
    let cnf = Frame::new(Command::SetJoinPermitCnf, 0u32.to_le_bytes().to_vec()).unwrap();
    server.feed(data).await.unwrap();
    server.feed(cnf).await.unwrap();
    server.flush().await.unwrap();

    let event = wait_for(&mut events, |e| matches!(e, GatewayEvent::DeviceUpdate(_))).await;
    let GatewayEvent::DeviceUpdate(device) = event else {
        unreachable!()
    };
    assert_eq!(device.temperature.unwrap().ambience_temp, 22);
    assert_eq!(device.light.unwrap().raw_data, 512);
    assert_eq!(device.rssi, Some(-50));

    let event = wait_for(&mut events, |e| {
        matches!(e, GatewayEvent::PermitJoinConfirmation { .. })
    })
    .await;
    assert_eq!(event, GatewayEvent::PermitJoinConfirmation { status: 0 });
    assert_eq!(
        *readings.lock().unwrap(),
        vec![(SensorKind::Temperature, 22.0), (SensorKind::Light, 512.0)]
    );

    handle
        .request(GatewayRequest::SendToggle {
            target_address: Some(DeviceAddress::Extended(EXT)),
        })
        .await
        .unwrap();
    let toggle = next_frame(&mut server).await;
    assert_eq!(toggle, Frame::toggle_req(0x0007));
}

#[tokio::test]
async fn permit_join_request_reaches_server() {
    let (listener, info) = ephemeral_listener().await;
    let (handle, _) = start(info);

    let mut server = accept(&listener).await;
    next_frame(&mut server).await;

    handle
        .request(GatewayRequest::SetPermitJoin {
            action: PermitJoinAction::Close,
        })
        .await
        .unwrap();
    let frame = next_frame(&mut server).await;
    assert_eq!(frame.command().unwrap(), Command::SetJoinPermitReq);
    assert_eq!(frame.payload(), &[0, 0, 0, 0]);

    // Unknown target: nothing is sent, the next request still goes out.
    handle
        .request(GatewayRequest::SendToggle {
            target_address: Some(DeviceAddress::Short(0x0999)),
        })
        .await
        .unwrap();
    handle
        .request(GatewayRequest::SetPermitJoin {
            action: PermitJoinAction::Open,
        })
        .await
        .unwrap();
    let frame = next_frame(&mut server).await;
    assert_eq!(frame.payload(), &[0xFF, 0xFF, 0xFF, 0xFF]);
}

// ── Reconnect ────────────────────────────────────────────────────

#[tokio::test]
async fn reconnects_after_server_drops_link() {
    let (listener, info) = ephemeral_listener().await;
    let (handle, _) = start(info);
    let mut events = handle.subscribe();

    let mut server = accept(&listener).await;
    next_frame(&mut server).await;
    server.send(device_joined(0x0001)).await.unwrap();
    wait_for(&mut events, |e| matches!(e, GatewayEvent::DeviceUpdate(_))).await;
    drop(server);

    wait_for(&mut events, |e| {
        *e == GatewayEvent::LinkState(LinkStatus::ReconnectPending)
    })
    .await;

    // The new session bootstraps again and the roster survived.
    let mut server = accept(&listener).await;
    let first = next_frame(&mut server).await;
    assert_eq!(first.command().unwrap(), Command::GetNwkInfoReq);
    wait_for(&mut events, |e| *e == GatewayEvent::LinkState(LinkStatus::Connected)).await;

    handle.request(GatewayRequest::GetDeviceArray).await.unwrap();
    let event = wait_for(&mut events, |e| matches!(e, GatewayEvent::DeviceArray(_))).await;
    let GatewayEvent::DeviceArray(devices) = event else {
        unreachable!()
    };
    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn malformed_stream_is_survived() {
    let (listener, info) = ephemeral_listener().await;
    let (handle, _) = start(info);
    let mut events = handle.subscribe();

    let mut server = accept(&listener).await;
    next_frame(&mut server).await;

    // Unknown command id and a truncated device array: both dropped.
    server
        .send(Frame::with_subsystem(10, 0x63, vec![1, 2]).unwrap())
        .await
        .unwrap();
    server
        .send(Frame::new(Command::GetDeviceArrayCnf, vec![0, 5, 0]).unwrap())
        .await
        .unwrap();
    server.send(device_joined(0x0002)).await.unwrap();

    let event = wait_for(&mut events, |e| {
        matches!(e, GatewayEvent::DeviceUpdate(_) | GatewayEvent::DeviceArray(_))
    })
    .await;
    assert!(matches!(event, GatewayEvent::DeviceUpdate(d) if d.short_address == 2));
}

#[tokio::test]
async fn dropped_link_reconnects_once_after_default_delay() {
    let (listener, info) = ephemeral_listener().await;
    let (handle, _task) = GatewayClient::spawn(
        info,
        ClientOptions::default(),
        Arc::new(sensorgw_core::NullSink),
    );

    let mut server = accept(&listener).await;
    next_frame(&mut server).await;
    drop(server);
    let dropped_at = tokio::time::Instant::now();

    let (socket, _) = timeout(Duration::from_secs(10), listener.accept())
        .await
        .expect("client never reconnected")
        .unwrap();
    let waited = dropped_at.elapsed();
    assert!(
        waited >= Duration::from_millis(4900) && waited < Duration::from_secs(7),
        "reconnected after {waited:?}"
    );

    let mut server = Framed::new(socket, FrameCodec::default());
    let first = next_frame(&mut server).await;
    assert_eq!(first.command().unwrap(), Command::GetNwkInfoReq);

    // The live session is kept; no second attempt follows.
    let extra = timeout(Duration::from_secs(3), listener.accept()).await;
    assert!(extra.is_err());
    drop(handle);
}
