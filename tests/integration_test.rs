//! End-to-end tests against a loopback mock simulator
//!
//! No real simulator is involved: a background thread plays both ends
//! of the wire protocol (accepts the action connection, drives the
//! observation connection) the way a real simulator would, so the
//! Controller exercises its actual sockets and codec instead of a
//! stand-in.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::Duration;

use mcio_core::codec::{
    ActionPacket, CborCodec, Codec, CursorMode, CursorPos, CursorPosInt, FrameType, GlfwAction,
    InputEvent, InputType, Mode, ObservationPacket, PlayerPos,
};
use mcio_core::config::Settings;
use mcio_core::controller::Controller;
use mcio_core::latest_slot::LatestSlot;
use mcio_core::transport::framing::{read_frame, write_frame};
use mcio_core::CoreError;

static NEXT_PORT: AtomicU16 = AtomicU16::new(19_000);

fn alloc_ports() -> (u16, u16) {
    let base = NEXT_PORT.fetch_add(2, Ordering::Relaxed);
    (base, base + 1)
}

fn test_settings(action_port: u16, observation_port: u16) -> Settings {
    let mut settings = Settings::default();
    settings.action_port = action_port;
    settings.observation_port = observation_port;
    settings.settle_ms = 20;
    settings
}

/// Plays the simulator side of the wire: accepts the action connection,
/// drives the observation connection.
struct MockSimulator {
    action_stream: TcpStream,
    obs_stream: TcpStream,
}

fn spawn_mock(action_port: u16, observation_port: u16) -> thread::JoinHandle<MockSimulator> {
    thread::spawn(move || {
        let obs_listener = TcpListener::bind(("127.0.0.1", observation_port)).unwrap();

        let action_stream = loop {
            match TcpStream::connect(("127.0.0.1", action_port)) {
                Ok(stream) => break stream,
                Err(_) => thread::sleep(Duration::from_millis(20)),
            }
        };

        let (obs_stream, _) = obs_listener.accept().unwrap();
        MockSimulator { action_stream, obs_stream }
    })
}

fn start_controller(action_port: u16, observation_port: u16) -> (Controller, MockSimulator) {
    let mock_handle = spawn_mock(action_port, observation_port);
    let controller = Controller::new(test_settings(action_port, observation_port)).unwrap();
    let mock = mock_handle.join().unwrap();
    (controller, mock)
}

fn base_observation() -> ObservationPacket {
    ObservationPacket {
        version: mcio_core::constants::PROTOCOL_VERSION,
        sequence: 0,
        last_action_sequence: 0,
        mode: Mode::Sync,
        frame: vec![0u8; 4],
        frame_width: 2,
        frame_height: 2,
        frame_type: FrameType::Raw,
        cursor_mode: CursorMode::Normal,
        cursor_pos: CursorPosInt { x: 0, y: 0 },
        player_pos: PlayerPos { x: 0.0, y: 64.0, z: 0.0 },
        player_pitch: 0.0,
        player_yaw: 0.0,
        health: 20.0,
        inventory_main: Vec::new(),
        inventory_armor: Vec::new(),
        inventory_offhand: Vec::new(),
        message: String::new(),
    }
}

fn send_observation(mock: &mut MockSimulator, obs: ObservationPacket) {
    let bytes = serde_cbor::to_vec(&obs).unwrap();
    write_frame(&mut mock.obs_stream, &bytes).unwrap();
}

fn read_action(mock: &mut MockSimulator) -> ActionPacket {
    let bytes = read_frame(&mut mock.action_stream).unwrap().unwrap();
    let value: serde_cbor::Value = serde_cbor::from_slice(&bytes).unwrap();
    serde_cbor::value::from_value(value).unwrap()
}

/// Scenario 1: round-trip sync match against an echoing mock simulator.
///
/// Each observation is drained with a blocking `recv_observation` right
/// after it is sent, before the next action/observation round starts —
/// `LatestSlot` only ever holds the newest value, so sending all five
/// observations up front and draining them afterward would let later
/// puts silently coalesce earlier ones.
#[test]
fn round_trip_sync_match() {
    let (action_port, observation_port) = alloc_ports();
    let (controller, mut mock) = start_controller(action_port, observation_port);

    for i in 1..=5u64 {
        let seq = controller.send_action(ActionPacket::default()).unwrap();
        assert_eq!(seq, i);

        let action = read_action(&mut mock);
        assert_eq!(action.sequence, i);

        let mut obs = base_observation();
        obs.sequence = i;
        obs.last_action_sequence = action.sequence;
        send_observation(&mut mock, obs);

        let obs = controller.recv_observation().unwrap();
        assert_eq!(obs.last_action_sequence, i);
    }
}

/// Scenario 2: stale observations before the matching one are skipped.
///
/// The feeder waits for `stats().skipped()` to reflect each stale
/// observation before sending the next one: `LatestSlot` only ever
/// holds its newest value, so firing all three stale observations
/// (plus the matching one) without waiting for `send_and_recv_match` to
/// consume and skip each in turn would let later puts coalesce earlier
/// ones before the matcher ever sees them.
#[test]
fn stale_observation_skip() {
    let (action_port, observation_port) = alloc_ports();
    let (controller, mut mock) = start_controller(action_port, observation_port);
    let controller = std::sync::Arc::new(controller);

    let matcher = {
        let controller = controller.clone();
        thread::spawn(move || controller.send_and_recv_match(ActionPacket::default()))
    };

    let action = read_action(&mut mock);

    for seq in 1..=3u64 {
        let mut obs = base_observation();
        obs.sequence = seq;
        obs.last_action_sequence = 0;
        send_observation(&mut mock, obs);

        while controller.stats().skipped() < seq {
            thread::sleep(Duration::from_millis(5));
        }
    }

    let mut matching = base_observation();
    matching.sequence = 4;
    matching.last_action_sequence = action.sequence;
    send_observation(&mut mock, matching);

    let obs = matcher.join().unwrap().unwrap();

    assert!(obs.last_action_sequence >= 1);
    assert_eq!(controller.stats().skipped(), 3);
}

/// Scenario 3: a sequence gap in received observations increments the
/// drop counter by the size of the gap.
///
/// Each observation is drained with a blocking `recv_observation`
/// before the next is sent: firing all four up front would let
/// `LatestSlot`'s single slot coalesce them before they are counted.
#[test]
fn drop_detection() {
    let (action_port, observation_port) = alloc_ports();
    let (controller, mut mock) = start_controller(action_port, observation_port);

    for seq in [1u64, 2, 5, 6] {
        let mut obs = base_observation();
        obs.sequence = seq;
        send_observation(&mut mock, obs);

        let received = controller.recv_observation().unwrap();
        assert_eq!(received.sequence, seq);
    }

    assert_eq!(controller.stats().dropped(), 2);
}

/// A non-blocking poll on a healthy Controller with nothing new to
/// report returns `Ok(None)`, not an error — `ControllerClosed` is
/// reserved for an actually-closed Controller.
#[test]
fn try_recv_observation_distinguishes_empty_from_closed() {
    let (action_port, observation_port) = alloc_ports();
    let (controller, mut mock) = start_controller(action_port, observation_port);

    assert_eq!(controller.try_recv_observation().unwrap(), None);

    let mut obs = base_observation();
    obs.sequence = 1;
    send_observation(&mut mock, obs);

    let received = loop {
        if let Some(obs) = controller.try_recv_observation().unwrap() {
            break obs;
        }
        thread::sleep(Duration::from_millis(5));
    };
    assert_eq!(received.sequence, 1);

    assert_eq!(controller.try_recv_observation().unwrap(), None);

    controller.shutdown();
    assert!(matches!(controller.try_recv_observation(), Err(CoreError::InvalidState { .. })));
}

/// Scenario 4: LatestSlot overwrite semantics, exercised directly.
#[test]
fn latest_slot_overwrite_reports_displacement() {
    let slot = LatestSlot::new();
    assert!(!slot.put("a"));
    assert!(slot.put("b"));
    assert!(slot.put("c"));
    assert_eq!(slot.get(), Some("c"));
}

/// Scenario 5: codec round-trip with a populated ActionPacket.
#[test]
fn codec_round_trip() {
    let codec = CborCodec::new();
    let mut action = ActionPacket::default();
    action.commands = vec!["time set day".to_string()];
    action.inputs = vec![
        InputEvent::new(InputType::Key, 87, GlfwAction::Press),
        InputEvent::new(InputType::Mouse, 0, GlfwAction::Release),
    ];
    action.cursor_pos = vec![CursorPos { x: 10.0, y: 20.5 }];

    let bytes = codec.encode_action(&action);
    let value: serde_cbor::Value = serde_cbor::from_slice(&bytes).unwrap();
    let decoded: ActionPacket = serde_cbor::value::from_value(value).unwrap();
    assert_eq!(decoded, action);
}

/// A protocol version mismatch is fatal: it reaches every blocked and
/// every future caller as `CoreError::VersionMismatch`, not a generic
/// `ControllerClosed`.
#[test]
fn version_mismatch_propagates_as_fatal_error() {
    let (action_port, observation_port) = alloc_ports();
    let (controller, mut mock) = start_controller(action_port, observation_port);
    let controller = std::sync::Arc::new(controller);

    let waiter = {
        let controller = controller.clone();
        thread::spawn(move || controller.recv_observation())
    };

    let mut obs = base_observation();
    obs.version = mcio_core::constants::PROTOCOL_VERSION + 1;
    send_observation(&mut mock, obs);

    let blocked_result = waiter.join().unwrap();
    assert!(matches!(
        blocked_result,
        Err(CoreError::VersionMismatch { expected, got })
            if expected == mcio_core::constants::PROTOCOL_VERSION
                && got == mcio_core::constants::PROTOCOL_VERSION + 1
    ));

    // A caller arriving after the fact sees the same fatal error, not
    // InvalidState or ControllerClosed.
    let later_result = controller.recv_observation();
    assert!(matches!(later_result, Err(CoreError::VersionMismatch { .. })));
}

/// Scenario 6: shutdown wakes a blocked `recv_observation` caller.
#[test]
fn shutdown_wakes_blocked_recv() {
    let (action_port, observation_port) = alloc_ports();
    let (controller, _mock) = start_controller(action_port, observation_port);

    let controller = std::sync::Arc::new(controller);
    let waiter = {
        let controller = controller.clone();
        thread::spawn(move || controller.recv_observation())
    };

    thread::sleep(Duration::from_millis(50));
    controller.shutdown();

    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(CoreError::ControllerClosed)));

    // A second call is a no-op, not a panic or hang.
    controller.shutdown();
}
