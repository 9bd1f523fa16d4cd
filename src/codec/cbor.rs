//! Self-describing CBOR codec
//!
//! Decoding happens in two stages so malformed-CBOR and
//! wrong-shape-CBOR are distinguishable: first parse to a generic
//! `serde_cbor::Value`, then convert that into the typed
//! `ObservationPacket`. A final field check catches a protocol version
//! this build doesn't speak.

use super::{ActionPacket, Codec, DecodeError, ObservationPacket};
use crate::constants::PROTOCOL_VERSION;

/// CBOR implementation of [`Codec`]
#[derive(Debug, Default, Clone, Copy)]
pub struct CborCodec;

impl CborCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for CborCodec {
    fn encode_action(&self, action: &ActionPacket) -> Vec<u8> {
        serde_cbor::to_vec(action).expect("ActionPacket is always representable in CBOR")
    }

    fn decode_observation(&self, bytes: &[u8]) -> Result<ObservationPacket, DecodeError> {
        let value: serde_cbor::Value =
            serde_cbor::from_slice(bytes).map_err(DecodeError::MalformedPayload)?;

        let packet: ObservationPacket =
            serde_cbor::value::from_value(value).map_err(DecodeError::SchemaMismatch)?;

        if packet.version != PROTOCOL_VERSION {
            return Err(DecodeError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: packet.version,
            });
        }

        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::packet::{
        CursorMode, CursorPos, CursorPosInt, FrameType, GlfwAction, InputEvent, InputType, Mode,
        PlayerPos,
    };

    fn sample_observation() -> ObservationPacket {
        ObservationPacket {
            version: PROTOCOL_VERSION,
            sequence: 1,
            last_action_sequence: 0,
            mode: Mode::Sync,
            frame: vec![0u8; 16],
            frame_width: 4,
            frame_height: 4,
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

    #[test]
    fn action_round_trips_through_cbor() {
        let codec = CborCodec::new();
        let mut action = ActionPacket::default();
        action.sequence = 7;
        action.commands.push("forward".to_string());

        let bytes = codec.encode_action(&action);
        let value: serde_cbor::Value = serde_cbor::from_slice(&bytes).unwrap();
        let decoded: ActionPacket = serde_cbor::value::from_value(value).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn observation_round_trips_through_cbor() {
        let codec = CborCodec::new();
        let obs = sample_observation();
        let bytes = serde_cbor::to_vec(&obs).unwrap();
        let decoded = codec.decode_observation(&bytes).unwrap();
        assert_eq!(decoded, obs);
    }

    #[test]
    fn garbage_bytes_are_malformed_payload() {
        let codec = CborCodec::new();
        let err = codec.decode_observation(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload(_)));
    }

    #[test]
    fn valid_cbor_wrong_shape_is_schema_mismatch() {
        let codec = CborCodec::new();
        let bytes = serde_cbor::to_vec(&vec![1, 2, 3]).unwrap();
        let err = codec.decode_observation(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch(_)));
    }

    #[test]
    fn mismatched_protocol_version_is_rejected() {
        let codec = CborCodec::new();
        let mut obs = sample_observation();
        obs.version = PROTOCOL_VERSION + 1;
        let bytes = serde_cbor::to_vec(&obs).unwrap();

        let err = codec.decode_observation(&bytes).unwrap_err();
        match err {
            DecodeError::VersionMismatch { expected, got } => {
                assert_eq!(expected, PROTOCOL_VERSION);
                assert_eq!(got, PROTOCOL_VERSION + 1);
            }
            other => panic!("expected VersionMismatch, got {other:?}"),
        }
    }

    proptest::proptest! {
        /// ∀ ActionPacket a, decode(encode(a)) == a, with defaulted fields
        /// canonicalised by construction (spec §8's quantified codec
        /// round-trip invariant).
        #[test]
        fn action_round_trips_for_any_generated_packet(
            commands in proptest::collection::vec("[a-z ]{0,12}", 0..4),
            stop in proptest::bool::ANY,
            clear_input in proptest::bool::ANY,
            input_codes in proptest::collection::vec(0i64..400, 0..4),
            cursor_xy in proptest::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 0..3),
        ) {
            let codec = CborCodec::new();
            let inputs = input_codes
                .into_iter()
                .enumerate()
                .map(|(i, code)| {
                    let input_type = if i % 2 == 0 { InputType::Key } else { InputType::Mouse };
                    let action = if i % 3 == 0 { GlfwAction::Release } else { GlfwAction::Press };
                    InputEvent::new(input_type, code, action)
                })
                .collect();
            let cursor_pos = cursor_xy.into_iter().map(|(x, y)| CursorPos { x, y }).collect();

            let action = ActionPacket {
                version: PROTOCOL_VERSION,
                sequence: 0,
                commands,
                stop,
                clear_input,
                inputs,
                cursor_pos,
            };

            let bytes = codec.encode_action(&action);
            let value: serde_cbor::Value = serde_cbor::from_slice(&bytes).unwrap();
            let decoded: ActionPacket = serde_cbor::value::from_value(value).unwrap();
            proptest::prop_assert_eq!(decoded, action);
        }
    }
}
