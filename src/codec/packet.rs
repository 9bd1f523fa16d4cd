//! Wire-level packet types
//!
//! `ActionPacket` flows agent -> simulator, `ObservationPacket` flows
//! simulator -> agent. Both are self-describing CBOR maps keyed by these
//! struct's field names (`serde`'s default struct encoding).

use serde::{Deserialize, Deserializer, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::constants::PROTOCOL_VERSION;

/// Key or mouse button, tagged so a raw GLFW int can never be confused
/// for the other on the wire (spec REDESIGN FLAGS item 4).
///
/// `serde_repr` encodes/decodes this as the bare `u8` discriminant, not
/// the variant name — a plain derive would serialize it as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum InputType {
    Key = 0,
    Mouse = 1,
}

impl InputType {
    pub fn from_int(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Key),
            1 => Some(Self::Mouse),
            _ => None,
        }
    }
}

/// Press/release, tagged the same way as `InputType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum GlfwAction {
    Release = 0,
    Press = 1,
}

impl GlfwAction {
    pub fn from_int(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Release),
            1 => Some(Self::Press),
            _ => None,
        }
    }
}

/// A single key/mouse press or release to apply, in order, during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub code: i64,
    pub action: GlfwAction,
}

impl InputEvent {
    pub fn new(input_type: InputType, code: i64, action: GlfwAction) -> Self {
        Self { input_type, code, action }
    }

    pub fn from_ints(type_int: i64, code: i64, action_int: i64) -> Option<Self> {
        Some(Self {
            input_type: InputType::from_int(type_int)?,
            code,
            action: GlfwAction::from_int(action_int)?,
        })
    }
}

/// Absolute cursor position to apply, in order, during a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPos {
    pub x: f64,
    pub y: f64,
}

/// Outbound message: agent -> simulator
///
/// `sequence` is assigned by the Controller at enqueue time and must
/// never be set by the caller — `Controller::send_action` overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPacket {
    pub version: u32,
    pub sequence: u64,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub stop: bool,
    #[serde(default)]
    pub clear_input: bool,
    #[serde(default)]
    pub inputs: Vec<InputEvent>,
    #[serde(default)]
    pub cursor_pos: Vec<CursorPos>,
}

impl Default for ActionPacket {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sequence: 0,
            commands: Vec::new(),
            stop: false,
            clear_input: false,
            inputs: Vec::new(),
            cursor_pos: Vec::new(),
        }
    }
}

/// Run mode the simulator reports itself operating in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Sync,
    Async,
}

/// Observation frame pixel layout. Only raw RGB exists today; kept as an
/// enum so a future encoded variant doesn't require a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameType {
    Raw,
}

/// Cursor confinement mode. `Normal` is a free-moving cursor; `Disabled`
/// is a captured/first-person cursor (GLFW's CURSOR_DISABLED).
///
/// Encodes as the small-int form (0/1). Decodes either that form or the
/// legacy GLFW constants (212993/212995), so a simulator built against
/// the original protocol still interoperates (§3 compatibility note).
/// `serde_repr` alone can't express that dual decode, so both directions
/// are hand-written here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum CursorMode {
    Normal = 0,
    Disabled = 1,
}

impl CursorMode {
    pub fn from_wire(v: i64) -> Option<Self> {
        match v {
            0 | 212_993 => Some(Self::Normal),
            1 | 212_995 => Some(Self::Disabled),
            _ => None,
        }
    }

    /// This value's code point in the original protocol's GLFW-constant
    /// encoding. This crate's own `Serialize` impl never emits this form
    /// (it always writes the small-int encoding below); exposed so a
    /// caller building fixtures or tooling against a simulator that still
    /// speaks the legacy encoding can produce it explicitly.
    pub fn to_glfw_constant(self) -> i64 {
        match self {
            Self::Normal => 212_993,
            Self::Disabled => 212_995,
        }
    }
}

impl Serialize for CursorMode {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(*self as i64)
    }
}

impl<'de> Deserialize<'de> for CursorMode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = i64::deserialize(d)?;
        CursorMode::from_wire(v)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized cursor_mode {v}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosInt {
    pub x: i64,
    pub y: i64,
}

/// One Minecraft inventory slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub slot_index: i64,
    pub item_id: String,
    pub count: i64,
}

/// Inbound message: simulator -> agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationPacket {
    pub version: u32,
    pub sequence: u64,
    /// Largest `ActionPacket.sequence` the simulator had fully applied
    /// before generating this observation
    pub last_action_sequence: u64,
    pub mode: Mode,
    #[serde(with = "serde_bytes_vec")]
    pub frame: Vec<u8>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_type: FrameType,
    pub cursor_mode: CursorMode,
    pub cursor_pos: CursorPosInt,
    pub player_pos: PlayerPos,
    #[serde(default)]
    pub player_pitch: f64,
    #[serde(default)]
    pub player_yaw: f64,
    #[serde(default)]
    pub health: f64,
    #[serde(default)]
    pub inventory_main: Vec<InventorySlot>,
    #[serde(default)]
    pub inventory_armor: Vec<InventorySlot>,
    #[serde(default)]
    pub inventory_offhand: Vec<InventorySlot>,
    #[serde(default)]
    pub message: String,
}

/// `serde_cbor` represents `Vec<u8>` as a CBOR array of integers by
/// default; frames are hundreds of KB, so encode/decode as a CBOR byte
/// string instead to avoid that per-element blowup.
mod serde_bytes_vec {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        serde_bytes::deserialize(d)
    }
}
