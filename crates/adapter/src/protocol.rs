//! Protocol module - JSON message types for the remote control adapter
//!
//! Line-delimited JSON. Every message carries `type`, `seq` (sender sequence number) and
//! `ts` (unix milliseconds).

use serde::{Deserialize, Serialize};

use crate::core::CodeGrid;
use crate::types::{BoardEvent, Phase, Pos};

use arrayvec::ArrayVec;

/// Most actions accepted in one command
pub const MAX_ACTIONS: usize = 8;

/// Unit enum for the fixed `type` field of one message kind.
macro_rules! message_tag {
    ($name:ident :: $variant:ident = $wire:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            #[serde(rename = $wire)]
            #[default]
            $variant,
        }
    };
}

/// Unit enum with a fixed lower-case wire name per variant. Inbound names are matched
/// ignoring ASCII case.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($what:literal) {
            $($(#[$vmeta:meta])* $variant:ident = $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <&str>::deserialize(deserializer)?;
                $(
                    if s.eq_ignore_ascii_case($wire) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(serde::de::Error::custom(concat!("invalid ", $what)))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

// ============== Client -> Game Messages ==============

message_tag!(HelloType::Hello = "hello");
message_tag!(CommandType::Command = "command");
message_tag!(ControlType::Control = "control");

/// Client hello message (first message on a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    pub formats: FormatsList,
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatsList {
    pub json: bool,
}

impl<'de> Deserialize<'de> for FormatsList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = FormatsList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of format strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut json = false;
                while let Some(v) = seq.next_element::<&str>()? {
                    if v.eq_ignore_ascii_case("json") {
                        json = true;
                    }
                }
                Ok(FormatsList { json })
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for FormatsList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(usize::from(self.json)))?;
        if self.json {
            seq.serialize_element("json")?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    pub stream_observations: bool,
    pub command_mode: CommandMode,
    /// `observer` never takes control, even when no controller exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RequestedRole>,
}

wire_enum! {
    RequestedRole("requested role") {
        Auto = "auto",
        Controller = "controller",
        Observer = "observer",
    }
}

wire_enum! {
    AssignedRole("role") {
        Controller = "controller",
        Observer = "observer",
    }
}

/// Command message (controller only)
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    pub mode: CommandMode,
    #[serde(default)]
    pub actions: Option<ActionList>,
    #[serde(default)]
    pub swap: Option<SwapCommand>,
}

wire_enum! {
    CommandMode("command mode") {
        Swap = "swap",
        Action = "action",
    }
}

wire_enum! {
    /// Session-level actions available in `action` mode
    ActionName("action") {
        Restart = "restart",
        /// Play the greedy best swap
        PlayHint = "playHint",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionList(pub ArrayVec<ActionName, MAX_ACTIONS>);

impl<'de> Deserialize<'de> for ActionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ActionList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of action strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<ActionName, MAX_ACTIONS>::new();
                while let Some(a) = seq.next_element::<ActionName>()? {
                    out.try_push(a)
                        .map_err(|_| serde::de::Error::custom("too many actions"))?;
                }
                Ok(ActionList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// Two cells as `[row, col]` pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapCommand {
    pub a: [u8; 2],
    pub b: [u8; 2],
}

impl SwapCommand {
    pub fn from_positions(a: Pos, b: Pos) -> Self {
        Self {
            a: [a.row, a.col],
            b: [b.row, b.col],
        }
    }

    pub fn positions(&self) -> (Pos, Pos) {
        (Pos::new(self.a[0], self.a[1]), Pos::new(self.b[0], self.b[1]))
    }
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: ControlType,
    pub seq: u64,
    pub ts: u64,
    pub action: ControlAction,
}

wire_enum! {
    ControlAction("control action") {
        Claim = "claim",
        Release = "release",
    }
}

// ============== Game -> Client Messages ==============

message_tag!(WelcomeType::Welcome = "welcome");
message_tag!(AckType::Ack = "ack");
message_tag!(ErrorType::Error = "error");
message_tag!(ObservationType::Observation = "observation");

wire_enum! {
    AckStatus("ack status") {
        Ok = "ok",
    }
}

wire_enum! {
    ErrorCode("error code") {
        HandshakeRequired = "handshake_required",
        ProtocolMismatch = "protocol_mismatch",
        NotController = "not_controller",
        ControllerActive = "controller_active",
        InvalidCommand = "invalid_command",
        InvalidSwap = "invalid_swap",
        Backpressure = "backpressure",
    }
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub formats: [CapabilityFormat; 1],
    pub command_modes: [CapabilityCommandMode; 2],
    pub actions: [ActionName; 2],
    pub features: Vec<CapabilityFeature>,
}

wire_enum! {
    CapabilityFormat("format") {
        Json = "json",
    }
}

wire_enum! {
    CapabilityCommandMode("command mode") {
        Swap = "swap",
        Action = "action",
    }
}

wire_enum! {
    CapabilityFeature("feature") {
        Specials = "specials",
        PendingSwap = "pending_swap",
        LastEvent = "last_event",
        StateHash = "state_hash",
        Cascade = "cascade",
    }
}

/// Acknowledgment of an applied command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// Board observation (sent to streaming clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub playable: bool,
    pub game_over: bool,
    pub episode_id: u32,
    pub seed: u32,
    pub turn_id: u32,
    pub phase: PhaseLower,
    pub board: BoardGrid,
    pub score: u32,
    pub moves_left: u32,
    pub cascade: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_swap: Option<SwapCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<LastEvent>,
    pub state_hash: StateHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardGrid {
    pub rows: u8,
    pub cols: u8,
    /// 0 = empty, 1-6 = gem kind
    pub gems: CodeGrid,
    /// 0 = plain, 1 = line clear, 2 = area bomb, 3 = color bomb
    pub specials: CodeGrid,
}

wire_enum! {
    PhaseLower("phase") {
        Idle = "idle",
        AnimatingSwap = "animating_swap",
        ResolvingMatches = "resolving_matches",
        Falling = "falling",
        Refilling = "refilling",
        GameOver = "game_over",
    }
}

impl From<Phase> for PhaseLower {
    fn from(value: Phase) -> Self {
        match value {
            Phase::Idle => Self::Idle,
            Phase::AnimatingSwap => Self::AnimatingSwap,
            Phase::ResolvingMatches => Self::ResolvingMatches,
            Phase::Falling => Self::Falling,
            Phase::Refilling => Self::Refilling,
            Phase::GameOver => Self::GameOver,
        }
    }
}

/// Deterministic state hash serialized as lowercase hex (without heap allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for slot in buf.iter_mut().rev() {
            *slot = HEX[(v & 0x0f) as usize];
            v >>= 4;
        }
        let s = std::str::from_utf8(&buf).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        let s = s.trim();
        let mut v: u64 = 0;
        for b in s.as_bytes() {
            let d = match b {
                b'0'..=b'9' => (b - b'0') as u64,
                b'a'..=b'f' => (b - b'a' + 10) as u64,
                b'A'..=b'F' => (b - b'A' + 10) as u64,
                _ => return Err(serde::de::Error::custom("invalid hex")),
            };
            v = (v << 4) | d;
        }
        Ok(StateHash(v))
    }
}

wire_enum! {
    EventKindLower("event kind") {
        Swapped = "swapped",
        SwapReverted = "swap_reverted",
        Cleared = "cleared",
        Collapsed = "collapsed",
        Refilled = "refilled",
        GameOver = "game_over",
    }
}

/// Summary of the most recent engine transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LastEvent {
    pub kind: EventKindLower,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<SwapCommand>,
    /// Cells cleared, moved or refilled
    pub cells: u32,
    /// Cells upgraded to a special gem
    pub upgraded: u32,
    pub points: u32,
    pub cascade: u32,
}

impl From<BoardEvent> for LastEvent {
    fn from(value: BoardEvent) -> Self {
        let mut ev = LastEvent {
            kind: EventKindLower::Swapped,
            swap: None,
            cells: 0,
            upgraded: 0,
            points: 0,
            cascade: 0,
        };
        match value {
            BoardEvent::Swapped { a, b } => {
                ev.swap = Some(SwapCommand::from_positions(a, b));
                ev.cells = 2;
            }
            BoardEvent::SwapReverted { a, b } => {
                ev.kind = EventKindLower::SwapReverted;
                ev.swap = Some(SwapCommand::from_positions(a, b));
                ev.cells = 2;
            }
            BoardEvent::Cleared {
                cells,
                upgraded,
                points,
                cascade,
            } => {
                ev.kind = EventKindLower::Cleared;
                ev.cells = cells.count_ones();
                ev.upgraded = upgraded.count_ones();
                ev.points = points;
                ev.cascade = cascade;
            }
            BoardEvent::Collapsed { fall } => {
                ev.kind = EventKindLower::Collapsed;
                ev.cells = fall.iter().filter(|&&rows| rows > 0).count() as u32;
            }
            BoardEvent::Refilled { cells } => {
                ev.kind = EventKindLower::Refilled;
                ev.cells = cells.count_ones();
            }
            BoardEvent::GameOver { score } => {
                ev.kind = EventKindLower::GameOver;
                ev.points = score;
            }
        }
        ev
    }
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "control")]
        Control(ControlMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // An unknown type is answered with an error, not treated as malformed JSON.
            #[derive(Debug, Deserialize)]
            struct TypeOnly<'a> {
                #[serde(rename = "type")]
                #[serde(borrow)]
                msg_type: Option<&'a str>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or("unknown");
            if msg_type != "hello" && msg_type != "command" && msg_type != "control" {
                #[derive(Debug, Deserialize)]
                struct SeqOnly {
                    seq: Option<u64>,
                }
                let seq = serde_json::from_str::<SeqOnly>(json)?.seq.unwrap_or(0);
                return Ok(ParsedMessage::Unknown(UnknownMessage { seq }));
            }
            Err(e)
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        formats: FormatsList { json: true },
        requested: RequestedCapabilities {
            stream_observations: true,
            command_mode: CommandMode::Swap,
            role: Some(RequestedRole::Auto),
        },
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        role,
        controller_id,
        game_id: "gem-fusion".to_string(),
        capabilities: ServerCapabilities {
            formats: [CapabilityFormat::Json],
            command_modes: [CapabilityCommandMode::Swap, CapabilityCommandMode::Action],
            actions: [ActionName::Restart, ActionName::PlayHint],
            features: vec![
                CapabilityFeature::Specials,
                CapabilityFeature::PendingSwap,
                CapabilityFeature::LastEvent,
                CapabilityFeature::StateHash,
                CapabilityFeature::Cascade,
            ],
        },
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Current unix time in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
