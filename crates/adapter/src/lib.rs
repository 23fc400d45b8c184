//! Remote control adapter - drive a board session over TCP with JSON lines
//!
//! External agents (bots, test harnesses, replay tools) connect to a TCP socket, receive
//! board observations and send swaps.
//!
//! # Protocol Overview
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7788)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller, unless it
//!    asks for the `observer` role
//! 4. **Observation Streaming**: Streaming clients get an observation whenever the board
//!    or the phase changes
//! 5. **Commanding**: Controller sends swaps or session actions; each is answered with
//!    `ack` once applied or `error` when rejected
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: handshake with client info and requested capabilities
//! - **command**: `mode: "swap"` with `swap: {a: [row, col], b: [row, col]}`, or
//!   `mode: "action"` with `actions` from `restart` and `playHint`
//! - **control**: `claim` or `release` the controller role
//!
//! ## Server → Client
//!
//! - **welcome**: assigned client id, role and server capabilities
//! - **observation**: gem and special grids, phase, score, moves, counters, `state_hash`
//! - **ack**: command applied
//! - **error**: `handshake_required`, `protocol_mismatch`, `not_controller`,
//!   `controller_active`, `invalid_command`, `invalid_swap` or `backpressure`
//!
//! # Environment Variables
//!
//! - `GEM_AI_HOST`: Bind address (default: "127.0.0.1")
//! - `GEM_AI_PORT`: Port number (default: 7788)
//! - `GEM_AI_MAX_PENDING`: Bounded command queue size (default: 10)
//! - `GEM_AI_LOG_PATH`: Append every wire line to this JSONL file
//! - `GEM_AI_DISABLED`: Set to "1" or "true" to disable the adapter entirely
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":1700000000000,"client":{"name":"bot","version":"0.1.0"},"protocol_version":"2.0.0","formats":["json"],"requested":{"stream_observations":true,"command_mode":"swap"}}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1700000000001,"protocol_version":"2.0.0","client_id":1,"role":"controller",...}
//! Server -> Client: {"type":"observation","seq":1,"ts":1700000000002,"phase":"idle","board":{...},...}
//! Client -> Server: {"type":"command","seq":2,"ts":1700000000100,"mode":"swap","swap":{"a":[3,4],"b":[3,5]}}
//! Server -> Client: {"type":"ack","seq":2,"ts":1700000000101,"status":"ok"}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 7788
//! {"type":"hello","seq":1,"ts":0,"client":{"name":"nc","version":"0"},"protocol_version":"2.0.0","formats":["json"],"requested":{"stream_observations":true,"command_mode":"swap"}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use gem_fusion_core as core;
pub use gem_fusion_engine as engine;
pub use gem_fusion_types as types;

pub use protocol::*;
pub use runtime::{
    apply_command, handle_inbound, Adapter, ClientCommand, InboundCommand, InboundPayload,
    ObservationStream, OutboundMessage,
};
pub use server::{build_observation, run_server, AdapterStatus, ServerConfig, ServerState};
