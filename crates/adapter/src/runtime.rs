//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server: the server runs on a
//! background tokio runtime, the game loop polls commands with `try_recv` and pushes
//! replies with `send`. Nothing on the game loop side ever awaits.

use arrayvec::ArrayVec;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, watch};

use crate::core::{BoardSnapshot, BoardState};
use crate::engine::apply_best_swap;
use crate::protocol::{
    create_ack, create_error, AckMessage, ActionName, ErrorCode, ErrorMessage, ObservationMessage,
    MAX_ACTIONS,
};
use crate::server::{build_observation, run_server, AdapterStatus, ServerConfig, ServerState};
use crate::types::{BoardEvent, Phase, Pos};

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone)]
pub enum InboundPayload {
    Command(ClientCommand),
    /// A streaming client just said hello and wants the current board
    SnapshotRequest,
}

/// Command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Swap { a: Pos, b: Pos },
    Actions(ArrayVec<ActionName, MAX_ACTIONS>),
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClient { client_id: usize, line: String },
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientError { client_id: usize, err: ErrorMessage },
    ToClientObservation { client_id: usize, obs: ObservationMessage },
    BroadcastObservation { obs: ObservationMessage },
}

/// Apply a remote command to the session.
///
/// Actions run in order and stop at the first failure. Restart always succeeds.
pub fn apply_command(
    state: &mut BoardState,
    command: &ClientCommand,
) -> Result<(), (ErrorCode, String)> {
    match command {
        ClientCommand::Swap { a, b } => state
            .request_swap(*a, *b)
            .map_err(|e| (ErrorCode::InvalidSwap, e.to_string())),
        ClientCommand::Actions(actions) => {
            for action in actions {
                match action {
                    ActionName::Restart => state.restart(),
                    ActionName::PlayHint => {
                        apply_best_swap(state).map_err(|e| {
                            (
                                ErrorCode::InvalidSwap,
                                format!("{}: {}", e.code(), e.message()),
                            )
                        })?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Reply to one inbound command: apply it and produce the ack or error to send back.
pub fn handle_inbound(
    state: &mut BoardState,
    inbound: &InboundCommand,
    stream: &mut ObservationStream,
) -> OutboundMessage {
    let client_id = inbound.client_id;
    match &inbound.payload {
        InboundPayload::SnapshotRequest => OutboundMessage::ToClientObservation {
            client_id,
            obs: stream.observe(state),
        },
        InboundPayload::Command(command) => match apply_command(state, command) {
            Ok(()) => OutboundMessage::ToClientAck {
                client_id,
                ack: create_ack(inbound.seq),
            },
            Err((code, message)) => OutboundMessage::ToClientError {
                client_id,
                err: create_error(inbound.seq, code, &message),
            },
        },
    }
}

/// Decides when streaming clients get a fresh observation: whenever the board hash or
/// the phase changed since the last one. Also numbers outgoing observations.
#[derive(Debug, Clone, Default)]
pub struct ObservationStream {
    seq: u64,
    last_key: Option<(u64, Phase, u32)>,
    last_event: Option<BoardEvent>,
    snap: BoardSnapshot,
}

impl ObservationStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the latest engine event so the next observation reports it.
    pub fn record_event(&mut self, event: BoardEvent) {
        self.last_event = Some(event);
    }

    /// Observation of the current state, whether or not it changed.
    pub fn observe(&mut self, state: &BoardState) -> ObservationMessage {
        state.snapshot_into(&mut self.snap);
        self.seq += 1;
        build_observation(&self.snap, self.seq, self.last_event)
    }

    /// Observation only when something visible changed since the last call.
    pub fn poll(&mut self, state: &BoardState) -> Option<ObservationMessage> {
        state.snapshot_into(&mut self.snap);
        let key = (self.snap.board_hash, self.snap.phase, self.snap.episode_id);
        if self.last_key == Some(key) {
            return None;
        }
        self.last_key = Some(key);
        self.seq += 1;
        Some(build_observation(&self.snap, self.seq, self.last_event))
    }
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    status_rx: watch::Receiver<AdapterStatus>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `GEM_AI_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        if ServerState::is_disabled() {
            return Ok(None);
        }
        Self::start(ServerConfig::from_env()).map(Some)
    }

    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (status_tx, status_rx) = watch::channel(AdapterStatus::default());

        let rt = Runtime::new()?;
        rt.spawn(async move {
            if let Err(e) = run_server(config, cmd_tx, out_rx, None, Some(status_tx)).await {
                eprintln!("[Adapter] Server stopped: {}", e);
            }
        });

        Ok(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
            status_rx,
        })
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    /// Latest connection summary
    pub fn status(&self) -> AdapterStatus {
        *self.status_rx.borrow()
    }
}
