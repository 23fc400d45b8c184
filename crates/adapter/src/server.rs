//! TCP server for the remote control adapter
//!
//! Accepts connections, enforces handshake/controller/sequence rules and forwards
//! validated commands to the game loop over a bounded channel.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch, RwLock};

use crate::core::{BoardSnapshot, Fnv1a};
use crate::protocol::*;
use crate::runtime::{ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
use crate::types::{BoardEvent, GRID_COLS, GRID_ROWS};

/// Pull `"seq": N` out of a line that failed to parse.
fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7788,
            protocol_version: "2.0.0".to_string(),
            max_pending_commands: 10,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Read `GEM_AI_HOST`, `GEM_AI_PORT`, `GEM_AI_MAX_PENDING` and `GEM_AI_LOG_PATH`.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("GEM_AI_HOST").unwrap_or(defaults.host);
        let port = env::var("GEM_AI_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let max_pending_commands = env::var("GEM_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        let log_path = env::var("GEM_AI_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_commands,
            log_path,
        }
    }

    /// Resolve `host:port`. Host names go through the system resolver.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let text = format!("{}:{}", self.host, self.port);
        if let Ok(addr) = text.parse() {
            return Ok(addr);
        }
        text.to_socket_addrs()?
            .next()
            .ok_or_else(|| anyhow!("no address for {}", text))
    }
}

/// Connection summary published to the game loop for its status panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterStatus {
    pub client_count: u16,
    pub streaming_count: u16,
    pub controller_id: Option<usize>,
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<usize>>,
    status_tx: Option<watch::Sender<AdapterStatus>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
            status_tx: None,
        }
    }

    pub fn with_status(mut self, status_tx: watch::Sender<AdapterStatus>) -> Self {
        self.status_tx = Some(status_tx);
        self
    }

    /// `GEM_AI_DISABLED=1|true` turns the adapter off
    pub fn is_disabled() -> bool {
        std::env::var("GEM_AI_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

async fn publish_status(state: &ServerState) {
    let Some(tx) = state.status_tx.as_ref() else {
        return;
    };
    let controller_id = *state.controller.read().await;
    let clients = state.clients.read().await;
    tx.send_replace(AdapterStatus {
        client_count: clients.iter().filter(|c| c.handshaken).count() as u16,
        streaming_count: clients.iter().filter(|c| c.stream_observations).count() as u16,
        controller_id,
    });
}

async fn is_handshaken(state: &ServerState, client_id: usize) -> bool {
    let clients = state.clients.read().await;
    clients
        .iter()
        .find(|c| c.id == client_id)
        .map(|c| c.handshaken)
        .unwrap_or(false)
}

async fn is_controller(state: &ServerState, client_id: usize) -> bool {
    *state.controller.read().await == Some(client_id)
}

/// Accept `seq` only if it is strictly greater than the client's previous one.
async fn check_and_update_seq(state: &ServerState, client_id: usize, seq: u64) -> bool {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return true;
    };

    match client.last_seq {
        Some(prev) if seq <= prev => false,
        _ => {
            client.last_seq = Some(seq);
            true
        }
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: usize,
    pub addr: SocketAddr,
    pub command_mode: CommandMode,
    pub stream_observations: bool,
    pub handshaken: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Line(String),
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
    Observation(ObservationMessage),
}

impl ClientOutbound {
    /// Serialize into `buf` (cleared first). Raw lines are copied as-is.
    fn encode_into(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        buf.clear();
        match self {
            ClientOutbound::Line(line) => {
                buf.extend_from_slice(line.as_bytes());
                Ok(())
            }
            ClientOutbound::Ack(m) => write_json(buf, m),
            ClientOutbound::Error(m) => write_json(buf, m),
            ClientOutbound::Welcome(m) => write_json(buf, m),
            ClientOutbound::Observation(m) => write_json(buf, m),
        }
    }
}

fn write_json<T: Serialize>(buf: &mut Vec<u8>, value: &T) -> serde_json::Result<()> {
    serde_json::to_writer(buf, value)
}

/// One line of the JSONL wire log
#[derive(Debug, Clone)]
enum WireRecord {
    Inbound(Vec<u8>),
    Outbound(Vec<u8>),
}

fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<WireRecord> {
    let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                eprintln!("[Adapter] Wire log {} unavailable: {}", path, e);
                return;
            }
        };

        while let Some(rec) = rx.recv().await {
            let bytes = match &rec {
                WireRecord::Inbound(b) | WireRecord::Outbound(b) => b,
            };
            if file.write_all(bytes).await.is_err() || file.write_all(b"\n").await.is_err() {
                break;
            }
        }

        let _ = file.flush().await;
    });
    tx
}

/// Start the TCP server.
///
/// `ready_tx` receives the bound address, which is how tests learn the port when
/// binding to port 0. `status_tx`, when given, is updated on every handshake, role
/// change and disconnect.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
    status_tx: Option<watch::Sender<AdapterStatus>>,
) -> anyhow::Result<()> {
    if ServerState::is_disabled() {
        println!("[Adapter] Remote control disabled via GEM_AI_DISABLED");
        return Ok(());
    }

    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    println!("[Adapter] TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut state = ServerState::new(config);
    if let Some(tx) = status_tx {
        state = state.with_status(tx);
    }
    let state = Arc::new(state);
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                let send_to = |client_id: usize, out: ClientOutbound| {
                    if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                        let _ = c.tx.send(out);
                    }
                };
                match msg {
                    OutboundMessage::ToClient { client_id, line } => {
                        send_to(client_id, ClientOutbound::Line(line));
                    }
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        send_to(client_id, ClientOutbound::Ack(ack));
                    }
                    OutboundMessage::ToClientError { client_id, err } => {
                        send_to(client_id, ClientOutbound::Error(err));
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        send_to(client_id, ClientOutbound::Observation(obs));
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        for c in clients.iter().filter(|c| c.stream_observations) {
                            let _ = c.tx.send(ClientOutbound::Observation(obs.clone()));
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        println!("[Adapter] Client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_client(socket, addr, client_id, &state, command_tx, wire_log_tx).await
            {
                eprintln!("[Adapter] Client {} error: {}", client_id, e);
            }
            publish_status(&state).await;
            println!("[Adapter] Client {} disconnected", client_id);
        });
    }
}

/// Drop a client; a departing controller hands control to the lowest remaining id.
async fn remove_client(state: &ServerState, client_id: usize) {
    let mut controller = state.controller.write().await;
    let mut clients = state.clients.write().await;

    clients.retain(|c| c.id != client_id);
    if *controller != Some(client_id) {
        return;
    }

    *controller = clients.iter().filter(|c| c.handshaken).map(|c| c.id).min();
    match *controller {
        Some(new_id) => println!("[Adapter] Controller {} promoted", new_id),
        None => println!("[Adapter] Controller {} released", client_id),
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: &ServerState,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<WireRecord>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    state.clients.write().await.push(ClientHandle {
        id: client_id,
        addr,
        command_mode: CommandMode::Swap,
        stream_observations: false,
        handshaken: false,
        last_seq: None,
        tx: tx.clone(),
    });

    let wire_log_out = wire_log_tx.clone();
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            if msg.encode_into(&mut buf).is_err() {
                continue;
            }
            if let Some(log) = wire_log_out.as_ref() {
                let _ = log.send(WireRecord::Outbound(buf.clone()));
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let reply_error = |seq: u64, code: ErrorCode, message: &str| {
        let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
    };

    let mut result = Ok(());
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }

        let raw_line = line.trim_end_matches(['\n', '\r']);
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(log) = wire_log_tx.as_ref() {
            let _ = log.send(WireRecord::Inbound(raw_line.as_bytes().to_vec()));
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if is_handshaken(state, client_id).await
                    && !check_and_update_seq(state, client_id, hello.seq).await
                {
                    reply_error(hello.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                if !hello.protocol_version.starts_with("2.") {
                    reply_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    break;
                }

                let wants_control = hello.requested.role != Some(RequestedRole::Observer);
                let (role, controller_id) = {
                    let mut controller = state.controller.write().await;
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.command_mode = hello.requested.command_mode;
                        client.stream_observations = hello.requested.stream_observations;
                    }
                    if controller.is_none() && wants_control {
                        *controller = Some(client_id);
                        println!("[Adapter] Client {} is now controller", client_id);
                    }
                    let role = if *controller == Some(client_id) {
                        AssignedRole::Controller
                    } else {
                        AssignedRole::Observer
                    };
                    (role, controller.map(|id| id as u64))
                };

                publish_status(state).await;

                let welcome = create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id as u64,
                    role,
                    controller_id,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.requested.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                if !is_handshaken(state, client_id).await {
                    reply_error(cmd.seq, ErrorCode::HandshakeRequired, "Send hello before command");
                    continue;
                }
                if !check_and_update_seq(state, client_id, cmd.seq).await {
                    reply_error(cmd.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }
                if !is_controller(state, client_id).await {
                    reply_error(cmd.seq, ErrorCode::NotController, "Only controller may send commands");
                    continue;
                }

                let mapped = match map_command(&cmd) {
                    Ok(c) => c,
                    Err((code, message)) => {
                        reply_error(cmd.seq, code, &message);
                        continue;
                    }
                };

                // The game loop acks once the command is applied.
                let queued = command_tx.try_send(InboundCommand {
                    client_id,
                    seq: cmd.seq,
                    payload: InboundPayload::Command(mapped),
                });
                if queued.is_err() {
                    reply_error(cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => {
                if !is_handshaken(state, client_id).await {
                    reply_error(ctrl.seq, ErrorCode::HandshakeRequired, "Send hello before control");
                    continue;
                }
                if !check_and_update_seq(state, client_id, ctrl.seq).await {
                    reply_error(ctrl.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                let mut controller = state.controller.write().await;
                let before = *controller;
                match ctrl.action {
                    ControlAction::Claim => match *controller {
                        None => {
                            *controller = Some(client_id);
                            println!("[Adapter] Client {} claimed control", client_id);
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq)));
                        }
                        Some(id) if id == client_id => {
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq)));
                        }
                        Some(_) => {
                            reply_error(ctrl.seq, ErrorCode::ControllerActive, "Controller already assigned");
                        }
                    },
                    ControlAction::Release => {
                        if *controller == Some(client_id) {
                            *controller = None;
                            println!("[Adapter] Client {} released control", client_id);
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq)));
                        } else {
                            reply_error(ctrl.seq, ErrorCode::NotController, "Only controller may release");
                        }
                    }
                }
                let changed = *controller != before;
                drop(controller);
                if changed {
                    publish_status(state).await;
                }
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                if is_handshaken(state, client_id).await
                    && !check_and_update_seq(state, client_id, unknown.seq).await
                {
                    reply_error(unknown.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }
                reply_error(unknown.seq, ErrorCode::InvalidCommand, "Unknown message type");
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                reply_error(seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {}", e));
            }
        }
    }

    // The handle holds a sender too; the write task only ends once both are gone.
    remove_client(state, client_id).await;
    drop(tx);
    let _ = write_task.await;

    result
}

/// Map a protocol command into a game loop command.
fn map_command(cmd: &CommandMessage) -> Result<ClientCommand, (ErrorCode, String)> {
    match cmd.mode {
        CommandMode::Swap => {
            let Some(swap) = cmd.swap else {
                return Err((ErrorCode::InvalidCommand, "Missing swap".to_string()));
            };
            let (a, b) = swap.positions();
            if !a.in_bounds() || !b.in_bounds() {
                return Err((
                    ErrorCode::InvalidSwap,
                    format!("Cell outside the {}x{} grid", GRID_ROWS, GRID_COLS),
                ));
            }
            Ok(ClientCommand::Swap { a, b })
        }
        CommandMode::Action => {
            let Some(ref actions) = cmd.actions else {
                return Err((ErrorCode::InvalidCommand, "Missing actions".to_string()));
            };
            if actions.0.is_empty() {
                return Err((ErrorCode::InvalidCommand, "Empty actions".to_string()));
            }
            Ok(ClientCommand::Actions(actions.0.clone()))
        }
    }
}

/// Build an observation from a snapshot (no heap allocation).
pub fn build_observation(
    snap: &BoardSnapshot,
    seq: u64,
    last_event: Option<BoardEvent>,
) -> ObservationMessage {
    use std::hash::{Hash, Hasher};

    let last_event = last_event.map(LastEvent::from);

    let mut hasher = Fnv1a::new();
    snap.board_hash.hash(&mut hasher);
    snap.phase.hash(&mut hasher);
    snap.score.hash(&mut hasher);
    snap.moves_left.hash(&mut hasher);
    snap.episode_id.hash(&mut hasher);
    snap.seed.hash(&mut hasher);
    snap.turn_id.hash(&mut hasher);
    snap.cascade.hash(&mut hasher);
    snap.pending_swap.hash(&mut hasher);
    snap.game_over.hash(&mut hasher);
    last_event.hash(&mut hasher);
    let state_hash = StateHash(hasher.finish());

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snap.playable(),
        game_over: snap.game_over,
        episode_id: snap.episode_id,
        seed: snap.seed,
        turn_id: snap.turn_id,
        phase: PhaseLower::from(snap.phase),
        board: BoardGrid {
            rows: GRID_ROWS,
            cols: GRID_COLS,
            gems: snap.gems,
            specials: snap.specials,
        },
        score: snap.score,
        moves_left: snap.moves_left,
        cascade: snap.cascade,
        pending_swap: snap
            .pending_swap
            .map(|(a, b)| SwapCommand::from_positions(a, b)),
        last_event,
        state_hash,
    }
}
