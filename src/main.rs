//! Terminal Gem Fusion runner (default binary).
//!
//! Keyboard and mouse drive a cursor over the board; the remote control adapter runs
//! alongside unless `GEM_AI_DISABLED` is set. Rendering goes through the diffing
//! framebuffer renderer.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};

use gem_fusion::adapter::{handle_inbound, Adapter, ObservationStream, OutboundMessage};
use gem_fusion::core::{BoardSnapshot, BoardState, RuleSet};
use gem_fusion::engine::{best_swap, has_legal_swap};
use gem_fusion::input::{handle_key_event, should_quit, Cursor, CursorOutcome};
use gem_fusion::term::{
    AdapterStatusView, Animator, Decor, FrameBuffer, GameView, TerminalRenderer, Viewport,
};
use gem_fusion::types::{BoardEvent, Phase, PlayerAction, Pos, TICK_MS};

/// Longest step fed to the engine after a stall, so one slow frame cannot skip phases
const MAX_STEP_MS: u32 = 250;

fn main() -> Result<()> {
    let adapter = Adapter::start_from_env()?;

    let mut term = TerminalRenderer::new();
    let result = term.enter().and_then(|_| run(&mut term, adapter));

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

/// `GEM_SEED` when set, otherwise derived from the clock.
fn session_seed() -> u32 {
    if let Some(seed) = std::env::var("GEM_SEED")
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
    {
        return seed;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}

/// Presentation-side state that lives next to the engine.
struct Session {
    state: BoardState,
    animator: Animator,
    cursor: Cursor,
    hint: Option<(Pos, Pos)>,
    no_moves: bool,
    checked_hash: Option<u64>,
    episode_id: u32,
}

impl Session {
    fn new(seed: u32, rules: RuleSet) -> Self {
        let state = BoardState::with_rules(seed, rules);
        let episode_id = state.episode_id();
        Self {
            state,
            animator: Animator::new(rules),
            cursor: Cursor::new(),
            hint: None,
            no_moves: false,
            checked_hash: None,
            episode_id,
        }
    }

    fn apply_action(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::Hint => {
                self.hint = if self.state.phase().accepts_input() {
                    best_swap(self.state.grid())
                } else {
                    None
                };
            }
            PlayerAction::Restart => self.state.restart(),
            _ => {
                let outcome = self.cursor.apply(action);
                self.on_cursor(outcome);
            }
        }
    }

    fn on_cursor(&mut self, outcome: CursorOutcome) {
        if let CursorOutcome::SwapRequested(a, b) = outcome {
            // Rejected swaps (busy board, no moves left) just drop the selection.
            let _ = self.state.request_swap(a, b);
        }
    }

    /// Forward engine events to the animator and the observation stream.
    fn drain_events(&mut self, stream: &mut ObservationStream) {
        for ev in self.state.take_events() {
            if matches!(ev, BoardEvent::Swapped { .. }) {
                self.hint = None;
            }
            self.animator.on_event(ev);
            stream.record_event(ev);
        }

        if self.state.episode_id() != self.episode_id {
            self.episode_id = self.state.episode_id();
            self.animator.reset();
            self.cursor.reset();
            self.hint = None;
        }
    }

    /// Re-scan for legal swaps whenever an idle board changed.
    fn refresh_no_moves(&mut self, snap: &BoardSnapshot) {
        if snap.phase != Phase::Idle || self.checked_hash == Some(snap.board_hash) {
            return;
        }
        self.checked_hash = Some(snap.board_hash);
        self.no_moves = !has_legal_swap(self.state.grid());
    }
}

fn run(term: &mut TerminalRenderer, mut adapter: Option<Adapter>) -> Result<()> {
    let mut session = Session::new(session_seed(), RuleSet::from_env());
    let mut stream = ObservationStream::new();

    let view = GameView::default();
    let mut fb = FrameBuffer::new(0, 0);
    let mut snap = BoardSnapshot::default();

    let mut last_tick = Instant::now();
    let tick_duration = Duration::from_millis(TICK_MS as u64);

    loop {
        // Render.
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        let viewport = Viewport::new(w, h);
        session.state.snapshot_into(&mut snap);
        session.refresh_no_moves(&snap);

        let decor = Decor {
            cursor: Some(session.cursor.pos()),
            selected: session.cursor.selected(),
            hint: session.hint,
            no_moves: session.no_moves,
        };
        let status = adapter.as_ref().map(|a| {
            let st = a.status();
            AdapterStatusView {
                enabled: true,
                client_count: st.client_count,
                controller_id: st.controller_id,
                streaming_count: st.streaming_count,
            }
        });
        view.render_into_with(
            &snap,
            Some(&session.animator),
            &decor,
            status.as_ref(),
            viewport,
            &mut fb,
        );
        term.draw_swap(&mut fb)?;

        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if let Some(action) = handle_key_event(key) {
                        session.apply_action(action);
                    }
                }
                Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                    if let Some(pos) = view.hit_test(viewport, mouse.column, mouse.row) {
                        let outcome = session.cursor.select_at(pos);
                        session.on_cursor(outcome);
                    }
                }
                Event::Resize(..) => term.invalidate(),
                _ => {}
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            let elapsed_ms = (last_tick.elapsed().as_millis() as u32).min(MAX_STEP_MS);
            last_tick = Instant::now();

            if let Some(adapter) = adapter.as_mut() {
                while let Some(inbound) = adapter.try_recv() {
                    let reply = handle_inbound(&mut session.state, &inbound, &mut stream);
                    adapter.send(reply);
                }
            }

            session.state.tick(elapsed_ms);
            session.animator.tick(elapsed_ms);
            session.drain_events(&mut stream);

            if let Some(adapter) = adapter.as_ref() {
                if let Some(obs) = stream.poll(&session.state) {
                    adapter.send(OutboundMessage::BroadcastObservation { obs });
                }
            }
        }
    }
}
