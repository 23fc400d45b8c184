use gem_fusion::core::{BoardState, Grid, RuleSet};
use gem_fusion::engine::{apply_best_swap, best_swap, has_legal_swap, legal_swaps};
use gem_fusion::input::{Cursor, CursorOutcome};
use gem_fusion::types::{BoardEvent, Phase, PlayerAction, Pos, START_MOVES, TICK_MS};

const ONE_SWAP: &str = "\
RRSRADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET";

/// Play greedy hints until the session ends or the board runs out of moves.
fn autoplay(state: &mut BoardState, max_turns: u32) {
    for _ in 0..max_turns {
        if apply_best_swap(state).is_err() {
            break;
        }
        state.settle();
        assert!(
            matches!(state.phase(), Phase::Idle | Phase::GameOver),
            "settle ended in {:?}",
            state.phase()
        );
        assert!(state.grid().is_full());
        assert!(state.find_matches().is_empty());
    }
}

#[test]
fn initialization_never_seeds_a_match() {
    for seed in 0..500u32 {
        let state = BoardState::new(seed);
        assert!(state.grid().is_full(), "seed {seed}");
        assert!(state.find_matches().is_empty(), "seed {seed}");
        assert_eq!(state.phase(), Phase::Idle);
    }
}

#[test]
fn settle_always_ends_full_and_match_free() {
    for seed in 0..40u32 {
        let mut state = BoardState::new(seed);
        autoplay(&mut state, START_MOVES);
    }
}

#[test]
fn greedy_session_spends_every_move() {
    let mut state = BoardState::new(2024);
    autoplay(&mut state, START_MOVES + 5);

    if state.moves_left() == 0 {
        assert!(state.is_game_over());
        assert!(state.score() > 0);
    } else {
        // Only possible when the board ran dry of legal swaps.
        assert!(!has_legal_swap(state.grid()));
    }
}

#[test]
fn identical_seeds_produce_identical_sessions() {
    let mut a = BoardState::new(77);
    let mut b = BoardState::new(77);
    assert_eq!(a.snapshot(), b.snapshot());

    autoplay(&mut a, 10);
    autoplay(&mut b, 10);
    assert_eq!(a.snapshot(), b.snapshot());

    a.restart();
    b.restart();
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.episode_id(), 1);
}

#[test]
fn different_seeds_produce_different_boards() {
    let a = BoardState::new(1).snapshot();
    let b = BoardState::new(2).snapshot();
    assert_ne!(a.board_hash, b.board_hash);
}

#[test]
fn every_legal_swap_is_accepted_and_kept() {
    let state = BoardState::new(9);
    for (a, b) in legal_swaps(state.grid()) {
        let mut probe = state.clone();
        probe.request_swap(a, b).unwrap();
        assert!(probe.resolve_after_animation(), "{a} <-> {b}");
        assert!(probe.score() > 0);
    }
}

#[test]
fn tick_driven_turn_emits_events_in_order() {
    let grid = Grid::parse(ONE_SWAP).unwrap();
    let mut state = BoardState::from_grid(grid, 5, RuleSet::default());
    state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();

    let mut kinds = Vec::new();
    for _ in 0..2000 {
        state.tick(TICK_MS);
        for ev in state.take_events() {
            kinds.push(ev.as_str());
        }
        if state.phase() == Phase::Idle {
            break;
        }
    }

    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(&kinds[..4], &["swapped", "cleared", "collapsed", "refilled"]);
    assert!(state.score() >= 30);
    assert_eq!(state.moves_left(), START_MOVES - 1);
}

#[test]
fn reverted_swap_charges_a_move_unless_configured() {
    let base = Grid::parse(&ONE_SWAP.replacen("RRSRADRS", "RSETADRS", 1)).unwrap();

    let mut charged = BoardState::from_grid(base, 1, RuleSet::default());
    charged.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
    charged.settle();
    assert_eq!(charged.moves_left(), START_MOVES - 1);
    assert!(matches!(
        charged.last_event(),
        Some(BoardEvent::SwapReverted { .. })
    ));

    let rules = RuleSet {
        charge_reverted_swaps: false,
        ..RuleSet::default()
    };
    let mut free = BoardState::from_grid(base, 1, rules);
    free.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
    free.settle();
    assert_eq!(free.moves_left(), START_MOVES);
    assert_eq!(free.turn_id(), 1);
}

#[test]
fn cursor_selection_drives_a_swap() {
    let grid = Grid::parse(ONE_SWAP).unwrap();
    let mut state = BoardState::from_grid(grid, 5, RuleSet::default());
    let mut cursor = Cursor::new();

    assert_eq!(
        cursor.select_at(Pos::new(0, 2)),
        CursorOutcome::Selected(Pos::new(0, 2))
    );
    assert_eq!(
        cursor.apply(PlayerAction::CursorRight),
        CursorOutcome::Moved(Pos::new(0, 3))
    );
    let outcome = cursor.apply(PlayerAction::Select);
    let CursorOutcome::SwapRequested(a, b) = outcome else {
        panic!("expected swap request, got {outcome:?}");
    };
    assert_eq!(cursor.selected(), None);

    state.request_swap(a, b).unwrap();
    assert_eq!(state.pending_swap(), Some((Pos::new(0, 2), Pos::new(0, 3))));
}

#[test]
fn hint_matches_only_legal_swap() {
    let grid = Grid::parse(ONE_SWAP).unwrap();
    assert_eq!(legal_swaps(&grid).len(), 1);
    assert_eq!(best_swap(&grid), Some((Pos::new(0, 2), Pos::new(0, 3))));
}

#[test]
fn zero_move_budget_starts_game_over() {
    let rules = RuleSet {
        start_moves: 0,
        ..RuleSet::default()
    };
    let mut state = BoardState::with_rules(3, rules);
    assert!(state.is_game_over());
    assert!(state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).is_err());
    assert!(apply_best_swap(&mut state).is_err());
}
