//! Frames produced by the game view feed the diff encoder: an unchanged board costs
//! nothing, and a swap only repaints the cells around it.

use gem_fusion::core::{BoardState, Grid, RuleSet};
use gem_fusion::term::{encode_diff_into, encode_full_into, Animator, Decor, GameView, Viewport};
use gem_fusion::types::{Pos, TICK_MS};

const ONE_SWAP: &str = "\
RRSRADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET";

#[test]
fn unchanged_board_encodes_no_runs() {
    let state = BoardState::new(12345);
    let view = GameView::default();
    let vp = Viewport::new(80, 24);

    let a = view.render(&state.snapshot(), vp);
    let b = view.render(&state.snapshot(), vp);

    let mut out = Vec::new();
    let stats = encode_diff_into(&a, &b, &mut out).unwrap();
    assert_eq!(stats.runs, 0);
    assert_eq!(stats.cells, 0);
}

#[test]
fn swap_frame_repaints_only_part_of_the_screen() {
    let mut state = BoardState::from_grid(Grid::parse(ONE_SWAP).unwrap(), 8, RuleSet::default());
    let mut animator = Animator::new(*state.rules());
    let view = GameView::default();
    let vp = Viewport::new(80, 24);
    let decor = Decor::default();

    let before = view.render_with(&state.snapshot(), Some(&animator), &decor, None, vp);

    state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
    for ev in state.take_events() {
        animator.on_event(ev);
    }
    animator.tick(TICK_MS * 4);
    let after = view.render_with(&state.snapshot(), Some(&animator), &decor, None, vp);

    let mut diff = Vec::new();
    let stats = encode_diff_into(&before, &after, &mut diff).unwrap();
    assert!(stats.cells > 0);
    assert!(stats.cells < 80 * 24 / 4);

    let mut full = Vec::new();
    let full_stats = encode_full_into(&after, &mut full).unwrap();
    assert_eq!(full_stats.cells, 80 * 24);
    assert!(diff.len() < full.len());
}

#[test]
fn resized_frame_is_fully_repainted() {
    let state = BoardState::new(3);
    let view = GameView::default();

    let small = view.render(&state.snapshot(), Viewport::new(40, 20));
    let large = view.render(&state.snapshot(), Viewport::new(60, 22));

    let mut out = Vec::new();
    let stats = encode_diff_into(&small, &large, &mut out).unwrap();
    assert_eq!(stats.runs, 22);
    assert_eq!(stats.cells, 60 * 22);
}
