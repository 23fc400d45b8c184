use gem_fusion::core::{
    find_matches, plan_resolution, score_matches, BoardState, Grid, RuleSet, Upgrade,
};
use gem_fusion::types::{Axis, BoardEvent, GemKind, Phase, Pos, SpecialKind};

const BASE: &str = "\
RSETADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET";

fn grid_with_row0(row0: &str) -> Grid {
    Grid::parse(&BASE.replacen("RSETADRS", row0, 1)).unwrap()
}

fn state_with_row0(row0: &str) -> BoardState {
    BoardState::from_grid(grid_with_row0(row0), 99, RuleSet::default())
}

#[test]
fn three_run_at_row_start_is_reported_once() {
    let grid = grid_with_row0("RRRSADRS");
    let matches = find_matches(&grid);

    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.kind, GemKind::Ruby);
    assert_eq!(m.axis, Axis::Row);
    assert_eq!(m.coords().as_slice(), &[(0, 0), (0, 1), (0, 2)]);
    assert_eq!(score_matches(&matches), 30);
}

#[test]
fn matching_swap_scores_base_reward() {
    let mut state = state_with_row0("RRSRADRS");
    state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
    assert_eq!(state.phase(), Phase::AnimatingSwap);
    assert_eq!(state.score(), 0);

    assert!(state.resolve_after_animation());
    assert_eq!(state.phase(), Phase::ResolvingMatches);
    assert_eq!(state.score(), 30);
    assert_eq!(state.cascade(), 1);
}

#[test]
fn matched_cells_are_eventually_cleared() {
    let mut state = state_with_row0("RRSRADRS");
    let _ = state.take_events();
    state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
    state.advance();

    let cleared = state
        .take_events()
        .into_iter()
        .find_map(|ev| match ev {
            BoardEvent::Cleared { cells, .. } => Some(cells),
            _ => None,
        })
        .expect("swap should clear its run");
    let run = Pos::new(0, 0).bit() | Pos::new(0, 1).bit() | Pos::new(0, 2).bit();
    assert_eq!(cleared, run);

    // Clearing happens on the next transition; the run sits in the top row, so gravity
    // leaves those cells empty until refill.
    state.advance();
    assert_eq!(state.phase(), Phase::Falling);
    assert_eq!(state.grid().empty_mask(), run);
}

#[test]
fn non_matching_swap_restores_grid() {
    let mut state = state_with_row0("RSETADRS");
    let before = *state.grid();

    state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
    assert_ne!(*state.grid(), before);

    assert!(!state.resolve_after_animation());
    assert_eq!(*state.grid(), before);
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.score(), 0);
}

#[test]
fn gravity_leaves_no_holes_and_refill_fills_every_cell() {
    // The run sits in the middle of the board so gravity has something to move.
    let grid = Grid::parse(
        "\
RSETADRS
ETADRSET
ADRSETAD
RRSRADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET",
    )
    .unwrap();
    let mut state = BoardState::from_grid(grid, 99, RuleSet::default());

    state.request_swap(Pos::new(3, 2), Pos::new(3, 3)).unwrap();
    state.advance(); // resolve
    assert_eq!(state.phase(), Phase::ResolvingMatches);

    state.advance(); // clear + gravity
    assert_eq!(state.phase(), Phase::Falling);
    assert!(state.grid().is_settled());
    assert!(!state.grid().is_full());
    assert_eq!(state.fall()[Pos::new(3, 0).index()], 1);

    state.advance(); // refill
    assert_eq!(state.phase(), Phase::Refilling);
    assert!(state.grid().is_full());
}

#[test]
fn four_run_upgrades_first_cell_to_line_clear() {
    let grid = grid_with_row0("RRRRADRS");
    let matches = find_matches(&grid);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].len(), 4);

    let plan = plan_resolution(&grid, &matches);
    assert_eq!(
        plan.upgrades.as_slice(),
        &[Upgrade {
            pos: Pos::new(0, 0),
            special: SpecialKind::LineClear,
        }]
    );
    assert_eq!(plan.upgraded, Pos::new(0, 0).bit());
    assert_eq!(plan.cleared & Pos::new(0, 0).bit(), 0);
    // 4 cells plus one gem beyond three.
    assert_eq!(plan.score.total, 60);
}

#[test]
fn five_run_upgrades_to_color_bomb() {
    let grid = grid_with_row0("RRRRRDRS");
    let matches = find_matches(&grid);
    let plan = plan_resolution(&grid, &matches);
    assert_eq!(plan.upgrades.len(), 1);
    assert_eq!(plan.upgrades[0].special, SpecialKind::ColorBomb);
}

#[test]
fn crossing_runs_upgrade_shared_cell_to_area_bomb() {
    let grid = Grid::parse(
        "\
ASETADRS
ATADRSET
AAASETAD
RSETADRS
ETADRSET
ADRSETAD
RSETADRS
ETADRSET",
    )
    .unwrap();
    let matches = find_matches(&grid);
    assert_eq!(matches.len(), 2);

    let plan = plan_resolution(&grid, &matches);
    assert!(plan
        .upgrades
        .iter()
        .any(|u| u.pos == Pos::new(2, 0) && u.special == SpecialKind::AreaBomb));
    // Shared cell counted once: 5 distinct cells.
    assert_eq!(score_matches(&matches), 50);
}

#[test]
fn rejected_swap_consumes_nothing() {
    let mut state = state_with_row0("RRSRADRS");
    let moves = state.moves_left();
    let before = *state.grid();

    assert!(state.request_swap(Pos::new(0, 0), Pos::new(1, 1)).is_err());
    assert!(state.request_swap(Pos::new(7, 7), Pos::new(7, 8)).is_err());
    assert_eq!(state.moves_left(), moves);
    assert_eq!(*state.grid(), before);
    assert_eq!(state.turn_id(), 0);
}
