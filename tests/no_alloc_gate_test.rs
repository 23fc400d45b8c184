use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use gem_fusion::core::{BoardSnapshot, BoardState};
use gem_fusion::engine::{apply_best_swap, best_swap, has_legal_swap};
use gem_fusion::types::{Pos, TICK_MS};

struct CountingAlloc;

static COUNT_ENABLED: AtomicBool = AtomicBool::new(false);
static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            let _ = layout;
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            let _ = (layout, new_size);
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.realloc(ptr, layout, new_size)
    }
}

fn with_alloc_counting<F: FnOnce()>(f: F) -> usize {
    ALLOC_COUNT.store(0, Ordering::Relaxed);
    COUNT_ENABLED.store(true, Ordering::Relaxed);
    f();
    COUNT_ENABLED.store(false, Ordering::Relaxed);
    ALLOC_COUNT.load(Ordering::Relaxed)
}

#[test]
fn core_hot_paths_do_not_allocate() {
    // Setup (outside counting) so one-time allocations don't trip the gate.
    let mut state = BoardState::new(1);
    let mut snap = BoardSnapshot::default();

    // Warm-up.
    let _ = state.tick(TICK_MS);
    state.snapshot_into(&mut snap);

    let allocs = with_alloc_counting(|| {
        // Idle ticks and rejected swaps should be allocation-free.
        for _ in 0..200 {
            let _ = state.tick(TICK_MS);
        }
        for _ in 0..50 {
            let _ = state.request_swap(Pos::new(0, 0), Pos::new(2, 2));
        }

        // Full turns drive matching, scoring, gravity, refill and cascades.
        for _ in 0..60 {
            let _ = has_legal_swap(state.grid());
            let _ = best_swap(state.grid());
            if apply_best_swap(&mut state).is_err() {
                state.restart();
                continue;
            }
            // Advance timers the way the game loop does.
            while state.is_busy() {
                let _ = state.tick(TICK_MS);
                let _ = state.take_events();
            }
            state.snapshot_into(&mut snap);
        }
    });

    assert!(allocs == 0);
}
