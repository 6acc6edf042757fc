//! Host-crate integration tests: exercise `combod::sim` the same way the
//! `combod script`/`combod demo` CLI subcommands do, confirming the wiring
//! between the demo combo table and `combo_core::Engine` end to end.

use combod::sim::{self, TraceEvent};

#[ctor::ctor]
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn escape_chord_fires_and_releases_on_first_key_up() {
    let combos = sim::demo_combos();
    let trace = sim::simulate(&combos, "d:1 t:5 d:2 u:1 t:20 u:2 t:60", 0);
    // `esc` is not slow-release, so the behavior releases at the first of
    // its two keys to come up, not the last.
    assert_eq!(
        trace,
        vec![
            TraceEvent::Press { behavior: "esc", timestamp: 0 },
            TraceEvent::Release { behavior: "esc", timestamp: 5 },
        ]
    );
}

#[test]
fn leader_chord_beats_escape_when_third_key_follows() {
    let combos = sim::demo_combos();
    let trace = sim::simulate(&combos, "d:1 t:5 d:2 t:5 d:3 t:60", 0);
    assert_eq!(
        trace,
        vec![TraceEvent::Press { behavior: "leader", timestamp: 0 }]
    );
}

#[test]
fn non_combo_key_does_not_trigger_anything() {
    let combos = sim::demo_combos();
    let trace = sim::simulate(&combos, "d:20 t:5 u:20 t:5 d:21 t:5 u:21", 0);
    assert!(trace.is_empty());
}
