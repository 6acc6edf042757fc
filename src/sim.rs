//! A deterministic, virtual-time test/demo harness for [`combo_core::Engine`].
//!
//! Mirrors the spirit of kanata's own sim tests (`src/tests/sim_tests.rs`):
//! a tiny whitespace-token DSL drives a sequence of presses, releases and
//! time advances through the engine and the resulting behavior trace is
//! collected for inspection. Unlike the real [`crate::timer::TimerHub`],
//! this harness never spawns a thread: time only moves when a `t:<ms>`
//! token says so, and any slot timeout whose deadline has passed is fired
//! before the next token runs. This keeps `cargo test` runs deterministic.

use combo_core::{BehaviorBinding, ComboDef, Engine, Layers, LayerQuery};

/// Positions/slots sized generously enough for the built-in demo combos and
/// for ad-hoc scripts; a real host would size these to its own keymap.
pub const MAX_PRESSED_COMBOS: usize = 4;
pub const MAX_COMBOS_PER_KEY: usize = 4;
pub const MAX_KEYS_PER_COMBO: usize = 4;
pub const KEYMAP_LEN: usize = 32;
const MAX_FORWARDED: usize = MAX_KEYS_PER_COMBO + 1;

pub type DemoEngine<'a, TM> =
    Engine<'a, &'static str, TM, MAX_PRESSED_COMBOS, MAX_COMBOS_PER_KEY, MAX_KEYS_PER_COMBO, KEYMAP_LEN>;

/// A small illustrative combo table: `jk` (positions 1,2) acts like vim's
/// escape chord, and a three-key `xyz` combo overlaps `x`+`y` to
/// demonstrate the longer-chord-wins behavior described in the engine docs.
pub fn demo_combos() -> [ComboDef<'static, &'static str>; 2] {
    [
        ComboDef {
            key_positions: &[1, 2],
            behavior: "esc",
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 100,
            layers: Layers::All,
        },
        ComboDef {
            key_positions: &[1, 2, 3],
            behavior: "leader",
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 101,
            layers: Layers::All,
        },
    ]
}

pub struct FixedLayer(pub u16);
impl LayerQuery for FixedLayer {
    fn highest_active_layer(&self) -> u16 {
        self.0
    }
}

/// Fires on a fixed schedule when told to, and reports whether it is
/// currently scheduled; no real timer thread is involved, the harness
/// drives it directly from the script's `t:` tokens.
#[derive(Default)]
pub struct ScriptTimer {
    scheduled: bool,
}

impl combo_core::Timer for ScriptTimer {
    fn schedule(&mut self, _delay_ms: u32) {
        self.scheduled = true;
    }
    fn cancel(&mut self) -> bool {
        core::mem::take(&mut self.scheduled)
    }
    fn busy_get(&self) -> bool {
        self.scheduled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Press { behavior: &'static str, timestamp: u64 },
    Release { behavior: &'static str, timestamp: u64 },
}

#[derive(Default)]
pub struct Recorder {
    pub trace: Vec<TraceEvent>,
}

impl BehaviorBinding<&'static str> for Recorder {
    fn press(&mut self, binding: &&'static str, _virtual_position: u16, timestamp: u64) {
        self.trace.push(TraceEvent::Press { behavior: binding, timestamp });
    }
    fn release(&mut self, binding: &&'static str, _virtual_position: u16, timestamp: u64) {
        self.trace.push(TraceEvent::Release { behavior: binding, timestamp });
    }
}

/// Runs every pending slot timeout whose deadline has already passed at
/// `now`. Looping until a pass changes nothing matters because firing one
/// slot's timeout can collapse a candidate list in a way that makes no
/// further difference, but it can never create a new deadline earlier than
/// `now`, so one pass per slot per call is sufficient.
fn drain_due_timeouts(
    engine: &mut DemoEngine<'_, ScriptTimer>,
    now: u64,
    layer: &FixedLayer,
    rec: &mut Recorder,
) {
    for slot_idx in 0..MAX_PRESSED_COMBOS {
        let due = engine
            .slot_candidates(slot_idx)
            .iter()
            .map(|c| c.deadline)
            .min()
            .map(|d| d <= now)
            .unwrap_or(false);
        if due {
            let _ = engine.handle_timeout::<MAX_FORWARDED>(slot_idx, now, layer, rec);
        }
    }
}

/// Parses and runs a script of whitespace-separated tokens:
/// - `t:<ms>`    advance virtual time by `ms` milliseconds, firing any
///               timeouts that come due along the way.
/// - `d:<pos>`   press (down) the key at position `pos`.
/// - `u:<pos>`   release (up) the key at position `pos`.
///
/// Returns the recorded behavior press/release trace, in emission order.
pub fn simulate(combos: &[ComboDef<'_, &'static str>], script: &str, layer: u16) -> Vec<TraceEvent> {
    let mut engine = DemoEngine::<ScriptTimer>::new(combos, |_| ScriptTimer::default())
        .expect("demo combo table must be valid");
    let layer = FixedLayer(layer);
    let mut rec = Recorder::default();
    let mut now = 0u64;

    for token in script.split_whitespace() {
        let (kind, val) = token.split_once(':').unwrap_or_else(|| panic!("invalid token {token}"));
        match kind {
            "t" => {
                let delta: u64 = val.parse().unwrap_or_else(|_| panic!("invalid tick {val}"));
                now += delta;
                drain_due_timeouts(&mut engine, now, &layer, &mut rec);
            }
            "d" => {
                let position: u16 = val.parse().unwrap_or_else(|_| panic!("invalid position {val}"));
                let _ = engine.handle_press::<MAX_FORWARDED>(position, now, &layer, &mut rec);
            }
            "u" => {
                let position: u16 = val.parse().unwrap_or_else(|_| panic!("invalid position {val}"));
                let _ = engine.handle_release::<MAX_FORWARDED>(position, now, &layer, &mut rec);
            }
            _ => panic!("invalid token {token}"),
        }
    }
    rec.trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_escape_chord_fires() {
        let combos = demo_combos();
        // pressing 1 then 2 promptly fires `esc`, holding off `leader` since
        // position 3 never arrives before the 50ms timeout.
        let trace = simulate(&combos, "d:1 t:5 d:2 t:60", 0);
        assert_eq!(
            trace,
            vec![TraceEvent::Press { behavior: "esc", timestamp: 0 }]
        );
    }

    #[test]
    fn demo_leader_chord_wins_when_third_key_arrives_in_time() {
        let combos = demo_combos();
        let trace = simulate(&combos, "d:1 t:5 d:2 t:5 d:3 t:60", 0);
        assert_eq!(
            trace,
            vec![TraceEvent::Press { behavior: "leader", timestamp: 0 }]
        );
    }
}
