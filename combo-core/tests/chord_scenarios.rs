//! End-to-end scenarios for the combo decision engine: feed a timed
//! sequence of presses/releases/timeouts through [`Engine`] and assert on
//! the behavior press/release trace and the raw events it forwards.

use combo_core::{BehaviorBinding, ComboDef, EventResponse, Layers, LayerQuery, RawEvent, Timer};
use combo_core::Engine;

#[ctor::ctor]
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct RecordingTimer {
    scheduled: bool,
}

impl Timer for RecordingTimer {
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

struct FixedLayer(u16);
impl LayerQuery for FixedLayer {
    fn highest_active_layer(&self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trace {
    Press(u16, u64),
    Release(u16, u64),
}

#[derive(Default)]
struct Recorder {
    trace: Vec<Trace>,
}

impl BehaviorBinding<u16> for Recorder {
    fn press(&mut self, binding: &u16, _virtual_position: u16, timestamp: u64) {
        self.trace.push(Trace::Press(*binding, timestamp));
    }
    fn release(&mut self, binding: &u16, _virtual_position: u16, timestamp: u64) {
        self.trace.push(Trace::Release(*binding, timestamp));
    }
}

const LAYER0: FixedLayer = FixedLayer(0);

#[test]
fn two_key_chord_fires() {
    let combos = [ComboDef {
        key_positions: &[1, 2],
        behavior: 100u16,
        timeout_ms: 50,
        slow_release: false,
        virtual_key_position: 100,
        layers: Layers::All,
    }];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 8>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    let r = engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert!(r.forwarded.is_empty());

    let r = engine.handle_press::<8>(2, 10, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert!(r.forwarded.is_empty());
    assert_eq!(rec.trace, vec![Trace::Press(100, 0)]);

    let r = engine.handle_release::<8>(1, 30, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Handled);
    assert_eq!(rec.trace, vec![Trace::Press(100, 0), Trace::Release(100, 30)]);

    let r = engine.handle_release::<8>(2, 40, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Handled);
    // slow_release is false: only the first release fires the behavior release.
    assert_eq!(rec.trace, vec![Trace::Press(100, 0), Trace::Release(100, 30)]);
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn timeout_falls_back_to_individual_keys() {
    let combos = [ComboDef {
        key_positions: &[1, 2],
        behavior: 100u16,
        timeout_ms: 50,
        slow_release: false,
        virtual_key_position: 100,
        layers: Layers::All,
    }];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 8>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);

    let r = engine.handle_timeout::<8>(0, 50, &LAYER0, &mut rec);
    assert_eq!(r.forwarded.len(), 1);
    assert_eq!(r.forwarded[0], RawEvent::Press { position: 1, timestamp: 0 });
    assert!(rec.trace.is_empty());

    let r = engine.handle_press::<8>(2, 60, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);

    let r = engine.handle_timeout::<8>(0, 110, &LAYER0, &mut rec);
    assert_eq!(r.forwarded.len(), 1);
    assert_eq!(r.forwarded[0], RawEvent::Press { position: 2, timestamp: 60 });
    assert!(rec.trace.is_empty());
}

#[test]
fn overlapping_chords_longer_wins() {
    let combos = [
        ComboDef {
            key_positions: &[1, 2],
            behavior: 100u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 100,
            layers: Layers::All,
        },
        ComboDef {
            key_positions: &[1, 2, 3],
            behavior: 101u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 101,
            layers: Layers::All,
        },
    ];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 8>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);
    engine.handle_press::<8>(2, 5, &LAYER0, &mut rec);
    assert!(rec.trace.is_empty(), "A must not fire just because it is fully pressed while B is still possible");

    engine.handle_press::<8>(3, 10, &LAYER0, &mut rec);
    assert_eq!(rec.trace, vec![Trace::Press(101, 0)]);
}

#[test]
fn overlapping_chords_shorter_wins_on_timeout() {
    let combos = [
        ComboDef {
            key_positions: &[1, 2],
            behavior: 100u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 100,
            layers: Layers::All,
        },
        ComboDef {
            key_positions: &[1, 2, 3],
            behavior: 101u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 101,
            layers: Layers::All,
        },
    ];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 8>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);
    engine.handle_press::<8>(2, 5, &LAYER0, &mut rec);
    engine.handle_timeout::<8>(0, 50, &LAYER0, &mut rec);

    assert_eq!(rec.trace, vec![Trace::Press(100, 0)]);
}

#[test]
fn slow_release_waits_for_last_key() {
    let combos = [ComboDef {
        key_positions: &[1, 2],
        behavior: 100u16,
        timeout_ms: 50,
        slow_release: true,
        virtual_key_position: 100,
        layers: Layers::All,
    }];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 8>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);
    engine.handle_press::<8>(2, 10, &LAYER0, &mut rec);
    engine.handle_release::<8>(1, 20, &LAYER0, &mut rec);
    assert_eq!(rec.trace, vec![Trace::Press(100, 0)], "slow release must not fire on the first key-up");

    engine.handle_release::<8>(2, 30, &LAYER0, &mut rec);
    assert_eq!(rec.trace, vec![Trace::Press(100, 0), Trace::Release(100, 30)]);
}

#[test]
fn disjoint_simultaneous_attempts_both_fire_in_arrival_order() {
    let combos = [
        ComboDef {
            key_positions: &[1, 2],
            behavior: 100u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 100,
            layers: Layers::All,
        },
        ComboDef {
            key_positions: &[8, 9],
            behavior: 200u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 200,
            layers: Layers::All,
        },
    ];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 16>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);
    engine.handle_press::<8>(8, 1, &LAYER0, &mut rec);
    engine.handle_press::<8>(2, 2, &LAYER0, &mut rec);
    engine.handle_press::<8>(9, 3, &LAYER0, &mut rec);

    assert_eq!(rec.trace, vec![Trace::Press(100, 0), Trace::Press(200, 1)]);
}

#[test]
fn filler_key_interleaved_with_disjoint_attempt_breaks_the_earlier_candidate() {
    // A non-combo filler key reuses `last_used_slot` unconditionally, with
    // no attempt to steer clear of a still-open, unrelated chord attempt.
    // Combo A is {1,2}; combo B is {8,9}; position 5 belongs to neither. Pressing 1,
    // then the filler 5, then starting B, then finishing A's second key,
    // then finishing B demonstrates the fallout: the filler press gets
    // buffered into A's slot (the last one touched), which intersects A's
    // candidate list down to nothing and breaks the A attempt entirely —
    // B still fires normally, but A's second key (2) never completes a
    // chord and is later released back downstream on its own.
    let combos = [
        ComboDef {
            key_positions: &[1, 2],
            behavior: 100u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 100,
            layers: Layers::All,
        },
        ComboDef {
            key_positions: &[8, 9],
            behavior: 200u16,
            timeout_ms: 50,
            slow_release: false,
            virtual_key_position: 200,
            layers: Layers::All,
        },
    ];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 16>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    let r = engine.handle_press::<8>(1, 0, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert!(r.forwarded.is_empty());

    // Filler key 5 is not part of any combo, so it reuses slot 0 (A's
    // slot) and its merge-intersect against A's candidate list comes up
    // empty: A collapses right here, and both buffered presses (1 and 5)
    // are released back downstream in arrival order.
    let r = engine.handle_press::<8>(5, 1, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert_eq!(
        r.forwarded.as_slice(),
        &[
            RawEvent::Press { position: 1, timestamp: 0 },
            RawEvent::Press { position: 5, timestamp: 1 },
        ]
    );
    assert!(rec.trace.is_empty(), "breaking A must not fire anything");

    // B starts fresh on the now-free slot.
    let r = engine.handle_press::<8>(8, 2, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert!(r.forwarded.is_empty());

    // A's second key arrives, but its candidate is long gone: this
    // establishes a brand-new, lone A candidate on a different slot,
    // still short one key.
    let r = engine.handle_press::<8>(2, 3, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert!(r.forwarded.is_empty());
    assert!(rec.trace.is_empty());

    // B completes normally, unaffected by A's earlier breakage.
    let r = engine.handle_press::<8>(9, 4, &LAYER0, &mut rec);
    assert_eq!(r.response, EventResponse::Captured);
    assert!(r.forwarded.is_empty());
    assert_eq!(rec.trace, vec![Trace::Press(200, 2)]);

    // A's orphaned "2" press never completes a chord; once its slot's
    // timeout elapses it is released downstream as a plain key press.
    let slot_a = engine.position_claim(2).expect("position 2 still claimed by A's new slot");
    let r = engine.handle_timeout::<8>(slot_a as usize, 53, &LAYER0, &mut rec);
    assert_eq!(r.forwarded.as_slice(), &[RawEvent::Press { position: 2, timestamp: 3 }]);
    assert_eq!(rec.trace, vec![Trace::Press(200, 2)], "still only B ever fired");
}

#[test]
fn idempotent_cleanup_on_empty_slot() {
    let combos: [ComboDef<'static, u16>; 0] = [];
    let mut engine = Engine::<u16, RecordingTimer, 4, 4, 4, 8>::new(&combos, |_| RecordingTimer::default()).unwrap();
    let mut rec = Recorder::default();

    let r1 = engine.handle_timeout::<8>(0, 1000, &LAYER0, &mut rec);
    let r2 = engine.handle_timeout::<8>(0, 2000, &LAYER0, &mut rec);
    assert!(r1.forwarded.is_empty());
    assert!(r2.forwarded.is_empty());
    assert!(rec.trace.is_empty());
}
