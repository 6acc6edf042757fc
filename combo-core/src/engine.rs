//! The event interceptor: entry point for every key press/release, driving
//! slot selection, candidate tracking, the capture buffer, the active-combo
//! table and the per-slot timeout.

use heapless::Vec as HVec;

use crate::active::ActiveTable;
use crate::candidate::{self, Candidate};
use crate::config::{ComboDef, ComboInitError, ComboTable};
use crate::event::{EventResponse, RawEvent};
use crate::slot::{CapturedPress, Slot};
use crate::traits::{BehaviorBinding, LayerQuery, Timer};

/// Result of one call into the engine: the response owed to the event bus
/// for the event just handed in, plus any events the engine independently
/// forwarded downstream while resolving it (residual captures released
/// during cleanup, re-raised presses that ultimately passed through).
///
/// `R` bounds how many forwarded events a single call can produce; callers
/// should size it at least `K + 1` (a full capture buffer released, plus a
/// re-raised release event).
pub struct EngineOutcome<const R: usize> {
    pub response: EventResponse,
    pub forwarded: HVec<RawEvent, R>,
}

/// Const parameters: `P` max concurrent slots, `C` max candidates per slot
/// (== max combos sharing a key position), `K` max keys per combo (==
/// capture buffer depth), `N` keymap length, `R` max forwarded events per
/// call (see [`EngineOutcome`]).
pub struct Engine<'a, B, TM, const P: usize, const C: usize, const K: usize, const N: usize> {
    combos: &'a [ComboDef<'a, B>],
    table: ComboTable<C, N>,
    slots: [Slot<C, K>; P],
    timers: [TM; P],
    position_to_slot: [Option<u16>; N],
    pressed_key_to_slot: [Option<u16>; N],
    last_used_slot: Option<u16>,
    active: ActiveTable<P, K>,
}

impl<'a, B, TM, const P: usize, const C: usize, const K: usize, const N: usize>
    Engine<'a, B, TM, P, C, K, N>
where
    B: Copy,
    TM: Timer,
{
    /// Build the engine from its static combo table. `make_timer` constructs
    /// one timer handle per slot (slot index passed in, for host timer
    /// implementations that need to report back which slot fired).
    pub fn new(
        combos: &'a [ComboDef<'a, B>],
        mut make_timer: impl FnMut(usize) -> TM,
    ) -> Result<Self, ComboInitError> {
        for combo in combos {
            let len = combo.len();
            if !(2..=K).contains(&len) {
                return Err(ComboInitError::InvalidComboLength {
                    virtual_key_position: combo.virtual_key_position,
                    len,
                    max: K,
                });
            }
        }
        let table = ComboTable::build(combos)?;
        Ok(Self {
            combos,
            table,
            slots: core::array::from_fn(|_| Slot::default()),
            timers: core::array::from_fn(&mut make_timer),
            position_to_slot: [None; N],
            pressed_key_to_slot: [None; N],
            last_used_slot: None,
            active: ActiveTable::default(),
        })
    }

    pub fn handle_press<const R: usize>(
        &mut self,
        position: u16,
        timestamp: u64,
        layer: &impl LayerQuery,
        behavior: &mut impl BehaviorBinding<B>,
    ) -> EngineOutcome<R> {
        let mut out = HVec::new();
        let response = self.dispatch_press(position, timestamp, layer, behavior, &mut out);
        EngineOutcome { response, forwarded: out }
    }

    pub fn handle_release<const R: usize>(
        &mut self,
        position: u16,
        timestamp: u64,
        layer: &impl LayerQuery,
        behavior: &mut impl BehaviorBinding<B>,
    ) -> EngineOutcome<R> {
        let mut out = HVec::new();
        let response = self.dispatch_release(position, timestamp, layer, behavior, &mut out);
        EngineOutcome { response, forwarded: out }
    }

    /// Fire the per-slot timeout. `slot_idx` and `now` are supplied by the
    /// host's timer/dispatcher; a stale fire (timer cancelled or
    /// rescheduled since) is detected and ignored.
    pub fn handle_timeout<const R: usize>(
        &mut self,
        slot_idx: usize,
        now: u64,
        layer: &impl LayerQuery,
        behavior: &mut impl BehaviorBinding<B>,
    ) -> EngineOutcome<R> {
        let mut out = HVec::new();
        match self.slots[slot_idx].timeout_deadline {
            None => {}
            Some(deadline) if deadline > now => {}
            Some(fired_deadline) => {
                candidate::drop_timed_out(&mut self.slots[slot_idx].candidates, fired_deadline);
                if self.slots[slot_idx].candidates.len() < 2 {
                    self.cleanup(slot_idx, layer, behavior, &mut out);
                } else {
                    self.reschedule_timer(slot_idx, now);
                }
            }
        }
        EngineOutcome { response: EventResponse::PassThrough, forwarded: out }
    }

    // ---- read-only accessors for tests -------------------------------

    pub fn slot_candidates(&self, slot_idx: usize) -> &[Candidate] {
        &self.slots[slot_idx].candidates
    }

    pub fn position_claim(&self, position: u16) -> Option<u16> {
        self.position_to_slot[position as usize]
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    // ---- internal dispatch --------------------------------------------

    fn dispatch_press<const R: usize>(
        &mut self,
        position: u16,
        timestamp: u64,
        layer: &impl LayerQuery,
        behavior: &mut impl BehaviorBinding<B>,
        out: &mut HVec<RawEvent, R>,
    ) -> EventResponse {
        let slot_idx = match self.select_slot_for_press(position) {
            Some(s) => s,
            None => return EventResponse::PassThrough,
        };
        self.last_used_slot = Some(slot_idx as u16);

        let was_fresh = self.slots[slot_idx].is_empty();
        let captured = self.slots[slot_idx].capture(CapturedPress { position, timestamp });
        if captured {
            self.pressed_key_to_slot[position as usize] = Some(slot_idx as u16);

            if was_fresh {
                let layer_idx = layer.highest_active_layer();
                let lookup = self.table.for_position(position);
                self.slots[slot_idx].candidates =
                    candidate::establish(lookup, self.combos, layer_idx, timestamp);
            } else {
                candidate::drop_timed_out(&mut self.slots[slot_idx].candidates, timestamp);
                let lookup = self.table.for_position(position);
                candidate::intersect(&mut self.slots[slot_idx].candidates, lookup, self.combos);
            }
            self.refresh_claims(slot_idx);
        } else {
            log::error!("combo capture buffer overflow in slot {slot_idx} at position {position}");
            self.slots[slot_idx].candidates.clear();
            self.refresh_claims(slot_idx);
        }

        let candidates_len = self.slots[slot_idx].candidates.len();
        if candidates_len == 0 {
            self.cleanup(slot_idx, layer, behavior, out);
        } else {
            let head_combo_idx = self.slots[slot_idx].candidates[0].combo_idx;
            let head_len = self.combos[head_combo_idx as usize].len();
            if self.slots[slot_idx].is_fully_pressed(head_len) {
                self.slots[slot_idx].fully_pressed_combo = Some(head_combo_idx);
            }
            if candidates_len == 1 && self.slots[slot_idx].fully_pressed_combo.is_some() {
                self.cleanup(slot_idx, layer, behavior, out);
            } else {
                self.reschedule_timer(slot_idx, timestamp);
            }
        }
        EventResponse::Captured
    }

    fn dispatch_release<const R: usize>(
        &mut self,
        position: u16,
        timestamp: u64,
        layer: &impl LayerQuery,
        behavior: &mut impl BehaviorBinding<B>,
        out: &mut HVec<RawEvent, R>,
    ) -> EventResponse {
        let slot_idx = match self.pressed_key_to_slot[position as usize].take() {
            Some(s) => s as usize,
            None => {
                log::error!("release at position {position} had no recorded slot claim");
                return EventResponse::PassThrough;
            }
        };

        let release_count = self.cleanup(slot_idx, layer, behavior, out);

        if let Some((combo_idx, all_pressed, all_released, table_idx)) =
            self.active.release_position(position)
        {
            let combo = self.combos[combo_idx as usize];
            let should_release =
                (combo.slow_release && all_released) || (!combo.slow_release && all_pressed);
            if should_release {
                behavior.release(&combo.behavior, combo.virtual_key_position, timestamp);
            }
            if all_released {
                self.active.remove(table_idx);
            }
            return EventResponse::Handled;
        }

        if release_count > 1 {
            // Cleanup re-raised more than one buffered press, so later stages
            // need this release re-ordered behind them too.
            let _ = out.push(RawEvent::Release { position, timestamp });
            EventResponse::Handled
        } else {
            EventResponse::PassThrough
        }
    }

    /// Cancel the timer, clear candidates, activate a pending fully-pressed
    /// combo if any, then release residual captures. Returns how many
    /// captures were released this way (0 if the slot was already empty).
    fn cleanup<const R: usize>(
        &mut self,
        slot_idx: usize,
        layer: &impl LayerQuery,
        behavior: &mut impl BehaviorBinding<B>,
        out: &mut HVec<RawEvent, R>,
    ) -> usize {
        self.timers[slot_idx].cancel();
        self.slots[slot_idx].timeout_deadline = None;

        self.slots[slot_idx].candidates.clear();
        self.refresh_claims(slot_idx);

        if let Some(combo_idx) = self.slots[slot_idx].fully_pressed_combo.take() {
            let combo = self.combos[combo_idx as usize];
            let take_n = combo.len().min(self.slots[slot_idx].capture.len());

            let mut transferred: HVec<CapturedPress, K> = HVec::new();
            for i in 0..take_n {
                let _ = transferred.push(self.slots[slot_idx].capture[i]);
            }
            let remaining = self.slots[slot_idx].capture.len() - take_n;
            for i in 0..remaining {
                self.slots[slot_idx].capture[i] = self.slots[slot_idx].capture[i + take_n];
            }
            self.slots[slot_idx].capture.truncate(remaining);

            let press_ts = transferred.first().map(|p| p.timestamp).unwrap_or(0);
            if self.active.activate(combo_idx, &transferred) {
                behavior.press(&combo.behavior, combo.virtual_key_position, press_ts);
            } else {
                log::error!(
                    "active-combo table exhausted, combo at virtual position {} will not fire",
                    combo.virtual_key_position
                );
            }
        }

        let residual: HVec<CapturedPress, K> = core::mem::take(&mut self.slots[slot_idx].capture);
        let release_count = residual.len();
        for (i, press) in residual.iter().enumerate() {
            if i == 0 {
                let _ = out.push(press.as_press_event());
            } else {
                let resp = self.dispatch_press(press.position, press.timestamp, layer, behavior, out);
                if matches!(resp, EventResponse::PassThrough) {
                    let _ = out.push(press.as_press_event());
                }
            }
        }
        release_count
    }

    fn select_slot_for_press(&self, position: u16) -> Option<usize> {
        if let Some(slot) = self.position_to_slot[position as usize] {
            return Some(slot as usize);
        }
        if self.table.for_position(position).is_empty() {
            return self.last_used_slot.map(|s| s as usize);
        }
        for idx in 0..P {
            let used = self.position_to_slot.iter().any(|c| *c == Some(idx as u16));
            if !used {
                return Some(idx);
            }
        }
        log::error!("no free combo slot available for position {position}");
        None
    }

    fn refresh_claims(&mut self, slot_idx: usize) {
        for claim in self.position_to_slot.iter_mut() {
            if *claim == Some(slot_idx as u16) {
                *claim = None;
            }
        }
        for cand in self.slots[slot_idx].candidates.iter() {
            let combo = &self.combos[cand.combo_idx as usize];
            for &position in combo.key_positions {
                self.position_to_slot[position as usize] = Some(slot_idx as u16);
            }
        }
    }

    fn reschedule_timer(&mut self, slot_idx: usize, now: u64) {
        match candidate::min_deadline(&self.slots[slot_idx].candidates) {
            Some(deadline) => {
                self.slots[slot_idx].timeout_deadline = Some(deadline);
                self.timers[slot_idx].schedule(deadline.saturating_sub(now) as u32);
            }
            None => {
                self.slots[slot_idx].timeout_deadline = None;
                self.timers[slot_idx].cancel();
            }
        }
    }
}
