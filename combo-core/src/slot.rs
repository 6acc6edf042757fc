//! A slot: one independent work-area for an in-flight combo attempt.

use heapless::Vec as HVec;

use crate::candidate::Candidate;
use crate::event::RawEvent;

/// A captured raw press event, held in a slot's capture buffer until it is
/// released, re-raised, or transferred into an active combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedPress {
    pub position: u16,
    pub timestamp: u64,
}

impl CapturedPress {
    pub fn from_press(event: RawEvent) -> Option<Self> {
        match event {
            RawEvent::Press { position, timestamp } => Some(Self { position, timestamp }),
            RawEvent::Release { .. } => None,
        }
    }

    pub fn as_press_event(&self) -> RawEvent {
        RawEvent::Press {
            position: self.position,
            timestamp: self.timestamp,
        }
    }
}

/// One slot: a shrinking candidate list plus the capture buffer of raw
/// presses it has swallowed while the candidates are narrowed down.
pub struct Slot<const C: usize, const K: usize> {
    pub candidates: HVec<Candidate, C>,
    pub capture: HVec<CapturedPress, K>,
    /// The combo that is fully pressed and will fire on cleanup, if any.
    pub fully_pressed_combo: Option<u16>,
    /// Scheduled timeout deadline for this slot; `None` if no timer is
    /// pending.
    pub timeout_deadline: Option<u64>,
}

impl<const C: usize, const K: usize> Default for Slot<C, K> {
    fn default() -> Self {
        Self {
            candidates: HVec::new(),
            capture: HVec::new(),
            fully_pressed_combo: None,
            timeout_deadline: None,
        }
    }
}

impl<const C: usize, const K: usize> Slot<C, K> {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.capture.is_empty() && self.fully_pressed_combo.is_none()
    }

    /// A combo is fully pressed when every key position it needs has a
    /// captured event. The capture buffer is always held contiguous from
    /// index 0, so the count of captured presses alone determines whether
    /// a combo of a given length is complete.
    pub fn is_fully_pressed(&self, combo_len: usize) -> bool {
        self.capture.len() >= combo_len
    }

    /// Push a newly captured press. Returns `false` (capture overflow) if
    /// the buffer is already at capacity `K`. Combo key counts are bounded
    /// by `K` at init time, but filler keys reusing the last-touched slot
    /// are not, so a long run of interleaved filler presses can still fill
    /// the buffer; handled defensively rather than panicking.
    pub fn capture(&mut self, press: CapturedPress) -> bool {
        self.capture.push(press).is_ok()
    }
}
