//! Per-slot candidate list: combos that remain possible given the presses
//! observed so far in a slot.

use heapless::Vec as HVec;

use crate::config::ComboDef;

/// A combo that is still a possible match, with the absolute deadline (an
/// uptime in monotonic milliseconds) after which it can no longer complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub combo_idx: u16,
    pub deadline: u64,
}

/// Candidate establishment on the first press into an empty slot. `lookup`
/// is `combo_lookup[position]`, already sorted by `(length,
/// virtual_key_position)`.
pub fn establish<B, const C: usize>(
    lookup: &[u16],
    combos: &[ComboDef<'_, B>],
    layer: u16,
    now: u64,
) -> HVec<Candidate, C> {
    let mut candidates = HVec::new();
    for &combo_idx in lookup {
        let combo = &combos[combo_idx as usize];
        if combo.layers.active_on(layer) {
            // `lookup` was built with capacity C, so this can never overflow.
            let _ = candidates.push(Candidate {
                combo_idx,
                deadline: now + combo.timeout_ms as u64,
            });
        }
    }
    candidates
}

/// Drop candidates whose deadline has already passed, rewriting the list
/// contiguous.
pub fn drop_timed_out<const C: usize>(candidates: &mut HVec<Candidate, C>, now: u64) {
    let mut write = 0;
    for read in 0..candidates.len() {
        if candidates[read].deadline > now {
            candidates[write] = candidates[read];
            write += 1;
        }
    }
    candidates.truncate(write);
}

/// Intersect the surviving candidates with `combo_lookup[p]`. Both lists
/// are sorted by `(length, virtual_key_position)`; this is the classic
/// merge-intersect: advance whichever side is lexicographically smaller,
/// keep a candidate only on an exact `virtual_key_position` match.
pub fn intersect<B, const C: usize>(
    candidates: &mut HVec<Candidate, C>,
    lookup: &[u16],
    combos: &[ComboDef<'_, B>],
) {
    let mut matches = 0usize;
    let mut lookup_idx = 0usize;
    let mut candidate_idx = 0usize;
    while lookup_idx < lookup.len() && candidate_idx < candidates.len() {
        let cand_combo = &combos[candidates[candidate_idx].combo_idx as usize];
        let look_combo = &combos[lookup[lookup_idx] as usize];
        if cand_combo.virtual_key_position == look_combo.virtual_key_position {
            candidates[matches] = candidates[candidate_idx];
            matches += 1;
            candidate_idx += 1;
            lookup_idx += 1;
        } else if cand_combo.len() > look_combo.len() {
            lookup_idx += 1;
        } else if cand_combo.len() < look_combo.len() {
            candidate_idx += 1;
        } else if cand_combo.virtual_key_position > look_combo.virtual_key_position {
            lookup_idx += 1;
        } else {
            candidate_idx += 1;
        }
    }
    candidates.truncate(matches);
}

/// The scheduled timeout for a slot equals the minimum deadline over its
/// candidates, or "none" if the list is empty.
pub fn min_deadline<const C: usize>(candidates: &HVec<Candidate, C>) -> Option<u64> {
    candidates.iter().map(|c| c.deadline).min()
}
