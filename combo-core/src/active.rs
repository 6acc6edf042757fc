//! The active-combo table: combos that have fired and still own some held
//! keys.

use heapless::Vec as HVec;

use crate::slot::CapturedPress;

/// A fired combo plus the K_MAX-wide array of captured press events that
/// represent its still-held keys. Entries are nulled as each key releases.
pub struct ActiveCombo<const K: usize> {
    pub combo_idx: u16,
    held: [Option<CapturedPress>; K],
    len: usize,
}

impl<const K: usize> ActiveCombo<K> {
    fn new(combo_idx: u16, captured: &[CapturedPress]) -> Self {
        let mut held: [Option<CapturedPress>; K] = [None; K];
        for (slot, press) in held.iter_mut().zip(captured.iter()) {
            *slot = Some(*press);
        }
        Self {
            combo_idx,
            held,
            len: captured.len(),
        }
    }

    /// Free the held event at `position`, if this combo has one. Returns
    /// `Some((all_keys_pressed, all_keys_released))` if a key was released
    /// here, `None` if this combo never held `position`.
    fn release_position(&mut self, position: u16) -> Option<(bool, bool)> {
        let mut key_released = false;
        let mut all_pressed = true;
        let mut all_released = true;
        for entry in self.held[..self.len].iter_mut() {
            match entry {
                Some(press) if press.position == position => {
                    *entry = None;
                    key_released = true;
                }
                Some(_) => all_released = false,
                None => all_pressed = false,
            }
        }
        key_released.then_some((all_pressed, all_released))
    }
}

// `[Option<CapturedPress>; K]` needs `Copy` for the `[None; K]` literal
// above; derive it manually since `CapturedPress` is already `Copy`.
impl<const K: usize> Clone for ActiveCombo<K> {
    fn clone(&self) -> Self {
        Self {
            combo_idx: self.combo_idx,
            held: self.held,
            len: self.len,
        }
    }
}
impl<const K: usize> Copy for ActiveCombo<K> {}

/// The active-combo table. Kept contiguous from index 0 (invariant 5).
pub struct ActiveTable<const P: usize, const K: usize> {
    combos: HVec<ActiveCombo<K>, P>,
}

impl<const P: usize, const K: usize> Default for ActiveTable<P, K> {
    fn default() -> Self {
        Self { combos: HVec::new() }
    }
}

impl<const P: usize, const K: usize> ActiveTable<P, K> {
    /// Store a newly fired combo. Returns `false` if there is no free entry
    /// (the active-combo table is exhausted).
    pub fn activate(&mut self, combo_idx: u16, captured: &[CapturedPress]) -> bool {
        self.combos.push(ActiveCombo::new(combo_idx, captured)).is_ok()
    }

    /// Release the held key at `position` in whichever active combo holds
    /// it. Returns `(combo_idx, all_keys_pressed, all_keys_released,
    /// table_index)` if one did.
    pub fn release_position(&mut self, position: u16) -> Option<(u16, bool, bool, usize)> {
        for (idx, combo) in self.combos.iter_mut().enumerate() {
            if let Some((all_pressed, all_released)) = combo.release_position(position) {
                return Some((combo.combo_idx, all_pressed, all_released, idx));
            }
        }
        None
    }

    /// Delete the active-combo entry by swapping the last contiguous entry
    /// into its slot, preserving invariant 5.
    pub fn remove(&mut self, idx: usize) {
        let last = self.combos.len() - 1;
        if idx != last {
            self.combos[idx] = self.combos[last];
        }
        self.combos.truncate(last);
    }

    pub fn len(&self) -> usize {
        self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }
}
