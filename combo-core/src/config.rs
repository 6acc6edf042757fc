//! Static combo configuration and the position -> combos lookup table.

use heapless::Vec as HVec;
use thiserror::Error;

/// A combo's layer scope: either every layer, or an explicit allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layers<'a> {
    All,
    OneOf(&'a [u16]),
}

impl<'a> Layers<'a> {
    pub fn active_on(&self, layer: u16) -> bool {
        match self {
            Layers::All => true,
            Layers::OneOf(layers) => layers.contains(&layer),
        }
    }
}

/// An immutable combo definition, as configured at init time.
///
/// `behavior` is an opaque handle to the target behavior binding; this
/// crate never interprets it, it only hands it back to the
/// [`crate::traits::BehaviorBinding`] collaborator on fire/release.
#[derive(Debug, Clone, Copy)]
pub struct ComboDef<'a, B> {
    /// Key positions that make up this combo, length 2..=K_MAX.
    pub key_positions: &'a [u16],
    pub behavior: B,
    pub timeout_ms: u32,
    /// Delay release of the behavior until the last held key releases,
    /// rather than the first.
    pub slow_release: bool,
    /// Stable identifier outside the physical keymap range, used by
    /// downstream behaviors (e.g. hold-taps) to disambiguate this combo.
    pub virtual_key_position: u16,
    pub layers: Layers<'a>,
}

impl<'a, B> ComboDef<'a, B> {
    pub(crate) fn len(&self) -> usize {
        self.key_positions.len()
    }

    /// Sort key used everywhere candidate lists and lookup tables are
    /// ordered: `(key_position_len asc, virtual_key_position asc)`.
    fn sort_key(&self) -> (usize, u16) {
        (self.len(), self.virtual_key_position)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComboInitError {
    #[error("combo key position {position} does not exist (keymap length {keymap_len})")]
    UnknownPosition { position: u16, keymap_len: u16 },
    #[error("too many combos configured on key position {position} (max {max} per key)")]
    TooManyCombosOnKey { position: u16, max: usize },
    #[error(
        "combo at virtual position {virtual_key_position} has {len} key positions (must be 2..={max})"
    )]
    InvalidComboLength {
        virtual_key_position: u16,
        len: usize,
        max: usize,
    },
}

/// `combo_lookup[pos]`: for each physical key position, the indices (into
/// the combo slice the table was built from) of combos that include that
/// position, sorted by `(length asc, virtual_key_position asc)`.
pub struct ComboTable<const C: usize, const N: usize> {
    lookup: [HVec<u16, C>; N],
}

impl<const C: usize, const N: usize> ComboTable<C, N> {
    /// Build the lookup table by inserting every combo into every position
    /// it lists, with an in-place sorted insert: scan forward, and when the
    /// slot's combo sorts after the new one, displace it and keep carrying
    /// the displaced combo along until it finds a free slot.
    pub fn build<B>(combos: &[ComboDef<'_, B>]) -> Result<Self, ComboInitError> {
        let mut lookup: [HVec<u16, C>; N] = core::array::from_fn(|_| HVec::new());

        for (combo_idx, combo) in combos.iter().enumerate() {
            for &position in combo.key_positions {
                if position as usize >= N {
                    return Err(ComboInitError::UnknownPosition {
                        position,
                        keymap_len: N as u16,
                    });
                }
                Self::insert_one(&mut lookup[position as usize], combos, combo_idx as u16, position)?;
            }
        }

        Ok(Self { lookup })
    }

    fn insert_one<B>(
        slot_list: &mut HVec<u16, C>,
        combos: &[ComboDef<'_, B>],
        mut insert_idx: u16,
        position: u16,
    ) -> Result<(), ComboInitError> {
        let mut cursor = 0;
        loop {
            if cursor == slot_list.len() {
                slot_list.push(insert_idx).map_err(|_| ComboInitError::TooManyCombosOnKey {
                    position,
                    max: C,
                })?;
                return Ok(());
            }
            let resident_idx = slot_list[cursor];
            if combos[resident_idx as usize].sort_key() >= combos[insert_idx as usize].sort_key() {
                // displace: put the new combo here, keep carrying the
                // displaced one forward.
                slot_list[cursor] = insert_idx;
                insert_idx = resident_idx;
            }
            cursor += 1;
        }
    }

    /// The sorted combo indices that include `position`, or an empty slice
    /// if `position` is not part of any combo (or out of range).
    pub fn for_position(&self, position: u16) -> &[u16] {
        self.lookup
            .get(position as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
