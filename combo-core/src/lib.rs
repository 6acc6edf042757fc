//! Fixed-capacity multi-key combo (chord) decision engine.
//!
//! This crate observes a stream of per-key press/release events and decides,
//! for each set of temporally-overlapping keys, whether the set matches a
//! configured combo that should fire a single behavior invocation, or
//! whether the keys should pass through as ordinary individual presses.
//!
//! Config loading, the behavior execution layer, the layer-state query and
//! the event bus transport are not implemented here — they are external
//! collaborators reached through the traits in [`traits`]. This crate only
//! makes the capture/candidate/timeout decision and reports what the caller
//! should do about it.

pub mod active;
pub mod candidate;
pub mod config;
pub mod engine;
pub mod event;
pub mod slot;
pub mod traits;

pub use active::ActiveCombo;
pub use candidate::Candidate;
pub use config::{ComboDef, ComboInitError, ComboTable, Layers};
pub use engine::{Engine, EngineOutcome};
pub use event::{EventResponse, RawEvent};
pub use slot::Slot;
pub use traits::{BehaviorBinding, LayerQuery, Timer};
