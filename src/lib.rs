//! `combod`: a minimal host around [`combo_core::Engine`].
//!
//! This crate is a reference collaborator for the engine's external seams: it
//! wires a real position-state-changed source (here, a scripted or
//! replayed sequence) to the engine, supplies a [`clock::Clock`] and
//! per-slot [`timer::Timer`] implementation, and prints the resulting
//! behavior press/release trace. Declarative combo-table loading, the real
//! behavior-execution layer and the real event bus are intentionally not
//! reimplemented here — see `sim::demo_combos` for the small illustrative
//! table this binary ships with.

pub mod clock;
pub mod sim;
pub mod timer;

pub use clock::Clock;
pub use timer::{ChannelTimer, TimerHub};
