//! Seams to the external collaborators this crate never implements itself:
//! the behavior-execution layer, the layer-state query, and the per-slot
//! timeout timer. The upstream event bus is not modeled as a trait here —
//! the engine's public entry points already return everything a bus adapter
//! needs (see [`crate::event::EventResponse`] and [`crate::engine`]).

/// The downstream behavior-binding layer. `B` is the opaque per-combo
/// handle stored in [`crate::config::ComboDef`]; this crate never
/// interprets it, only threads it through to `press`/`release`.
pub trait BehaviorBinding<B> {
    fn press(&mut self, binding: &B, virtual_position: u16, timestamp: u64);
    fn release(&mut self, binding: &B, virtual_position: u16, timestamp: u64);
}

/// The layer-state query: which layer a combo's layer list is checked
/// against.
pub trait LayerQuery {
    fn highest_active_layer(&self) -> u16;
}

/// A single per-slot delayable task. The engine owns one per slot and
/// (re)schedules it to the earliest candidate deadline whenever a slot's
/// candidate list changes.
pub trait Timer {
    /// Schedule this timer to fire `delay_ms` from now, replacing any
    /// previously scheduled fire time.
    fn schedule(&mut self, delay_ms: u32);
    /// Cancel a pending fire. Returns whether one was actually pending.
    /// Idempotent: cancelling an already-idle timer returns `false`.
    fn cancel(&mut self) -> bool;
    /// True iff this timer is currently scheduled (whether or not it has
    /// already fired and is awaiting acknowledgement).
    fn busy_get(&self) -> bool;
}
