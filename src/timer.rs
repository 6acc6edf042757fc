//! Per-slot timeout timer, backed by a single background thread shared by
//! every slot. Mirrors the sleep-and-poll background thread kanata itself
//! runs for its own timing-sensitive loops, but with an mpsc channel
//! instead of kanata's direct-drive loop, since here the timer and the
//! single-threaded engine dispatcher are different tasks.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use combo_core::Timer;

use crate::clock::Clock;

enum TimerCmd {
    Schedule { slot: usize, delay_ms: u64 },
    Cancel { slot: usize },
}

/// A `combo_core::Timer` implementation for one engine slot. All instances
/// sharing a `TimerHub` talk to the same background thread.
pub struct ChannelTimer {
    slot: usize,
    pending: bool,
    cmd_tx: Sender<TimerCmd>,
}

impl Timer for ChannelTimer {
    fn schedule(&mut self, delay_ms: u32) {
        self.pending = true;
        let _ = self.cmd_tx.send(TimerCmd::Schedule {
            slot: self.slot,
            delay_ms: delay_ms as u64,
        });
    }

    fn cancel(&mut self) -> bool {
        let was_pending = self.pending;
        self.pending = false;
        let _ = self.cmd_tx.send(TimerCmd::Cancel { slot: self.slot });
        was_pending
    }

    fn busy_get(&self) -> bool {
        self.pending
    }
}

/// Owns the background thread and hands out one [`ChannelTimer`] per slot.
/// Fired slots arrive on [`TimerHub::poll_fired`] as `(slot, now_ms)` pairs
/// for the dispatcher to feed into `Engine::handle_timeout`.
pub struct TimerHub {
    cmd_tx: Sender<TimerCmd>,
    fired_rx: Receiver<(usize, u64)>,
}

impl TimerHub {
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<TimerCmd>();
        let (fired_tx, fired_rx) = mpsc::channel::<(usize, u64)>();

        thread::spawn(move || {
            let clock = Clock::default();
            let mut deadlines: HashMap<usize, u64> = HashMap::new();
            loop {
                while let Ok(cmd) = cmd_rx.try_recv() {
                    match cmd {
                        TimerCmd::Schedule { slot, delay_ms } => {
                            deadlines.insert(slot, clock.now_ms() + delay_ms);
                        }
                        TimerCmd::Cancel { slot } => {
                            deadlines.remove(&slot);
                        }
                    }
                }
                let now = clock.now_ms();
                let fired: Vec<usize> = deadlines
                    .iter()
                    .filter(|(_, deadline)| **deadline <= now)
                    .map(|(slot, _)| *slot)
                    .collect();
                for slot in fired {
                    deadlines.remove(&slot);
                    if fired_tx.send((slot, now)).is_err() {
                        return;
                    }
                }
                thread::sleep(Duration::from_millis(1));
            }
        });

        Self { cmd_tx, fired_rx }
    }

    pub fn timer_for(&self, slot: usize) -> ChannelTimer {
        ChannelTimer { slot, pending: false, cmd_tx: self.cmd_tx.clone() }
    }

    /// Drain any slots whose timeout has fired since the last poll.
    pub fn poll_fired(&self) -> Vec<(usize, u64)> {
        self.fired_rx.try_iter().collect()
    }
}
