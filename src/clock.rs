//! A monotonic millisecond clock anchored at process start, the timestamp
//! unit the combo engine expects everywhere.

use web_time::Instant;

pub struct Clock {
    start: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock {
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
