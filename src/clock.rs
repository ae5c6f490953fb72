use std::time::Duration;

/// Sleep abstraction so engine timing can be exercised in tests without
/// real delays.
pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
