use std::cell::{Cell, RefCell};
use std::rc::Rc;

use web_time::{Duration, Instant};

/// Time source for timers and delayed fetches.
pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

thread_local! {
    static CLOCK: RefCell<Option<Rc<dyn Clock>>> = const { RefCell::new(None) };
}

/// Install the clock for the current thread. Hosts normally leave the default
/// `SystemClock`; tests install a `ManualClock`.
pub fn set_clock(clock: impl Clock) {
    CLOCK.with(|c| *c.borrow_mut() = Some(Rc::new(clock)));
}

/// Restore the default system clock for the current thread.
pub fn reset_clock() {
    CLOCK.with(|c| *c.borrow_mut() = None);
}

pub fn now() -> Instant {
    let clock = CLOCK.with(|c| c.borrow().clone());
    clock.map(|c| c.now()).unwrap_or_else(Instant::now)
}

/// A clock you can drive deterministically. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    t: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(t: Instant) -> Self {
        Self {
            t: Rc::new(Cell::new(t)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.t.set(self.t.get() + by);
    }

    /// Installs a clone of this clock for the current thread and returns self.
    pub fn install(self) -> Self {
        set_clock(self.clone());
        self
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}
