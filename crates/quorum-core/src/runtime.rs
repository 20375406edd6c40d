use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::executor::LocalPool;
use web_time::Instant;

use crate::clock;
use crate::executor::Spawner;
use crate::scope::Scope;

thread_local! {
    pub static COMPOSER: RefCell<Composer> = RefCell::new(Composer::default());
}

#[derive(Default)]
pub struct Composer {
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

/// Key-based remember. `init` runs with no borrow held, so it may itself
/// remember.
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let existing = COMPOSER.with(|c| {
        let c = c.borrow();
        let slot = c.keyed_slots.get(&key)?;
        let rc = slot.downcast_ref::<Rc<T>>();
        if rc.is_none() {
            log::warn!(
                "remember_with_key: key '{}' reused with a different type; replacing.",
                key
            );
        }
        rc.cloned()
    });
    if let Some(rc) = existing {
        return rc;
    }

    let rc: Rc<T> = Rc::new(init());
    COMPOSER.with(|c| {
        c.borrow_mut().keyed_slots.insert(key, Box::new(rc.clone()));
    });
    rc
}

/// Drives composition passes, local tasks and timers on one thread.
///
/// A host loop looks like:
///
/// ```rust,no_run
/// use quorum_core::Scheduler;
///
/// let mut s = Scheduler::new();
/// s.compose(|_s| { /* build the screen, call use_fetch, ... */ });
/// loop {
///     if s.pump() {
///         s.compose(|_s| { /* re-read fetched state */ });
///     }
///     if s.is_idle() {
///         break;
///     }
/// }
/// ```
pub struct Scheduler {
    pool: LocalPool,
    spawner: Spawner,
    root: Scope,
}

impl Scheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = Spawner::new(pool.spawner());
        Self {
            pool,
            spawner,
            root: Scope::new(),
        }
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    /// Runs one composition pass inside the root scope.
    pub fn compose<R>(&mut self, build: impl FnOnce(&mut Scheduler) -> R) -> R {
        let root = self.root.clone();
        root.run(|| build(self))
    }

    /// Fires due timers and runs ready tasks until both are exhausted.
    /// Returns true if observable state changed since the last pump.
    pub fn pump(&mut self) -> bool {
        loop {
            self.pool.run_until_stalled();
            let due = self.spawner.timers().borrow_mut().take_due(clock::now());
            if due.is_empty() {
                break;
            }
            for f in due {
                f();
            }
        }
        self.spawner.take_frame_request()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.spawner.timers().borrow().next_deadline()
    }

    /// True when no timers are scheduled. Tasks blocked on external events
    /// are not counted.
    pub fn is_idle(&self) -> bool {
        self.spawner.timers().borrow().is_empty()
    }

    /// Tears down every orchestrator and effect registered in the root scope
    /// and forgets remembered slots.
    pub fn dispose(&mut self) {
        let root = std::mem::take(&mut self.root);
        root.dispose();
        COMPOSER.with(|c| c.borrow_mut().keyed_slots.clear());
        self.pool.run_until_stalled();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
