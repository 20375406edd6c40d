use std::cell::RefCell;
use std::rc::Weak;

use slotmap::{SlotMap, new_key_type};
use web_time::Instant;

new_key_type! {
    pub struct TimerKey;
}

struct Timer {
    deadline: Instant,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

/// Deadline-ordered one-shot callbacks, fired by `Scheduler::pump`.
#[derive(Default)]
pub struct TimerQueue {
    timers: SlotMap<TimerKey, Timer>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn schedule(&mut self, deadline: Instant, callback: impl FnOnce() + 'static) -> TimerKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert(Timer {
            deadline,
            seq,
            callback: Box::new(callback),
        })
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.timers.remove(key).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Removes every timer due at `now`, earliest first (ties in scheduling order).
    pub fn take_due(&mut self, now: Instant) -> Vec<Box<dyn FnOnce()>> {
        let mut due: Vec<(Instant, u64, TimerKey)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .map(|(k, t)| (t.deadline, t.seq, k))
            .collect();
        due.sort_by_key(|(deadline, seq, _)| (*deadline, *seq));
        due.into_iter()
            .filter_map(|(_, _, k)| self.timers.remove(k))
            .map(|t| t.callback)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Cancels a scheduled callback. Holding the handle does not keep the queue alive.
#[derive(Clone)]
pub struct TimerHandle {
    key: TimerKey,
    queue: Weak<RefCell<TimerQueue>>,
}

impl TimerHandle {
    pub(crate) fn new(key: TimerKey, queue: Weak<RefCell<TimerQueue>>) -> Self {
        Self { key, queue }
    }

    pub fn cancel(&self) -> bool {
        match self.queue.upgrade() {
            Some(q) => q.borrow_mut().cancel(self.key),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.queue
            .upgrade()
            .is_some_and(|q| q.borrow().timers.contains_key(self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use web_time::Duration;

    #[test]
    fn due_timers_fire_in_deadline_order() {
        let t0 = Instant::now();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut q = TimerQueue::default();
        for (name, ms) in [("late", 30u64), ("early", 10), ("tie", 10)] {
            let fired = fired.clone();
            q.schedule(t0 + Duration::from_millis(ms), move || {
                fired.borrow_mut().push(name)
            });
        }

        for f in q.take_due(t0 + Duration::from_millis(10)) {
            f();
        }
        assert_eq!(*fired.borrow(), vec!["early", "tie"]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(t0 + Duration::from_millis(30)));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let t0 = Instant::now();
        let q = Rc::new(RefCell::new(TimerQueue::default()));
        let key = q.borrow_mut().schedule(t0, || panic!("cancelled timer fired"));
        let handle = TimerHandle::new(key, Rc::downgrade(&q));

        assert!(handle.is_pending());
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(q.borrow_mut().take_due(t0).is_empty());
    }
}
