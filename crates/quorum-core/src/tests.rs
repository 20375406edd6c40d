#[cfg(test)]
mod tests {
    use crate::COMPOSER;
    use crate::clock::ManualClock;
    use crate::effects::Dispose;
    use crate::effects_ext::KeyedEffect;
    use crate::clock::{self, reset_clock};
    use crate::remember_with_key;
    use crate::runtime::Scheduler;
    use crate::scope::*;
    use crate::signal::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use web_time::Duration;

    #[test]
    fn test_signal_basic() {
        let sig = signal(42);
        assert_eq!(sig.get(), 42);

        sig.set(100);
        assert_eq!(sig.get(), 100);

        sig.update(|v| *v += 1);
        assert_eq!(sig.get(), 101);
        assert_eq!(sig.version(), 2);
    }

    #[test]
    fn test_signal_subscription() {
        let sig = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let id = {
            let seen = seen.clone();
            let sig2 = sig.clone();
            // subscribers may read the signal they observe
            sig.subscribe(move |v| seen.borrow_mut().push((*v, sig2.get())))
        };

        sig.set(42);
        assert!(sig.unsubscribe(id));
        sig.set(43);
        assert_eq!(*seen.borrow(), vec![(42, 42)]);
    }

    #[test]
    fn test_scope_drop_runs_disposers() {
        let cleaned_up = Rc::new(Cell::new(false));
        {
            let scope = Scope::new();
            let flag = cleaned_up.clone();
            scope.add_disposer(move || flag.set(true));
            assert!(!cleaned_up.get());
        }
        assert!(cleaned_up.get());
    }

    #[test]
    fn test_current_scope_inside_run() {
        let scope = Scope::new();
        assert!(current_scope().is_none());
        scope.run(|| assert!(current_scope().is_some()));
        assert!(current_scope().is_none());
    }

    #[test]
    fn test_key_based_remember() {
        COMPOSER.with(|c| c.borrow_mut().keyed_slots.clear());

        let val1 = remember_with_key("test", || 42);
        let val2 = remember_with_key("test", || 100);

        // Should return the same instance
        assert_eq!(*val1, 42);
        assert_eq!(*val2, 42); // Not 100, because key exists
    }

    #[test]
    fn test_nested_remember_in_init() {
        COMPOSER.with(|c| c.borrow_mut().keyed_slots.clear());

        let outer = remember_with_key("outer", || *remember_with_key("inner", || 7) + 1);
        assert_eq!(*outer, 8);
    }

    #[test]
    fn test_keyed_effect_cleans_up_before_rerun() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut fx = KeyedEffect::new();

        for key in [1, 1, 2] {
            let log = log.clone();
            fx.run_if_changed(key, move || {
                log.borrow_mut().push(format!("start {key}"));
                Dispose::new(move || log.borrow_mut().push(format!("stop {key}")))
            });
        }
        fx.dispose();

        assert_eq!(*log.borrow(), vec!["start 1", "stop 1", "start 2", "stop 2"]);
        assert_eq!(fx.key(), Some(&2));
    }

    #[test]
    fn test_scheduler_fires_timers_on_clock() {
        let clock = ManualClock::new().install();
        let mut s = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        {
            let fired = fired.clone();
            s.spawner()
                .schedule(Duration::from_millis(500), move || fired.set(true));
        }

        s.pump();
        assert!(!fired.get());
        assert!(!s.is_idle());

        clock.advance(Duration::from_millis(499));
        s.pump();
        assert!(!fired.get());

        clock.advance(Duration::from_millis(1));
        s.pump();
        assert!(fired.get());
        assert!(s.is_idle());
    }

    #[test]
    fn test_sleep_wakes_task() {
        let clock = ManualClock::new().install();
        let mut s = Scheduler::new();
        let done = Rc::new(Cell::new(false));
        {
            let done = done.clone();
            let sleep = s.spawner().sleep(Duration::from_millis(100));
            s.spawner()
                .spawn(async move {
                    sleep.await;
                    done.set(true);
                })
                .unwrap();
        }

        s.pump();
        assert!(!done.get());
        assert!(s.next_deadline().is_some());

        clock.advance(Duration::from_millis(100));
        s.pump();
        assert!(done.get());
    }

    #[test]
    fn test_dropped_sleep_cancels_timer() {
        let _clock = ManualClock::new().install();
        let s = Scheduler::new();
        let sleep = s.spawner().sleep(Duration::from_secs(1));
        assert!(!s.is_idle());
        drop(sleep);
        assert!(s.is_idle());
    }

    #[test]
    fn test_reset_clock_restores_system_time() {
        let clock = ManualClock::new().install();
        clock.advance(Duration::from_secs(3600));
        assert!(clock::now() > web_time::Instant::now());
        reset_clock();
        assert!(clock::now() <= web_time::Instant::now());
    }
}
