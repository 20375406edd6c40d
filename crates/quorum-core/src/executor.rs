//! Local task and timer plumbing shared by everything a `Scheduler` drives.
//!
//! Tasks are `!Send` futures polled on the scheduler's thread; timers are
//! plain callbacks keyed by deadline on the thread's `Clock`. Nothing here
//! blocks: `Scheduler::pump` fires due timers and runs tasks until they stall.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::executor::LocalSpawner;
use futures::task::{LocalSpawnExt, SpawnError};
use web_time::Duration;

use crate::clock;
use crate::timer::{TimerHandle, TimerQueue};

#[derive(Clone)]
pub struct Spawner {
    tasks: LocalSpawner,
    timers: Rc<RefCell<TimerQueue>>,
    frame_requested: Rc<Cell<bool>>,
}

impl Spawner {
    pub(crate) fn new(tasks: LocalSpawner) -> Self {
        Self {
            tasks,
            timers: Rc::new(RefCell::new(TimerQueue::default())),
            frame_requested: Rc::new(Cell::new(false)),
        }
    }

    pub fn spawn(&self, fut: impl Future<Output = ()> + 'static) -> Result<(), SpawnError> {
        self.tasks.spawn_local(fut)
    }

    /// Runs `f` once `delay` has elapsed on the thread clock.
    pub fn schedule(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerHandle {
        let key = self
            .timers
            .borrow_mut()
            .schedule(clock::now() + delay, f);
        TimerHandle::new(key, Rc::downgrade(&self.timers))
    }

    pub fn sleep(&self, delay: Duration) -> Sleep {
        let state = Rc::new(RefCell::new(SleepState::default()));
        let timer = {
            let state = state.clone();
            self.schedule(delay, move || {
                let mut s = state.borrow_mut();
                s.elapsed = true;
                if let Some(w) = s.waker.take() {
                    w.wake();
                }
            })
        };
        Sleep { state, timer }
    }

    /// Marks observable state as changed so the host composes another frame.
    pub fn request_frame(&self) {
        self.frame_requested.set(true);
    }

    pub(crate) fn take_frame_request(&self) -> bool {
        self.frame_requested.replace(false)
    }

    pub(crate) fn timers(&self) -> &Rc<RefCell<TimerQueue>> {
        &self.timers
    }
}

#[derive(Default)]
struct SleepState {
    elapsed: bool,
    waker: Option<Waker>,
}

/// Future returned by `Spawner::sleep`. Dropping it cancels the timer.
pub struct Sleep {
    state: Rc<RefCell<SleepState>>,
    timer: TimerHandle,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut s = self.state.borrow_mut();
        if s.elapsed {
            Poll::Ready(())
        } else {
            s.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}
