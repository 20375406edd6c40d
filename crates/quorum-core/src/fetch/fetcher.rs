use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use web_time::Duration;

use super::{CancelHandle, FetchConfig, FetchError, FetchPhase, FetchState, PayloadPath};
use crate::effects_ext::KeyedEffect;
use crate::executor::Spawner;
use crate::memo::StableCallback;
use crate::signal::{Signal, SubId};
use crate::Dispose;

pub type ProducerFuture = LocalBoxFuture<'static, Result<Value, FetchError>>;
type ProducerFn = Rc<dyn Fn(CancelHandle) -> ProducerFuture>;

/// Reactive inputs; any change starts a new cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CycleKey {
    producer: u64,
    gate: bool,
    trigger: u64,
}

struct Inner<T: 'static> {
    payload_path: Option<PayloadPath>,
    start_delay: Option<Duration>,
    skip_initial_fetch: bool,
    spawner: Spawner,
    state: Signal<FetchState<T>>,
    phase: FetchPhase,
    producer: Option<(u64, ProducerFn)>,
    gate: bool,
    trigger: u64,
    evaluated_once: bool,
    effect: KeyedEffect<CycleKey>,
    next_cycle: u64,
    active: Option<u64>,
    reconciling: bool,
    rerun: bool,
    disposed: bool,
}

impl<T: 'static> Drop for Inner<T> {
    fn drop(&mut self) {
        self.effect.dispose();
    }
}

/// Drives one producer through trigger, optional delay, flight and settlement.
///
/// Only the most recently started cycle may write `FetchState`: starting a
/// cycle runs the previous cycle's cleanup, which signals its `CancelHandle`
/// and clears its delay timer, and a settlement is applied only if its cycle
/// is still the active one and was never cancelled.
///
/// All transitions are plain method calls (`evaluate`, `set_gate`, `refresh`,
/// `dispose`); producers and delay timers run on the `Spawner` the fetcher
/// was created with.
pub struct Fetcher<T: 'static> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T: 'static> Clone for Fetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct WeakFetcher<T: 'static> {
    inner: Weak<RefCell<Inner<T>>>,
}

impl<T: 'static> Clone for WeakFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> WeakFetcher<T> {
    pub fn upgrade(&self) -> Option<Fetcher<T>> {
        self.inner.upgrade().map(|inner| Fetcher { inner })
    }
}

struct Launch {
    id: u64,
    cancel: CancelHandle,
}

impl<T> Fetcher<T>
where
    T: DeserializeOwned + Default + Clone + 'static,
{
    pub fn new(spawner: &Spawner, config: FetchConfig<T>) -> Self {
        let FetchConfig {
            gate,
            payload_path,
            start_delay,
            skip_initial_fetch,
            initial_value,
        } = config;
        let initial = FetchState::initial(
            initial_value.unwrap_or_default(),
            gate && !skip_initial_fetch,
        );
        Self {
            inner: Rc::new(RefCell::new(Inner {
                payload_path,
                start_delay,
                skip_initial_fetch,
                spawner: spawner.clone(),
                state: Signal::new(initial),
                phase: FetchPhase::Idle,
                producer: None,
                gate,
                trigger: 0,
                evaluated_once: false,
                effect: KeyedEffect::new(),
                next_cycle: 0,
                active: None,
                reconciling: false,
                rerun: false,
                disposed: false,
            })),
        }
    }

    pub fn downgrade(&self) -> WeakFetcher<T> {
        WeakFetcher {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Feeds the current reactive inputs. Starts a cycle if the stable
    /// producer's identity or the gate differs from the last evaluation.
    pub fn evaluate<F, Fut>(&self, producer: &StableCallback<F>, gate: bool)
    where
        F: Fn(CancelHandle) -> Fut + 'static,
        Fut: Future<Output = Result<Value, FetchError>> + 'static,
    {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                log::debug!("fetch: evaluate after dispose ignored");
                return;
            }
            let generation = producer.generation();
            if inner.producer.as_ref().map(|(g, _)| *g) != Some(generation) {
                let cb = producer.callback().clone();
                let f: ProducerFn =
                    Rc::new(move |cancel: CancelHandle| -> ProducerFuture { Box::pin((*cb)(cancel)) });
                inner.producer = Some((generation, f));
            }
            inner.gate = gate;
        }
        self.reconcile();
    }

    pub fn set_gate(&self, gate: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.gate = gate;
        }
        self.reconcile();
    }

    /// Starts a new cycle with unchanged dependencies, subject to the gate
    /// and start delay. Before the first `evaluate` this only arms the next one.
    pub fn refresh(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                log::debug!("fetch: refresh after dispose ignored");
                return;
            }
            inner.trigger += 1;
        }
        self.reconcile();
    }

    /// Cancels the live cycle, if any. Later transitions are ignored.
    pub fn dispose(&self) {
        let mut effect = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.active = None;
            if inner.reconciling {
                // reconcile() holds the effect and disposes it on return
                return;
            }
            std::mem::take(&mut inner.effect)
        };
        effect.dispose();
        log::debug!("fetch: disposed");
    }

    fn reconcile(&self) {
        loop {
            let (key, mut effect) = {
                let mut inner = self.inner.borrow_mut();
                if inner.disposed {
                    return;
                }
                if inner.reconciling {
                    inner.rerun = true;
                    return;
                }
                let Some(producer) = inner.producer.as_ref().map(|(g, _)| *g) else {
                    return;
                };
                inner.reconciling = true;
                inner.rerun = false;
                let key = CycleKey {
                    producer,
                    gate: inner.gate,
                    trigger: inner.trigger,
                };
                (key, std::mem::take(&mut inner.effect))
            };

            let mut launch = None;
            effect.run_if_changed(key, || {
                let (dispose, l) = self.begin_cycle();
                launch = l;
                dispose
            });

            let rerun = {
                let mut inner = self.inner.borrow_mut();
                inner.reconciling = false;
                if inner.disposed {
                    drop(inner);
                    effect.dispose();
                    return;
                }
                inner.effect = effect;
                inner.rerun
            };

            if let Some(l) = launch {
                self.launch(l);
            }
            if !rerun {
                break;
            }
        }
    }

    fn begin_cycle(&self) -> (Dispose, Option<Launch>) {
        let mut inner = self.inner.borrow_mut();
        let first = !inner.evaluated_once;
        inner.evaluated_once = true;
        inner.active = None;

        if !inner.gate || (inner.skip_initial_fetch && first) {
            inner.phase = FetchPhase::Gated;
            log::debug!(
                "fetch: gated (gate={}, initial skipped={})",
                inner.gate,
                inner.gate && first
            );
            drop(inner);
            if self.loading() {
                self.publish(|s| s.loading = false);
            }
            return (Dispose::noop(), None);
        }

        let id = inner.next_cycle;
        inner.next_cycle += 1;
        inner.active = Some(id);
        let cancel = CancelHandle::new();

        let (timer, launch) = match inner.start_delay {
            Some(delay) => {
                inner.phase = FetchPhase::Pending;
                log::debug!("fetch cycle {id}: pending for {delay:?}");
                let weak = self.downgrade();
                let cancel = cancel.clone();
                let timer = inner.spawner.schedule(delay, move || {
                    if let Some(f) = weak.upgrade() {
                        f.launch(Launch { id, cancel });
                    }
                });
                (Some(timer), None)
            }
            None => (
                None,
                Some(Launch {
                    id,
                    cancel: cancel.clone(),
                }),
            ),
        };
        drop(inner);

        self.publish(|s| s.loading = true);

        let dispose = Dispose::new(move || {
            cancel.cancel();
            if let Some(t) = timer {
                t.cancel();
            }
            log::debug!("fetch cycle {id}: released");
        });
        (dispose, launch)
    }

    fn launch(&self, Launch { id, cancel }: Launch) {
        let (producer, spawner) = {
            let mut inner = self.inner.borrow_mut();
            if inner.active != Some(id) || cancel.is_cancelled() {
                return;
            }
            let Some((_, producer)) = inner.producer.clone() else {
                return;
            };
            inner.phase = FetchPhase::InFlight;
            (producer, inner.spawner.clone())
        };

        log::debug!("fetch cycle {id}: invoking producer");
        let fut = (*producer)(cancel.clone());
        let weak = self.downgrade();
        let settle_cancel = cancel.clone();
        let task = async move {
            let outcome = fut.await;
            if let Some(f) = weak.upgrade() {
                f.settle(id, &settle_cancel, outcome);
            }
        };
        if let Err(e) = spawner.spawn(task) {
            log::warn!("fetch cycle {id}: could not spawn producer: {e}");
            self.settle(id, &cancel, Err(e.into()));
        }
    }

    fn settle(&self, id: u64, cancel: &CancelHandle, outcome: Result<Value, FetchError>) {
        let payload_path = {
            let mut inner = self.inner.borrow_mut();
            if cancel.is_cancelled() || inner.active != Some(id) {
                log::debug!("fetch cycle {id}: superseded; discarding settlement");
                return;
            }
            inner.active = None;
            inner.payload_path.clone()
        };

        let outcome = outcome.and_then(|envelope| extract::<T>(envelope, payload_path.as_ref()));
        let phase = match &outcome {
            Ok(_) => FetchPhase::Succeeded,
            Err(FetchError::Cancelled) => FetchPhase::Aborted,
            Err(_) => FetchPhase::Failed,
        };
        self.inner.borrow_mut().phase = phase;

        match outcome {
            Ok(value) => {
                log::debug!("fetch cycle {id}: succeeded");
                self.publish(move |s| {
                    s.value = value;
                    s.loading = false;
                    s.error = None;
                    s.settled_once = true;
                });
            }
            Err(FetchError::Cancelled) => {
                log::debug!("fetch cycle {id}: producer cancelled itself");
                self.publish(|s| s.loading = false);
            }
            Err(e) => {
                log::debug!("fetch cycle {id}: failed: {e}");
                self.publish(move |s| {
                    s.error = Some(e);
                    s.loading = false;
                    s.settled_once = true;
                });
            }
        }
    }

    fn publish(&self, f: impl FnOnce(&mut FetchState<T>)) {
        let (state, spawner) = {
            let inner = self.inner.borrow();
            (inner.state.clone(), inner.spawner.clone())
        };
        state.update(f);
        spawner.request_frame();
    }

    pub fn state(&self) -> FetchState<T> {
        self.signal().get()
    }

    pub fn value(&self) -> T {
        self.signal().with(|s| s.value.clone())
    }

    pub fn loading(&self) -> bool {
        self.signal().with(|s| s.loading)
    }

    pub fn error(&self) -> Option<FetchError> {
        self.signal().with(|s| s.error.clone())
    }

    pub fn settled_once(&self) -> bool {
        self.signal().with(|s| s.settled_once)
    }

    pub fn phase(&self) -> FetchPhase {
        self.inner.borrow().phase
    }

    /// Number of cycles started so far (gated evaluations are not cycles).
    pub fn cycles_started(&self) -> u64 {
        self.inner.borrow().next_cycle
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    pub fn signal(&self) -> Signal<FetchState<T>> {
        self.inner.borrow().state.clone()
    }

    pub fn subscribe(&self, f: impl Fn(&FetchState<T>) + 'static) -> SubId {
        self.signal().subscribe(f)
    }
}

/// Applies the payload path. A path that selects nothing yields `T::default()`.
fn extract<T>(envelope: Value, path: Option<&PayloadPath>) -> Result<T, FetchError>
where
    T: DeserializeOwned + Default,
{
    match path {
        None => Ok(serde_json::from_value(envelope)?),
        Some(path) => match path.select(&envelope) {
            Some(payload) => Ok(T::deserialize(payload)?),
            None => {
                log::warn!(
                    "fetch: payload path '{}' selected nothing; using default",
                    path.as_str()
                );
                Ok(T::default())
            }
        },
    }
}
