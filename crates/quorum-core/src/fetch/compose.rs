use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CancelHandle, FetchConfig, FetchError, Fetcher};
use crate::deps::Deps;
use crate::executor::Spawner;
use crate::memo::{DeepMemo, remember_deep_callback};
use crate::runtime::{Scheduler, remember_with_key};
use crate::scope::current_scope;

/// Composition-pass entry point: memoizes `producer` against `deps` and feeds
/// the result to a `Fetcher` remembered under `key`.
///
/// `config` is read once when the fetcher is first created; afterwards only
/// its gate is re-evaluated. A fetcher created inside a scope is disposed
/// with that scope.
pub fn use_fetch<T, F, Fut>(
    s: &Scheduler,
    key: &str,
    producer: F,
    deps: Deps,
    config: FetchConfig<T>,
) -> Fetcher<T>
where
    T: DeserializeOwned + Default + Clone + 'static,
    F: Fn(CancelHandle) -> Fut + 'static,
    Fut: Future<Output = Result<Value, FetchError>> + 'static,
{
    let gate = config.gate();
    let stable = remember_deep_callback(format!("fetch:{key}"), producer, deps);
    let fetcher = remember_with_key(format!("fetcher:{key}"), || {
        let fetcher = Fetcher::new(s.spawner(), config);
        if let Some(scope) = current_scope() {
            let weak = fetcher.downgrade();
            scope.add_disposer(move || {
                if let Some(f) = weak.upgrade() {
                    f.dispose();
                }
            });
        }
        fetcher
    });
    fetcher.evaluate(&stable, gate);
    Fetcher::clone(&fetcher)
}

/// The memoizer and orchestrator bundled for hosts that drive re-evaluation
/// themselves instead of through composition passes.
pub struct RequestLifecycle<T: 'static, F> {
    memo: DeepMemo<F>,
    fetcher: Fetcher<T>,
}

impl<T, F> RequestLifecycle<T, F>
where
    T: DeserializeOwned + Default + Clone + 'static,
{
    pub fn new(spawner: &Spawner, config: FetchConfig<T>) -> Self {
        Self {
            memo: DeepMemo::new(),
            fetcher: Fetcher::new(spawner, config),
        }
    }

    /// One re-evaluation with the caller's current producer, dependencies
    /// and gate.
    pub fn run<Fut>(&mut self, producer: F, deps: Deps, gate: bool) -> &Fetcher<T>
    where
        F: Fn(CancelHandle) -> Fut + 'static,
        Fut: Future<Output = Result<Value, FetchError>> + 'static,
    {
        let stable = self.memo.stabilize(producer, deps);
        self.fetcher.evaluate(&stable, gate);
        &self.fetcher
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    pub fn refresh(&self) {
        self.fetcher.refresh();
    }

    pub fn dispose(&self) {
        self.fetcher.dispose();
    }
}
