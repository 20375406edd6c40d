use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::deps::Deps;
use crate::remember_with_key;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A callback whose identity is the `generation` it was stabilized under.
/// Two handles are the same callback iff their generations match.
pub struct StableCallback<F: ?Sized> {
    generation: u64,
    callback: Rc<F>,
}

impl<F: ?Sized> StableCallback<F> {
    pub fn new(callback: Rc<F>) -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            callback,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    pub fn callback(&self) -> &Rc<F> {
        &self.callback
    }
}

impl<F: ?Sized> Clone for StableCallback<F> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            callback: self.callback.clone(),
        }
    }
}

impl<F: ?Sized> Deref for StableCallback<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.callback
    }
}

/// Keeps a callback's identity stable while its dependencies stay deeply equal.
///
/// Holds exactly one snapshot: the last one that differed from its
/// predecessor, with the callback supplied alongside it.
pub struct DeepMemo<F> {
    last: Option<(Deps, StableCallback<F>)>,
}

impl<F> DeepMemo<F> {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn stabilize(&mut self, callback: F, deps: Deps) -> StableCallback<F> {
        if let Some((last_deps, stable)) = &self.last
            && last_deps.equivalent(&deps)
        {
            return stable.clone();
        }
        let stable = StableCallback::new(Rc::new(callback));
        self.last = Some((deps, stable.clone()));
        stable
    }

    pub fn current(&self) -> Option<&StableCallback<F>> {
        self.last.as_ref().map(|(_, s)| s)
    }
}

impl<F> Default for DeepMemo<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Composition-slot form of `DeepMemo::stabilize`, keyed per call site.
pub fn remember_deep_callback<F: 'static>(
    key: impl Into<String>,
    callback: F,
    deps: Deps,
) -> StableCallback<F> {
    let key = key.into();
    let memo = remember_with_key(format!("deep_callback:{key}"), || {
        RefCell::new(DeepMemo::<F>::new())
    });
    memo.borrow_mut().stabilize(callback, deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COMPOSER, Dep, deps};
    use serde_json::json;

    // One closure type per call site, as in a composition pass.
    fn producer(tag: &'static str) -> impl Fn() -> &'static str {
        move || tag
    }

    #[test]
    fn equal_snapshot_keeps_first_callback() {
        let mut memo = DeepMemo::new();
        let f = memo.stabilize(producer("f"), deps![Dep::from(json!({"page": 0, "size": 10}))]);
        // a freshly built object with the same contents
        let g = memo.stabilize(producer("g"), deps![Dep::from(json!({"size": 10, "page": 0}))]);

        assert!(f.ptr_eq(&g));
        assert_eq!(f.generation(), g.generation());
        assert_eq!((*g)(), "f");
    }

    #[test]
    fn changed_value_yields_latest_callback() {
        let mut memo = DeepMemo::new();
        let f = memo.stabilize(producer("f"), deps![0, "asc"]);
        let g = memo.stabilize(producer("g"), deps![1, "asc"]);

        assert!(!f.ptr_eq(&g));
        assert_ne!(f.generation(), g.generation());
        assert_eq!((*g)(), "g");

        // the retained snapshot is now the changed one
        let h = memo.stabilize(producer("h"), deps![1, "asc"]);
        assert!(g.ptr_eq(&h));
        assert_eq!((*h)(), "g");
    }

    #[test]
    fn length_change_is_always_a_change() {
        let mut memo = DeepMemo::new();
        let f = memo.stabilize(producer("f"), deps![1]);
        let g = memo.stabilize(producer("g"), deps![1, Dep::Null]);
        assert!(!f.ptr_eq(&g));
        assert_eq!(memo.current().map(|c| c.generation()), Some(g.generation()));
    }

    #[test]
    fn remembered_memo_is_per_key() {
        COMPOSER.with(|c| c.borrow_mut().keyed_slots.clear());

        let a1 = remember_deep_callback("a", producer("a1"), deps![1]);
        let b1 = remember_deep_callback("b", producer("b1"), deps![1]);
        let a2 = remember_deep_callback("a", producer("a2"), deps![1]);

        assert!(a1.ptr_eq(&a2));
        assert_eq!((*a2)(), "a1");
        assert_ne!(a1.generation(), b1.generation());
    }
}
