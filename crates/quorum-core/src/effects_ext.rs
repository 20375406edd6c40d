use crate::Dispose;

/// Re-runs an effect whenever its key changes, running the previous effect's
/// cleanup first. Each fetch cycle is one run of the effect.
pub struct KeyedEffect<K> {
    last_key: Option<K>,
    cleanup: Option<Dispose>,
}

impl<K: PartialEq> KeyedEffect<K> {
    pub fn new() -> Self {
        Self {
            last_key: None,
            cleanup: None,
        }
    }

    /// Returns true if the key changed and `effect` ran.
    pub fn run_if_changed(&mut self, key: K, effect: impl FnOnce() -> Dispose) -> bool {
        if self.last_key.as_ref() == Some(&key) {
            return false;
        }
        self.last_key = Some(key);
        if let Some(d) = self.cleanup.take() {
            d.run();
        }
        self.cleanup = Some(effect());
        true
    }

    pub fn key(&self) -> Option<&K> {
        self.last_key.as_ref()
    }

    /// Runs the pending cleanup. The last key is kept, so an unchanged key
    /// will not re-run the effect.
    pub fn dispose(&mut self) {
        if let Some(d) = self.cleanup.take() {
            d.run();
        }
    }
}

impl<K: PartialEq> Default for KeyedEffect<K> {
    fn default() -> Self {
        Self::new()
    }
}
