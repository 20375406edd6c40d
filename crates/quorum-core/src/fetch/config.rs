use web_time::Duration;

use super::PayloadPath;

/// Per-orchestrator configuration, fixed at creation except for the gate,
/// which `Fetcher::evaluate` re-reads every time.
///
/// ```rust
/// use std::time::Duration;
/// use quorum_core::FetchConfig;
///
/// let cfg = FetchConfig::<Vec<String>>::new()
///     .payload_path("data")
///     .start_delay(Duration::from_millis(500));
/// assert!(cfg.gate());
/// ```
#[derive(Debug, Clone)]
pub struct FetchConfig<T> {
    pub(crate) gate: bool,
    pub(crate) payload_path: Option<PayloadPath>,
    pub(crate) start_delay: Option<Duration>,
    pub(crate) skip_initial_fetch: bool,
    pub(crate) initial_value: Option<T>,
}

impl<T> FetchConfig<T> {
    pub fn new() -> Self {
        Self {
            gate: true,
            payload_path: None,
            start_delay: None,
            skip_initial_fetch: false,
            initial_value: None,
        }
    }

    /// Gate condition; no cycle starts while it is false.
    pub fn fetch_when(mut self, gate: bool) -> Self {
        self.gate = gate;
        self
    }

    pub fn payload_path(mut self, path: impl Into<PayloadPath>) -> Self {
        self.payload_path = Some(path.into());
        self
    }

    /// A zero delay is the same as none.
    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn skip_initial_fetch(mut self, skip: bool) -> Self {
        self.skip_initial_fetch = skip;
        self
    }

    pub fn initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn gate(&self) -> bool {
        self.gate
    }

    pub fn delay(&self) -> Option<Duration> {
        self.start_delay
    }
}

impl<T> Default for FetchConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}
