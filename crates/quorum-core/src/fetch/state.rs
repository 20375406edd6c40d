use super::FetchError;

/// Where an orchestrator is in its request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// Never evaluated.
    #[default]
    Idle,
    /// Gate closed, or the first evaluation was skipped.
    Gated,
    /// Start delay running; producer not yet invoked.
    Pending,
    InFlight,
    Succeeded,
    Failed,
    /// The live cycle's producer reported cancellation on its own.
    Aborted,
}

impl FetchPhase {
    pub fn is_live(self) -> bool {
        matches!(self, FetchPhase::Pending | FetchPhase::InFlight)
    }
}

/// Observable result of an orchestrator. `loading` is false whenever
/// `error` is set by a settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub value: T,
    pub loading: bool,
    pub error: Option<FetchError>,
    pub settled_once: bool,
}

impl<T> FetchState<T> {
    pub(crate) fn initial(value: T, loading: bool) -> Self {
        Self {
            value,
            loading,
            error: None,
            settled_once: false,
        }
    }
}
