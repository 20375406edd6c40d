pub use crate::clock::{Clock, ManualClock, SystemClock, set_clock};
pub use crate::deps::{Dep, Deps, deep_equal};
pub use crate::effects::Dispose;
pub use crate::effects_ext::KeyedEffect;
pub use crate::executor::{Sleep, Spawner};
pub use crate::fetch::{
    CancelHandle, FetchConfig, FetchError, FetchPhase, FetchState, Fetcher, PayloadPath,
    RequestLifecycle, use_fetch,
};
pub use crate::memo::{DeepMemo, StableCallback, remember_deep_callback};
pub use crate::runtime::{Scheduler, remember_with_key};
pub use crate::scope::{Scope, current_scope};
pub use crate::signal::{Signal, signal};
