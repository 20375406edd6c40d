//! # Request lifecycle
//!
//! A `Fetcher<T>` owns one "current data view" backed by a producer: an async
//! closure taking a `CancelHandle` and resolving to a JSON envelope.
//!
//! ```text
//!   Idle ──evaluate──► Gated            (gate closed / first pass skipped)
//!     │                  │
//!     └──────┬───────────┘
//!            ▼
//!        Pending ──delay──► InFlight ──► Succeeded | Failed | Aborted
//! ```
//!
//! Any change of the stable producer, the gate, or the refresh counter starts
//! a new cycle and supersedes the live one. A superseded cycle's late result
//! never reaches `FetchState`.
//!
//! Inside a composition pass, `use_fetch` memoizes the producer against its
//! dependency snapshot and binds the fetcher to the current scope:
//!
//! ```rust
//! use quorum_core::*;
//! use serde_json::json;
//!
//! let mut s = Scheduler::new();
//! let topics = s.compose(|s| {
//!     use_fetch::<Vec<String>, _, _>(
//!         s,
//!         "topics",
//!         |_cancel| async { Ok::<_, FetchError>(json!({"data": ["budget", "bylaws"]})) },
//!         deps![1],
//!         FetchConfig::new().payload_path("data"),
//!     )
//! });
//! assert!(topics.loading());
//! s.pump();
//! assert_eq!(topics.value(), vec!["budget", "bylaws"]);
//! ```

mod cancel;
mod compose;
mod config;
mod error;
mod fetcher;
mod path;
mod state;


pub use cancel::{CancelHandle, Cancelled};
pub use compose::{RequestLifecycle, use_fetch};
pub use config::FetchConfig;
pub use error::FetchError;
pub use fetcher::{Fetcher, ProducerFuture, WeakFetcher};
pub use path::PayloadPath;
pub use state::{FetchPhase, FetchState};
