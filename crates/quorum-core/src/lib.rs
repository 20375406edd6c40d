//! # Slots, Scopes, and Fetches
//!
//! Quorum screens are plain functions re-run by a `Scheduler` whenever the
//! data they show changes. There are four main pieces:
//!
//! - `remember_with_key`: storage bound to composition, looked up by key.
//! - `Scope`: cleanups that run when the scheduler is disposed.
//! - `DeepMemo`: a callback whose identity survives re-construction as long
//!   as its dependencies stay structurally equal.
//! - `Fetcher` / `use_fetch`: the request lifecycle around an async producer.
//!
//! ## Remembered state
//!
//! ```rust
//! use std::cell::Cell;
//! use quorum_core::*;
//!
//! let mut s = Scheduler::new();
//! for _ in 0..3 {
//!     s.compose(|_s| {
//!         let renders = remember_with_key("renders", || Cell::new(0));
//!         renders.set(renders.get() + 1);
//!     });
//! }
//! let renders = s.compose(|_s| remember_with_key("renders", || Cell::new(0)).get());
//! assert_eq!(renders, 3);
//! ```
//!
//! A key names the same value on every pass, whichever branches the pass
//! takes.
//!
//! ## Stable callbacks
//!
//! Closures are rebuilt on every pass, usually over freshly built parameter
//! objects. `DeepMemo::stabilize` compares the dependency snapshot by value
//! and hands back the previous callback when nothing changed:
//!
//! ```rust
//! use quorum_core::*;
//! use serde_json::json;
//!
//! fn page_loader(page: u32) -> impl Fn() -> u32 {
//!     move || page
//! }
//!
//! let mut memo = DeepMemo::new();
//! let a = memo.stabilize(page_loader(1), deps![Dep::from(json!({"page": 1, "size": 10}))]);
//! let b = memo.stabilize(page_loader(1), deps![Dep::from(json!({"size": 10, "page": 1}))]);
//! assert!(a.ptr_eq(&b));
//! ```
//!
//! ## Fetching
//!
//! See [`fetch`] for the lifecycle and its supersession rule.

pub mod clock;
pub mod deps;
pub mod effects;
pub mod effects_ext;
pub mod executor;
pub mod fetch;
pub mod memo;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod tests;
pub mod timer;

pub use clock::*;
pub use deps::*;
pub use effects::*;
pub use effects_ext::*;
pub use executor::*;
pub use fetch::*;
pub use memo::*;
pub use prelude::*;
pub use runtime::*;
pub use signal::*;
pub use timer::*;
