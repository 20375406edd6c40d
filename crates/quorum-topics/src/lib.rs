//! Topic and voting-session screens on top of `quorum-core`.
//!
//! `TopicDesk` keeps topics, sessions and votes in memory. `TopicApi` puts an
//! async, cancellable front on it that answers with response envelopes, and
//! the functions in [`screen`] bind those calls to composition through
//! `use_fetch`.

pub mod api;
pub mod desk;
pub mod error;
pub mod model;
pub mod screen;


pub use api::{ApiFuture, TopicApi};
pub use desk::TopicDesk;
pub use error::DeskError;
pub use model::*;
pub use screen::*;
