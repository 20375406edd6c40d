use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use quorum_core::{CancelHandle, FetchError, Spawner};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;
use web_time::Duration;

use crate::desk::TopicDesk;
use crate::error::DeskError;
use crate::model::{ListQuery, TopicDraft};

pub type ApiFuture = LocalBoxFuture<'static, Result<Value, FetchError>>;

/// Async front of a `TopicDesk`.
///
/// Every call waits out the configured latency on the scheduler's timers,
/// then answers with a `{"status": 200, "data": ...}` envelope. A call whose
/// handle is cancelled before the desk is touched fails with
/// `FetchError::Cancelled` and changes nothing.
#[derive(Clone)]
pub struct TopicApi {
    desk: Rc<RefCell<TopicDesk>>,
    spawner: Spawner,
    latency: Duration,
}

impl TopicApi {
    pub fn new(desk: Rc<RefCell<TopicDesk>>, spawner: &Spawner, latency: Duration) -> Self {
        Self {
            desk,
            spawner: spawner.clone(),
            latency,
        }
    }

    pub fn desk(&self) -> &Rc<RefCell<TopicDesk>> {
        &self.desk
    }

    pub fn list(&self, query: ListQuery, cancel: CancelHandle) -> ApiFuture {
        self.respond(cancel, move |desk| desk.list(&query))
    }

    pub fn create(&self, draft: TopicDraft, cancel: CancelHandle) -> ApiFuture {
        self.respond(cancel, move |desk| desk.create_topic(draft))
    }

    pub fn start_session(
        &self,
        topic: Uuid,
        minutes: Option<u32>,
        cancel: CancelHandle,
    ) -> ApiFuture {
        self.respond(cancel, move |desk| desk.start_session(topic, minutes))
    }

    pub fn vote(&self, topic: Uuid, cpf: String, vote: bool, cancel: CancelHandle) -> ApiFuture {
        self.respond(cancel, move |desk| desk.vote(topic, &cpf, vote))
    }

    pub fn vote_in_session(
        &self,
        session: Uuid,
        cpf: String,
        vote: bool,
        cancel: CancelHandle,
    ) -> ApiFuture {
        self.respond(cancel, move |desk| desk.vote_in_session(session, &cpf, vote))
    }

    pub fn results(&self, topic: Uuid, cancel: CancelHandle) -> ApiFuture {
        self.respond(cancel, move |desk| desk.results(topic))
    }

    fn respond<R, Op>(&self, cancel: CancelHandle, op: Op) -> ApiFuture
    where
        R: Serialize,
        Op: FnOnce(&mut TopicDesk) -> Result<R, DeskError> + 'static,
    {
        let desk = self.desk.clone();
        let latency = (!self.latency.is_zero()).then(|| self.spawner.sleep(self.latency));
        async move {
            if let Some(sleep) = latency {
                future::select(sleep, cancel.cancelled()).await;
            }
            cancel.check()?;
            let data = op(&mut desk.borrow_mut()).inspect_err(|e| log::debug!("api: {e}"))?;
            Ok(json!({ "status": 200, "data": serde_json::to_value(data)? }))
        }
        .boxed_local()
    }
}
