//! Composable screens. Each call is one composition pass; the fetchers they
//! return are remembered under fixed keys, so calling a screen again with
//! freshly built but equal models does not re-issue its request.

use futures::FutureExt;
use futures::future;
use quorum_core::{
    CancelHandle, Dep, FetchConfig, FetchError, FetchState, Fetcher, Scheduler, deps, use_fetch,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use web_time::Duration;

use crate::api::TopicApi;
use crate::model::{ListQuery, Page, SortField, SortOrder, TopicWithOpenSession, VoteResults};

pub const LIST_START_DELAY: Duration = Duration::from_millis(500);
pub const RESULTS_START_DELAY: Duration = Duration::from_millis(500);

/// Grid pagination; `page` is 0-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageModel {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageModel {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 10,
        }
    }
}

/// One grid sort column; `sort` is `"asc"`, `"desc"` or unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortItem {
    pub field: String,
    pub sort: Option<String>,
}

impl SortItem {
    pub fn new(field: impl Into<String>, sort: &str) -> Self {
        Self {
            field: field.into(),
            sort: Some(sort.to_string()),
        }
    }
}

/// Only the first sort column is honoured; unknown fields fall back to
/// creation time.
pub fn list_query(paging: &PageModel, sort: &[SortItem]) -> ListQuery {
    let first = sort.first();
    ListQuery {
        page: paging.page + 1,
        size: paging.page_size,
        order_by: first
            .and_then(|s| SortField::parse(&s.field))
            .unwrap_or_default(),
        order: first
            .and_then(|s| s.sort.as_deref())
            .and_then(SortOrder::parse)
            .unwrap_or_default(),
    }
}

pub fn topic_list(
    s: &Scheduler,
    api: &TopicApi,
    paging: &PageModel,
    sort: &[SortItem],
) -> Fetcher<Page<TopicWithOpenSession>> {
    let query = list_query(paging, sort);
    let producer = {
        let api = api.clone();
        move |cancel: CancelHandle| api.list(query.clone(), cancel)
    };
    use_fetch(
        s,
        "topic-list",
        producer,
        deps![Dep::of(paging), Dep::of(sort)],
        FetchConfig::new()
            .payload_path("data")
            .start_delay(LIST_START_DELAY)
            .initial_value(Page::default()),
    )
}

/// Results for the selected topic; nothing is fetched while no topic is
/// selected.
pub fn topic_results(
    s: &Scheduler,
    api: &TopicApi,
    selected: Option<Uuid>,
) -> Fetcher<Option<VoteResults>> {
    let producer = {
        let api = api.clone();
        move |cancel: CancelHandle| match selected {
            Some(topic) => api.results(topic, cancel),
            None => future::ready(Err(FetchError::failed("no topic selected"))).boxed_local(),
        }
    };
    use_fetch(
        s,
        "topic-results",
        producer,
        deps![Dep::of(&selected)],
        FetchConfig::new()
            .fetch_when(selected.is_some())
            .payload_path("data")
            .start_delay(RESULTS_START_DELAY),
    )
}

pub fn describe_list(state: &FetchState<Page<TopicWithOpenSession>>) -> String {
    let mut out = String::new();
    if state.loading {
        out.push_str("[loading] ");
    }
    if let Some(e) = &state.error {
        out.push_str(&format!("[error: {e}] "));
    }
    out.push_str(&format!("{} topic(s)", state.value.total_elements));
    for row in &state.value.content {
        let session = match row.session_end_time {
            Some(end) => format!(" (session until {end} ms)"),
            None => String::new(),
        };
        out.push_str(&format!("\n  - {}{session}", row.title));
    }
    out
}

pub fn describe_results(state: &FetchState<Option<VoteResults>>) -> String {
    if state.loading {
        return "...".to_string();
    }
    if let Some(e) = &state.error {
        return format!("error: {e}");
    }
    match &state.value {
        None => "no topic selected".to_string(),
        Some(r) => format!(
            "{}: {} favorable, {} against; {}; {}",
            r.title, r.favorable_votes, r.against_votes, r.current_result_text, r.final_result_text
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_from_grid_models() {
        let q = list_query(
            &PageModel {
                page: 2,
                page_size: 25,
            },
            &[SortItem::new("title", "desc"), SortItem::new("createdAt", "asc")],
        );
        assert_eq!(q.page, 3);
        assert_eq!(q.size, 25);
        assert_eq!(q.order_by, SortField::Title);
        assert_eq!(q.order, SortOrder::Desc);

        let fallback = list_query(&PageModel::default(), &[]);
        assert_eq!(fallback, ListQuery::default());
    }
}
