//! Records kept by the desk and the camelCase shapes the API hands out.
//!
//! Timestamps are milliseconds since the desk's epoch.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TITLE_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSession {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub start_time: u64,
    pub end_time: u64,
}

impl VotingSession {
    /// A session accepts votes strictly before its end time.
    pub fn is_open(&self, now: u64) -> bool {
        now < self.end_time
    }

    pub fn status(&self, now: u64) -> SessionStatus {
        if self.is_open(now) {
            SessionStatus::Open
        } else {
            SessionStatus::Finished
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub session_id: Uuid,
    pub topic_id: Uuid,
    pub cpf: String,
    pub vote: bool,
    pub voted_at: u64,
}

/// Input for `TopicDesk::create_topic`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDraft {
    pub title: String,
    pub description: String,
}

impl TopicDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One row of the topic list: the topic plus its most recent session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicWithOpenSession {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_end_time: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            total_elements: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Open,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteOutcome {
    Favorable,
    Against,
    Tied,
}

impl VoteOutcome {
    pub fn from_tally(favorable: u64, against: u64) -> Option<Self> {
        if favorable == 0 && against == 0 {
            None
        } else if favorable == against {
            Some(VoteOutcome::Tied)
        } else if favorable > against {
            Some(VoteOutcome::Favorable)
        } else {
            Some(VoteOutcome::Against)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVote {
    pub cpf: String,
    pub vote: bool,
    pub voted_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVotes {
    pub id: Uuid,
    pub start_time: u64,
    pub end_time: u64,
    pub status: SessionStatus,
    pub votes: Vec<CastVote>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResults {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: u64,
    pub voting_sessions_votes: Vec<SessionVotes>,
    pub favorable_votes: u64,
    pub against_votes: u64,
    pub current_result: Option<VoteOutcome>,
    pub final_result: Option<VoteOutcome>,
    pub current_result_text: String,
    pub final_result_text: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    #[default]
    CreatedAt,
    Description,
}

impl SortField {
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "title" => Some(SortField::Title),
            "createdAt" => Some(SortField::CreatedAt),
            "description" => Some(SortField::Description),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(order: &str) -> Option<Self> {
        if order.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if order.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

/// Listing parameters. `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: u32,
    pub size: u32,
    pub order_by: SortField,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            order_by: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_from_tally() {
        assert_eq!(VoteOutcome::from_tally(0, 0), None);
        assert_eq!(VoteOutcome::from_tally(2, 2), Some(VoteOutcome::Tied));
        assert_eq!(VoteOutcome::from_tally(3, 1), Some(VoteOutcome::Favorable));
        assert_eq!(VoteOutcome::from_tally(0, 1), Some(VoteOutcome::Against));
    }

    #[test]
    fn list_row_omits_missing_session() {
        let row = TopicWithOpenSession {
            title: "Budget".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["title"], json!("Budget"));
        assert_eq!(v["createdAt"], json!(0));
        assert!(v.get("sessionId").is_none());
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(VoteOutcome::Favorable).unwrap(), json!("FAVORABLE"));
        assert_eq!(serde_json::to_value(SessionStatus::Finished).unwrap(), json!("FINISHED"));
        assert_eq!(SortField::parse("createdAt"), Some(SortField::CreatedAt));
        assert_eq!(SortOrder::parse("desc"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("sideways"), None);
    }
}
