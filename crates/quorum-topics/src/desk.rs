use std::cmp::Ordering;

use uuid::Uuid;
use web_time::{Duration, Instant};

use crate::error::DeskError;
use crate::model::*;

const CPF_DIGITS: usize = 11;
const DEFAULT_SESSION_MINUTES: u32 = 1;

/// In-memory store of topics, voting sessions and votes.
///
/// Time is read from the runtime clock and recorded as milliseconds since
/// the desk was created.
pub struct TopicDesk {
    epoch: Instant,
    topics: Vec<Topic>,
    sessions: Vec<VotingSession>,
    votes: Vec<Vote>,
}

impl Default for TopicDesk {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicDesk {
    pub fn new() -> Self {
        Self {
            epoch: quorum_core::now(),
            topics: Vec::new(),
            sessions: Vec::new(),
            votes: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        let elapsed = quorum_core::now().saturating_duration_since(self.epoch);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn create_topic(&mut self, draft: TopicDraft) -> Result<Topic, DeskError> {
        let title = required("title", &draft.title, TITLE_MAX_CHARS)?;
        let description = required("description", &draft.description, DESCRIPTION_MAX_CHARS)?;
        if self.topics.iter().any(|t| t.title == title) {
            return Err(DeskError::Conflict(format!(
                "a topic titled '{title}' already exists"
            )));
        }

        let topic = Topic {
            id: Uuid::new_v4(),
            title,
            description,
            created_at: self.now_ms(),
        };
        log::info!("desk: created topic {} ({})", topic.id, topic.title);
        self.topics.push(topic.clone());
        Ok(topic)
    }

    pub fn topic(&self, id: Uuid) -> Result<&Topic, DeskError> {
        self.topics
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| DeskError::NotFound(format!("topic {id}")))
    }

    pub fn list(&self, query: &ListQuery) -> Result<Page<TopicWithOpenSession>, DeskError> {
        if query.page == 0 {
            return Err(DeskError::Invalid("page starts at 1".into()));
        }
        if query.size == 0 {
            return Err(DeskError::Invalid("page size must be positive".into()));
        }

        let mut rows: Vec<&Topic> = self.topics.iter().collect();
        rows.sort_by(|a, b| {
            let ord = compare(a, b, query.order_by);
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let skip = (query.page as usize - 1).saturating_mul(query.size as usize);
        let content = rows
            .into_iter()
            .skip(skip)
            .take(query.size as usize)
            .map(|t| self.with_latest_session(t))
            .collect();
        Ok(Page {
            content,
            total_elements: self.topics.len() as u64,
        })
    }

    fn with_latest_session(&self, topic: &Topic) -> TopicWithOpenSession {
        let latest = self
            .sessions
            .iter()
            .filter(|s| s.topic_id == topic.id)
            .max_by_key(|s| s.start_time);
        TopicWithOpenSession {
            id: topic.id,
            title: topic.title.clone(),
            description: topic.description.clone(),
            created_at: topic.created_at,
            session_id: latest.map(|s| s.id),
            session_start_time: latest.map(|s| s.start_time),
            session_end_time: latest.map(|s| s.end_time),
        }
    }

    /// Opens a voting session lasting `minutes` (one minute when `None`).
    pub fn start_session(
        &mut self,
        topic_id: Uuid,
        minutes: Option<u32>,
    ) -> Result<VotingSession, DeskError> {
        let minutes = minutes.unwrap_or(DEFAULT_SESSION_MINUTES);
        if minutes == 0 {
            return Err(DeskError::Invalid("session must last at least a minute".into()));
        }
        let now = self.now_ms();
        if self.open_session(topic_id, now).is_some() {
            return Err(DeskError::Conflict(format!(
                "topic {topic_id} already has a voting session in progress"
            )));
        }
        self.topic(topic_id)?;

        let length = Duration::from_secs(u64::from(minutes) * 60).as_millis() as u64;
        let session = VotingSession {
            id: Uuid::new_v4(),
            topic_id,
            start_time: now,
            end_time: now + length,
        };
        log::info!(
            "desk: opened session {} on topic {topic_id} for {minutes} min",
            session.id
        );
        self.sessions.push(session.clone());
        Ok(session)
    }

    fn open_session(&self, topic_id: Uuid, now: u64) -> Option<&VotingSession> {
        self.sessions
            .iter()
            .filter(|s| s.topic_id == topic_id && s.is_open(now))
            .max_by_key(|s| s.start_time)
    }

    /// Records one member's vote in the topic's open session. Only digits of
    /// `cpf` are kept; each CPF votes at most once per topic.
    pub fn vote(&mut self, topic_id: Uuid, cpf: &str, vote: bool) -> Result<Vote, DeskError> {
        let now = self.now_ms();
        let session_id = self
            .open_session(topic_id, now)
            .map(|s| s.id)
            .ok_or_else(|| DeskError::NotFound(format!("no open voting session for topic {topic_id}")))?;
        self.cast(session_id, topic_id, cpf, vote, now)
    }

    /// Same as [`TopicDesk::vote`], addressed by session instead of topic.
    /// The session must still be open.
    pub fn vote_in_session(
        &mut self,
        session_id: Uuid,
        cpf: &str,
        vote: bool,
    ) -> Result<Vote, DeskError> {
        let now = self.now_ms();
        let topic_id = self
            .sessions
            .iter()
            .find(|s| s.id == session_id && s.is_open(now))
            .map(|s| s.topic_id)
            .ok_or_else(|| DeskError::NotFound(format!("no open voting session {session_id}")))?;
        self.cast(session_id, topic_id, cpf, vote, now)
    }

    fn cast(
        &mut self,
        session_id: Uuid,
        topic_id: Uuid,
        cpf: &str,
        vote: bool,
        now: u64,
    ) -> Result<Vote, DeskError> {
        let cpf: String = cpf.chars().filter(char::is_ascii_digit).collect();
        if self
            .votes
            .iter()
            .any(|v| v.topic_id == topic_id && v.cpf == cpf)
        {
            return Err(DeskError::Conflict(
                "this member already voted on the topic; one vote per topic".into(),
            ));
        }
        if cpf.len() != CPF_DIGITS {
            return Err(DeskError::Invalid(format!("CPF must have {CPF_DIGITS} digits")));
        }
        if !cpf_check_digits_match(&cpf) {
            return Err(DeskError::Invalid(format!("{cpf} is not a valid CPF")));
        }

        let vote = Vote {
            session_id,
            topic_id,
            cpf,
            vote,
            voted_at: now,
        };
        log::info!("desk: vote recorded on topic {topic_id}");
        self.votes.push(vote.clone());
        Ok(vote)
    }

    pub fn results(&self, topic_id: Uuid) -> Result<VoteResults, DeskError> {
        let topic = self.topic(topic_id)?;
        let now = self.now_ms();

        let mut sessions: Vec<&VotingSession> = self
            .sessions
            .iter()
            .filter(|s| s.topic_id == topic_id)
            .collect();
        sessions.sort_by_key(|s| s.start_time);

        let voting_sessions_votes: Vec<SessionVotes> = sessions
            .iter()
            .map(|s| SessionVotes {
                id: s.id,
                start_time: s.start_time,
                end_time: s.end_time,
                status: s.status(now),
                votes: self
                    .votes
                    .iter()
                    .filter(|v| v.session_id == s.id)
                    .map(|v| CastVote {
                        cpf: v.cpf.clone(),
                        vote: v.vote,
                        voted_at: v.voted_at,
                    })
                    .collect(),
            })
            .collect();

        let (favorable_votes, against_votes) = voting_sessions_votes
            .iter()
            .flat_map(|s| &s.votes)
            .fold((0, 0), |(f, a), v| if v.vote { (f + 1, a) } else { (f, a + 1) });

        let in_progress = voting_sessions_votes.is_empty()
            || voting_sessions_votes
                .iter()
                .any(|s| s.status == SessionStatus::Open);

        let current_result = VoteOutcome::from_tally(favorable_votes, against_votes);
        let final_result = if in_progress { None } else { current_result };
        let current_result_text = outcome_text(current_result, in_progress);
        let final_result_text = if in_progress {
            "Voting sessions are still in progress".to_string()
        } else {
            current_result_text.clone()
        };

        Ok(VoteResults {
            id: topic.id,
            title: topic.title.clone(),
            description: topic.description.clone(),
            created_at: topic.created_at,
            voting_sessions_votes,
            favorable_votes,
            against_votes,
            current_result,
            final_result,
            current_result_text,
            final_result_text,
        })
    }
}

fn required(field: &str, value: &str, max_chars: usize) -> Result<String, DeskError> {
    if value.trim().is_empty() {
        return Err(DeskError::Invalid(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(DeskError::Invalid(format!(
            "{field} must have at most {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}

/// Structural CPF check on exactly 11 ASCII digits: not all the same digit,
/// and both mod-11 check digits match.
fn cpf_check_digits_match(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.bytes().map(|b| u32::from(b - b'0')).collect();
    if digits.windows(2).all(|w| w[0] == w[1]) {
        return false;
    }
    [9, 10].into_iter().all(|n| {
        let sum: u32 = digits[..n]
            .iter()
            .zip((2..=n as u32 + 1).rev())
            .map(|(d, w)| d * w)
            .sum();
        (sum * 10 % 11) % 10 == digits[n]
    })
}

fn compare(a: &Topic, b: &Topic, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.cmp(&b.title),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Description => a.description.cmp(&b.description),
    }
}

fn outcome_text(outcome: Option<VoteOutcome>, in_progress: bool) -> String {
    let suffix = if in_progress { " so far" } else { "" };
    match outcome {
        None => "No votes so far".to_string(),
        Some(VoteOutcome::Tied) => format!("Votes TIED{suffix}"),
        Some(VoteOutcome::Favorable) => format!("Majority of votes FAVORABLE{suffix}"),
        Some(VoteOutcome::Against) => format!("Majority of votes AGAINST{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::ManualClock;

    fn desk_with(titles: &[&str], clock: &ManualClock) -> (TopicDesk, Vec<Uuid>) {
        let mut desk = TopicDesk::new();
        let ids = titles
            .iter()
            .map(|t| {
                clock.advance(Duration::from_millis(10));
                desk.create_topic(TopicDraft::new(*t, format!("about {t}")))
                    .unwrap()
                    .id
            })
            .collect();
        (desk, ids)
    }

    #[test]
    fn create_validates_and_rejects_duplicates() {
        let _clock = ManualClock::new().install();
        let mut desk = TopicDesk::new();

        assert!(matches!(
            desk.create_topic(TopicDraft::new("  ", "x")),
            Err(DeskError::Invalid(_))
        ));
        assert!(matches!(
            desk.create_topic(TopicDraft::new("a".repeat(51), "x")),
            Err(DeskError::Invalid(_))
        ));
        assert!(matches!(
            desk.create_topic(TopicDraft::new("Budget", "d".repeat(501))),
            Err(DeskError::Invalid(_))
        ));

        let topic = desk
            .create_topic(TopicDraft::new("é".repeat(50), "multibyte title"))
            .unwrap();
        assert_eq!(topic.title.chars().count(), 50);

        desk.create_topic(TopicDraft::new("Budget", "2025 budget")).unwrap();
        let err = desk
            .create_topic(TopicDraft::new("Budget", "again"))
            .unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn list_pages_and_orders() {
        let clock = ManualClock::new().install();
        let (desk, _) = desk_with(&["charlie", "alpha", "bravo"], &clock);

        let by_title = desk
            .list(&ListQuery {
                page: 1,
                size: 2,
                order_by: SortField::Title,
                order: SortOrder::Asc,
            })
            .unwrap();
        let titles: Vec<_> = by_title.content.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["alpha", "bravo"]);
        assert_eq!(by_title.total_elements, 3);

        let newest_first = desk
            .list(&ListQuery {
                page: 2,
                size: 2,
                order_by: SortField::CreatedAt,
                order: SortOrder::Desc,
            })
            .unwrap();
        let titles: Vec<_> = newest_first.content.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["charlie"]);

        assert!(desk.list(&ListQuery { page: 0, ..ListQuery::default() }).is_err());
    }

    #[test]
    fn sessions_open_once_at_a_time() {
        let clock = ManualClock::new().install();
        let (mut desk, ids) = desk_with(&["budget"], &clock);

        let first = desk.start_session(ids[0], None).unwrap();
        assert_eq!(first.end_time - first.start_time, 60_000);
        assert!(matches!(
            desk.start_session(ids[0], Some(5)),
            Err(DeskError::Conflict(_))
        ));
        assert!(matches!(
            desk.start_session(Uuid::new_v4(), None),
            Err(DeskError::NotFound(_))
        ));

        clock.advance(Duration::from_secs(60));
        let second = desk.start_session(ids[0], Some(5)).unwrap();

        let page = desk.list(&ListQuery::default()).unwrap();
        assert_eq!(page.content[0].session_id, Some(second.id));
    }

    #[test]
    fn votes_need_open_session_and_unique_cpf() {
        let clock = ManualClock::new().install();
        let (mut desk, ids) = desk_with(&["budget"], &clock);
        let topic = ids[0];

        assert!(matches!(
            desk.vote(topic, "123.456.789-09", true),
            Err(DeskError::NotFound(_))
        ));

        desk.start_session(topic, None).unwrap();
        let vote = desk.vote(topic, "123.456.789-09", true).unwrap();
        assert_eq!(vote.cpf, "12345678909");

        assert!(matches!(
            desk.vote(topic, "12345678909", false),
            Err(DeskError::Conflict(_))
        ));
        assert!(matches!(desk.vote(topic, "123", false), Err(DeskError::Invalid(_))));

        clock.advance(Duration::from_secs(60));
        assert!(matches!(
            desk.vote(topic, "98765432100", false),
            Err(DeskError::NotFound(_))
        ));
    }

    #[test]
    fn cpf_check_digits_are_enforced() {
        let clock = ManualClock::new().install();
        let (mut desk, ids) = desk_with(&["budget"], &clock);
        desk.start_session(ids[0], None).unwrap();

        for bad in ["123.456.789-00", "123.456.789-19", "111.111.111-11", "000.000.000-00"] {
            let err = desk.vote(ids[0], bad, true).unwrap_err();
            assert_eq!(err.status(), 400, "{bad}");
        }
        for good in ["111.444.777-35", "529.982.247-25", "987.654.321-00"] {
            desk.vote(ids[0], good, true).unwrap();
        }
        assert_eq!(desk.results(ids[0]).unwrap().favorable_votes, 3);
    }

    #[test]
    fn votes_can_address_the_session_directly() {
        let clock = ManualClock::new().install();
        let (mut desk, ids) = desk_with(&["budget", "bylaws"], &clock);

        let session = desk.start_session(ids[1], Some(2)).unwrap();
        let vote = desk.vote_in_session(session.id, "390.533.447-05", false).unwrap();
        assert_eq!(vote.topic_id, ids[1]);
        assert_eq!(vote.session_id, session.id);

        // one vote per topic, whichever way it was addressed
        assert!(matches!(
            desk.vote(ids[1], "39053344705", true),
            Err(DeskError::Conflict(_))
        ));
        assert!(matches!(
            desk.vote_in_session(Uuid::new_v4(), "935.411.347-80", true),
            Err(DeskError::NotFound(_))
        ));

        clock.advance(Duration::from_secs(120));
        assert!(matches!(
            desk.vote_in_session(session.id, "935.411.347-80", true),
            Err(DeskError::NotFound(_))
        ));
        assert_eq!(desk.results(ids[1]).unwrap().against_votes, 1);
        assert_eq!(desk.results(ids[0]).unwrap().voting_sessions_votes.len(), 0);
    }

    #[test]
    fn results_report_final_outcome_only_after_sessions_close() {
        let clock = ManualClock::new().install();
        let (mut desk, ids) = desk_with(&["budget"], &clock);
        let topic = ids[0];

        let empty = desk.results(topic).unwrap();
        assert_eq!(empty.current_result, None);
        assert_eq!(empty.current_result_text, "No votes so far");
        assert_eq!(empty.final_result_text, "Voting sessions are still in progress");

        desk.start_session(topic, None).unwrap();
        desk.vote(topic, "11144477735", true).unwrap();
        desk.vote(topic, "52998224725", true).unwrap();
        desk.vote(topic, "16899535009", false).unwrap();

        let open = desk.results(topic).unwrap();
        assert_eq!((open.favorable_votes, open.against_votes), (2, 1));
        assert_eq!(open.current_result, Some(VoteOutcome::Favorable));
        assert_eq!(open.final_result, None);
        assert_eq!(open.current_result_text, "Majority of votes FAVORABLE so far");
        assert_eq!(open.voting_sessions_votes[0].status, SessionStatus::Open);

        clock.advance(Duration::from_secs(61));
        let closed = desk.results(topic).unwrap();
        assert_eq!(closed.final_result, Some(VoteOutcome::Favorable));
        assert_eq!(closed.final_result_text, "Majority of votes FAVORABLE");
        assert_eq!(closed.voting_sessions_votes[0].status, SessionStatus::Finished);
    }
}
