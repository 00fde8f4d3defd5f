//! Session data records and push-event folding.
//!
//! DESIGN
//! ======
//! The session service owns all audience data. The engine keeps a local
//! [`SessionSnapshot`] that is replaced by REST snapshots and patched by push
//! events (`payload.snapshot` replaces, `payload.{session,question,poll,
//! word_cloud,prompt}` upserts by id). Unknown event types and payloads that
//! fail to decode are ignored; the next snapshot heals any drift.
//!
//! Records are decoded leniently: unknown status strings map to `Other`,
//! negative vote counts clamp to zero, missing lists default to empty.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

fn votes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() || raw <= 0.0 {
        return Ok(0);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let votes = raw.min(f64::from(u32::MAX)).floor() as u32;
    Ok(votes)
}

// =============================================================================
// STATUSES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Ended,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QnaMode {
    /// Unprompted audience questions.
    #[default]
    Audience,
    /// Answers to a host-chosen prompt.
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Pending,
    Approved,
    Hidden,
    #[serde(other)]
    Other,
}

/// Lifecycle of polls, word clouds and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Open,
    #[default]
    Closed,
    #[serde(other)]
    Other,
}

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub qna_open: bool,
    #[serde(default)]
    pub qna_mode: QnaMode,
    #[serde(default)]
    pub qna_prompt: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub join_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    /// Set when the question answers a prompt.
    #[serde(default)]
    pub prompt_id: Option<String>,
    pub text: String,
    pub status: QuestionStatus,
    #[serde(default, deserialize_with = "votes")]
    pub votes: u32,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub label: String,
    #[serde(default, deserialize_with = "votes")]
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCloudWord {
    pub id: String,
    pub label: String,
    #[serde(default, deserialize_with = "votes")]
    pub votes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCloud {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub words: Vec<WordCloudWord>,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaPrompt {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    pub prompt: String,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub created_at: String,
}

/// Everything the engine renders for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: Session,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub polls: Vec<Poll>,
    #[serde(default)]
    pub prompts: Vec<QnaPrompt>,
    #[serde(default)]
    pub word_clouds: Vec<WordCloud>,
}

/// One message from the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub ts: Option<String>,
}

// =============================================================================
// RESOURCES
// =============================================================================

/// Records addressable by id.
pub trait Keyed {
    fn id(&self) -> &str;
}

/// Polls, clouds and prompts: things a widget can be bound to.
pub trait Resource: Keyed {
    fn status(&self) -> ResourceStatus;
    fn created_at(&self) -> &str;
}

macro_rules! keyed {
    ($($ty:ty),*) => {$(
        impl Keyed for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        }
    )*};
}

keyed!(Question, Poll, WordCloud, QnaPrompt);

macro_rules! resource {
    ($($ty:ty),*) => {$(
        impl Resource for $ty {
            fn status(&self) -> ResourceStatus {
                self.status
            }

            fn created_at(&self) -> &str {
                &self.created_at
            }
        }
    )*};
}

resource!(Poll, WordCloud, QnaPrompt);

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

/// The open resource, else the newest by `created_at`.
///
/// Timestamps that fail to parse never win a comparison, so the earlier item
/// in the list is kept.
#[must_use]
pub fn pick_resource<T: Resource>(items: &[T]) -> Option<&T> {
    if let Some(open) = items.iter().find(|item| item.status() == ResourceStatus::Open) {
        return Some(open);
    }
    let (first, rest) = items.split_first()?;
    let newest = rest.iter().fold(first, |best, item| {
        match (parse_timestamp(item.created_at()), parse_timestamp(best.created_at())) {
            (Some(candidate), Some(current)) if candidate > current => item,
            _ => best,
        }
    });
    Some(newest)
}

#[must_use]
pub fn find_by_id<'a, T: Keyed>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

// =============================================================================
// Q&A VIEW
// =============================================================================

/// Questions a Q&A or discussion panel shows for one binding.
#[derive(Debug, Clone, PartialEq)]
pub struct QnaView<'a> {
    pub mode: QnaMode,
    pub prompt_id: Option<&'a str>,
    /// The bound prompt, `None` if unbound or deleted.
    pub prompt: Option<&'a QnaPrompt>,
    pub pending: usize,
    /// Approved questions in display order.
    pub approved: Vec<&'a Question>,
}

impl QnaView<'_> {
    /// A prompt id is bound but no longer exists in the session.
    #[must_use]
    pub fn prompt_missing(&self) -> bool {
        self.prompt_id.is_some() && self.prompt.is_none()
    }
}

impl SessionSnapshot {
    /// Select questions for a panel.
    ///
    /// Bound to a prompt: that prompt's answers, sorted by votes. Unbound:
    /// unprompted questions in arrival order, or nothing when
    /// `audience_when_unbound` is false (discussion panels).
    #[must_use]
    pub fn qna_view<'a>(&'a self, prompt_id: Option<&'a str>, audience_when_unbound: bool) -> QnaView<'a> {
        let filtered: Vec<&Question> = match prompt_id {
            Some(id) => self.questions.iter().filter(|q| q.prompt_id.as_deref() == Some(id)).collect(),
            None if audience_when_unbound => self.questions.iter().filter(|q| q.prompt_id.is_none()).collect(),
            None => Vec::new(),
        };
        let mode = if prompt_id.is_some() { QnaMode::Prompt } else { QnaMode::Audience };
        let pending = filtered.iter().filter(|q| q.status == QuestionStatus::Pending).count();
        let mut approved: Vec<&Question> =
            filtered.into_iter().filter(|q| q.status == QuestionStatus::Approved).collect();
        if mode == QnaMode::Prompt {
            approved.sort_by(|a, b| b.votes.cmp(&a.votes));
        }
        QnaView {
            mode,
            prompt_id,
            prompt: prompt_id.and_then(|id| find_by_id(&self.prompts, id)),
            pending,
            approved,
        }
    }

    // =========================================================================
    // EVENT FOLDING
    // =========================================================================

    /// Fold one push event into the snapshot. Returns true when anything changed.
    pub fn apply_event(&mut self, event: &SessionEvent) -> bool {
        let Some(payload) = event.payload.as_object() else {
            return false;
        };

        if let Some(raw) = payload.get("snapshot") {
            return match serde_json::from_value::<SessionSnapshot>(raw.clone()) {
                Ok(snapshot) => {
                    *self = snapshot;
                    true
                }
                Err(err) => {
                    debug!(event = %event.event_type, error = %err, "snapshot payload did not decode");
                    false
                }
            };
        }

        let mut changed = false;
        if let Some(session) = decode::<Session>(event, payload.get("session")) {
            self.session = session;
            changed = true;
        }
        if let Some(question) = decode::<Question>(event, payload.get("question")) {
            upsert(&mut self.questions, question);
            changed = true;
        }
        if let Some(poll) = decode::<Poll>(event, payload.get("poll")) {
            upsert(&mut self.polls, poll);
            changed = true;
        }
        if let Some(cloud) = decode::<WordCloud>(event, payload.get("word_cloud")) {
            upsert(&mut self.word_clouds, cloud);
            changed = true;
        }
        if let Some(prompt) = decode::<QnaPrompt>(event, payload.get("prompt")) {
            upsert(&mut self.prompts, prompt);
            changed = true;
        }
        changed
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &SessionEvent, raw: Option<&Value>) -> Option<T> {
    let raw = raw?;
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(event = %event.event_type, error = %err, "event payload did not decode");
            None
        }
    }
}
