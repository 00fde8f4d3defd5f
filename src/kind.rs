//! Widget kinds and their fixed tag vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four widget kinds the engine can insert and reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Live Q&A panel fed by approved audience questions.
    Qna,
    /// Open-ended prompt panel fed by audience answers.
    Discussion,
    Poll,
    WordCloud,
}

/// Page and shape tag keys owned by one widget kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagKeys {
    /// Marker tag placed on the page and on every shape of the widget.
    pub marker: &'static str,
    pub session: &'static str,
    pub manifest: &'static str,
    pub pending: &'static str,
    pub style: &'static str,
    /// Bound resource (prompt, poll or cloud id).
    pub resource: &'static str,
    /// Word-cloud animation state; `None` for kinds that do not animate.
    pub anim_state: Option<&'static str>,
    /// Keys left behind by older builds that should be cleared with the binding.
    pub legacy: &'static [&'static str],
}

const QNA_TAGS: TagKeys = TagKeys {
    marker: "PrezoWidget",
    session: "PrezoWidgetSessionId",
    manifest: "PrezoWidgetShapeIds",
    pending: "PrezoWidgetPending",
    style: "PrezoWidgetStyle",
    resource: "PrezoWidgetPromptId",
    anim_state: None,
    legacy: &["PrezoWidgetQnaMode", "PrezoWidgetQnaPrompt"],
};

const DISCUSSION_TAGS: TagKeys = TagKeys {
    marker: "PrezoDiscussionWidget",
    session: "PrezoDiscussionWidgetSessionId",
    manifest: "PrezoDiscussionWidgetShapeIds",
    pending: "PrezoDiscussionWidgetPending",
    style: "PrezoDiscussionWidgetStyle",
    resource: "PrezoDiscussionWidgetPromptId",
    anim_state: None,
    legacy: &[],
};

const POLL_TAGS: TagKeys = TagKeys {
    marker: "PrezoPollWidget",
    session: "PrezoPollWidgetSessionId",
    manifest: "PrezoPollWidgetShapeIds",
    pending: "PrezoPollWidgetPending",
    style: "PrezoPollWidgetStyle",
    resource: "PrezoPollWidgetPollId",
    anim_state: None,
    legacy: &[],
};

const WORD_CLOUD_TAGS: TagKeys = TagKeys {
    marker: "PrezoWordCloudWidget",
    session: "PrezoWordCloudSessionId",
    manifest: "PrezoWordCloudShapeIds",
    pending: "PrezoWordCloudPending",
    style: "PrezoWordCloudStyle",
    resource: "PrezoWordCloudCloudId",
    anim_state: Some("PrezoWordCloudAnimState"),
    legacy: &[],
};

impl WidgetKind {
    pub const ALL: [WidgetKind; 4] = [Self::Qna, Self::Discussion, Self::Poll, Self::WordCloud];

    #[must_use]
    pub fn tags(self) -> &'static TagKeys {
        match self {
            Self::Qna => &QNA_TAGS,
            Self::Discussion => &DISCUSSION_TAGS,
            Self::Poll => &POLL_TAGS,
            Self::WordCloud => &WORD_CLOUD_TAGS,
        }
    }

    /// Human-readable name used in errors and log lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Qna => "Q&A",
            Self::Discussion => "discussion",
            Self::Poll => "poll",
            Self::WordCloud => "word cloud",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qna => "qna",
            Self::Discussion => "discussion",
            Self::Poll => "poll",
            Self::WordCloud => "word_cloud",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown widget kind: {0}")]
pub struct UnknownWidgetKind(pub String);

impl FromStr for WidgetKind {
    type Err = UnknownWidgetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "qna" | "q&a" => Ok(Self::Qna),
            "discussion" => Ok(Self::Discussion),
            "poll" => Ok(Self::Poll),
            "word_cloud" | "wordcloud" => Ok(Self::WordCloud),
            other => Err(UnknownWidgetKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("poll".parse::<WidgetKind>(), Ok(WidgetKind::Poll));
        assert_eq!("word-cloud".parse::<WidgetKind>(), Ok(WidgetKind::WordCloud));
        assert_eq!("Q&A".parse::<WidgetKind>(), Ok(WidgetKind::Qna));
        assert!("slider".parse::<WidgetKind>().is_err());
    }

    #[test]
    fn tag_keys_are_disjoint_between_kinds() {
        let mut seen = std::collections::HashSet::new();
        for kind in WidgetKind::ALL {
            let keys = kind.tags();
            for key in [keys.marker, keys.session, keys.manifest, keys.pending, keys.style, keys.resource] {
                assert!(seen.insert(key), "duplicate tag key {key}");
            }
        }
    }

    #[test]
    fn only_word_cloud_animates() {
        for kind in WidgetKind::ALL {
            assert_eq!(kind.tags().anim_state.is_some(), kind == WidgetKind::WordCloud);
        }
    }
}
