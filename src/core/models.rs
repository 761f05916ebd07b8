use chrono::{DateTime, Utc};
use serde::{
    Deserialize,
    Serialize,
};

/// A curriculum tree (chapters -> topics) plus the study sessions logged
/// against it. Matches the JSON document format used for import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn topic_count(&self) -> usize {
        self.chapters.iter().map(|chapter| chapter.topics.len()).sum()
    }

    pub fn topic(&self, chapter_index: usize, topic_index: usize) -> Option<&Topic> {
        self.chapters.get(chapter_index).and_then(|chapter| chapter.topics.get(topic_index))
    }

    /// Looks a topic up by its own id and returns (chapter_index, topic_index).
    /// Only detailed topics carry ids, so plain-title topics never match.
    pub fn find_topic(&self, topic_id: &str) -> Option<(usize, usize)> {
        for (ci, chapter) in self.chapters.iter().enumerate() {
            for (ti, topic) in chapter.topics.iter().enumerate() {
                if topic.id() == Some(topic_id) {
                    return Some((ci, ti));
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub topics: Vec<Topic>,
}

/// A topic is stored either as a bare title string or as a full object,
/// depending on how the course document was authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Topic {
    Plain(String),
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl Topic {
    pub fn title(&self) -> &str {
        match self {
            Topic::Plain(title) => title,
            Topic::Detailed { title, .. } => title,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Topic::Plain(_) => None,
            Topic::Detailed { id, .. } => id.as_deref(),
        }
    }
}

/// A logged study activity. Either tied to a catalog topic (`topic_id`) or a
/// user-defined one (`custom_topic`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub date: DateTime<Utc>,
    pub minutes: u32,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub custom_topic: Option<String>,
    #[serde(default)]
    pub note: String,
    pub rating: u8,
}

/// Per-topic progress record, keyed by [`topic_key`]. Created lazily on the
/// first mutation and kept around even after a topic is un-marked.
///
/// Invariant: `done == false` implies `last_done_date`, `rating` and `note`
/// are absent and `minutes` is 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicState {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub last_done_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub needs_repeat: bool,
}

/// Composite key identifying a progress record.
///
/// Identity is positional (chapter index, topic index) rather than the
/// topic's own id, so reordering a course's chapters or topics detaches the
/// recorded progress. Persisted data depends on this exact format.
pub fn topic_key(course_id: &str, chapter_index: usize, topic_index: usize) -> String {
    format!("{}-c{}-t{}", course_id, chapter_index, topic_index)
}
