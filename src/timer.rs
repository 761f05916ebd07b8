//! Persisted snapshot of the study timer. Kept directly against the
//! key/value store, outside the course state manager, and tied to one
//! course: switching the active course discards the snapshot.

use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::warn;

use crate::{
    core::{ Session, StudylogError },
    persistence::KeyValueStore,
    store::{ CourseStore, DoneExtras },
};

pub const TIMER_STATE_KEY: &str = "studyTimerState";
pub const DEFAULT_DURATION_MINUTES: u32 = 25;

/// What finishing a timer run did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// A catalog topic was marked done.
    TopicCompleted { chapter_index: usize, topic_index: usize, minutes: u32 },
    /// A custom activity was appended to the course's session log.
    SessionLogged { title: String, minutes: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub course_id: String,
    pub chapter_index: usize,
    /// `None` means the user is timing a custom topic instead of a catalog one.
    pub topic_index: Option<usize>,
    #[serde(default)]
    pub custom_topic: String,
    pub duration_minutes: u32,
    #[serde(rename = "timeLeft")]
    pub time_left_secs: u32,
    pub is_running: bool,
}

impl TimerSnapshot {
    pub fn fresh(course_id: &str) -> Self {
        TimerSnapshot {
            course_id: course_id.to_string(),
            chapter_index: 0,
            topic_index: None,
            custom_topic: String::new(),
            duration_minutes: DEFAULT_DURATION_MINUTES,
            time_left_secs: DEFAULT_DURATION_MINUTES * 60,
            is_running: false,
        }
    }

    /// Restores the stored snapshot if it belongs to the given course;
    /// a missing, malformed or stale snapshot yields a fresh one.
    pub fn load(storage: &dyn KeyValueStore, course_id: &str) -> Self {
        let raw = match storage.get(TIMER_STATE_KEY) {
            Some(raw) => raw,
            None => return Self::fresh(course_id),
        };

        match serde_json::from_str::<TimerSnapshot>(&raw) {
            Ok(snapshot) if snapshot.course_id == course_id => snapshot,
            Ok(_) => Self::fresh(course_id),
            Err(e) => {
                warn!("failed to parse stored timer state: {}. Resetting.", e);
                Self::fresh(course_id)
            }
        }
    }

    pub fn save(&self, storage: &mut dyn KeyValueStore) -> Result<(), StudylogError> {
        let json = serde_json::to_string(self)?;
        storage.set(TIMER_STATE_KEY, &json)
    }

    pub fn clear(storage: &mut dyn KeyValueStore) -> Result<(), StudylogError> {
        storage.remove(TIMER_STATE_KEY)
    }

    /// Advances the countdown by one second. Stops at zero.
    pub fn tick(&mut self) {
        if !self.is_running {
            return;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        if self.time_left_secs == 0 {
            self.is_running = false;
        }
    }

    pub fn set_duration(&mut self, minutes: u32) {
        let minutes = minutes.max(1);
        self.duration_minutes = minutes;
        self.time_left_secs = minutes * 60;
    }

    /// Minutes spent so far, rounded up to the started minute.
    pub fn minutes_spent(&self) -> u32 {
        let spent =
            f64::from(self.duration_minutes) - f64::from(self.time_left_secs) / 60.0;
        spent.ceil().max(0.0) as u32
    }

    /// Ends the run: a catalog topic is marked done now (with the entered
    /// note and a default rating), a custom topic is appended to the session
    /// log. The snapshot resets afterwards and is persisted through the
    /// store's backing storage.
    pub fn finish(&mut self, store: &mut CourseStore) -> Result<SessionOutcome, StudylogError> {
        self.is_running = false;
        let minutes = self.minutes_spent();

        let outcome = match self.topic_index {
            Some(topic_index) => {
                store.set_topic_done_with_date(
                    self.chapter_index,
                    topic_index,
                    true,
                    DoneExtras { date: Some(Utc::now()), ..Default::default() },
                )?;
                store.set_topic_note(self.chapter_index, topic_index, self.custom_topic.clone())?;
                store.set_topic_rating(self.chapter_index, topic_index, 3)?;
                SessionOutcome::TopicCompleted {
                    chapter_index: self.chapter_index,
                    topic_index,
                    minutes,
                }
            }
            None => {
                let title = if self.custom_topic.trim().is_empty() {
                    "(untitled session)".to_string()
                } else {
                    self.custom_topic.trim().to_string()
                };
                let session = Session {
                    date: Utc::now(),
                    minutes,
                    topic_id: None,
                    custom_topic: Some(title.clone()),
                    note: String::new(),
                    rating: 3,
                };

                let mut sessions =
                    store.active_course().map(|c| c.sessions.clone()).unwrap_or_default();
                sessions.push(session);
                store.update_sessions(sessions)?;
                SessionOutcome::SessionLogged { title, minutes }
            }
        };

        *self = Self::fresh(&self.course_id);
        self.save(store.storage_mut())?;
        Ok(outcome)
    }
}
