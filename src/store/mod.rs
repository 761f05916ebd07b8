use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{
    core::{ topic_key, Course, Session, StudylogError, TopicState },
    persistence::{ load_json_or_default, save_json, KeyValueStore },
};


pub const ACTIVE_COURSE_KEY: &str = "activeCourse";
pub const USER_COURSES_KEY: &str = "userCourses";
pub const PUBLIC_SUBMITS_KEY: &str = "publicSubmits";
pub const TOPIC_STATES_KEY: &str = "topicStates";

/// Optional overrides for [`CourseStore::set_topic_done_with_date`]. Any
/// field left `None` falls back to the previously stored value, then to the
/// defaults (now / 0 minutes / rating 3 / empty note).
#[derive(Debug, Clone, Default)]
pub struct DoneExtras {
    pub date: Option<DateTime<Utc>>,
    pub minutes: Option<u32>,
    pub rating: Option<u8>,
    pub note: Option<String>,
}

type Subscriber = Box<dyn Fn()>;

/// Owns the in-memory course and progress state and mirrors every mutation
/// to the injected [`KeyValueStore`] before returning. Subscribers are
/// notified after each mutation so views can re-render.
pub struct CourseStore {
    storage: Box<dyn KeyValueStore>,
    active_course: Option<Course>,
    user_courses: Vec<Course>,
    public_submits: Vec<Course>,
    topic_states: HashMap<String, TopicState>,
    selected_note_topic: Option<(usize, usize)>,
    subscribers: Vec<Subscriber>,
}

impl CourseStore {
    /// Loads all persisted slices from `storage`. Unreadable values degrade
    /// to empty defaults. An active course that is no longer among the user
    /// courses is discarded and its persisted record erased, so the active
    /// pointer never dangles.
    pub fn load(mut storage: Box<dyn KeyValueStore>) -> Self {
        let user_courses: Vec<Course> = load_json_or_default(storage.as_ref(), USER_COURSES_KEY);
        let public_submits: Vec<Course> =
            load_json_or_default(storage.as_ref(), PUBLIC_SUBMITS_KEY);
        let topic_states: HashMap<String, TopicState> =
            load_json_or_default(storage.as_ref(), TOPIC_STATES_KEY);
        let mut active_course: Option<Course> =
            load_json_or_default(storage.as_ref(), ACTIVE_COURSE_KEY);

        if let Some(course) = &active_course {
            if !user_courses.iter().any(|c| c.id == course.id) {
                warn!("active course '{}' is not among the stored courses, discarding", course.id);
                active_course = None;
                let _ = storage.remove(ACTIVE_COURSE_KEY);
            }
        }

        CourseStore {
            storage,
            active_course,
            user_courses,
            public_submits,
            topic_states,
            selected_note_topic: None,
            subscribers: Vec::new(),
        }
    }

    pub fn active_course(&self) -> Option<&Course> {
        self.active_course.as_ref()
    }

    pub fn user_courses(&self) -> &[Course] {
        &self.user_courses
    }

    pub fn public_submits(&self) -> &[Course] {
        &self.public_submits
    }

    pub fn topic_states(&self) -> &HashMap<String, TopicState> {
        &self.topic_states
    }

    /// Progress record for a topic of the active course, if any exists.
    pub fn topic_state(&self, chapter_index: usize, topic_index: usize) -> Option<&TopicState> {
        let key = self.active_topic_key(chapter_index, topic_index)?;
        self.topic_states.get(&key)
    }

    pub fn selected_note_topic(&self) -> Option<(usize, usize)> {
        self.selected_note_topic
    }

    /// Direct access to the backing store, for state kept outside the
    /// manager (the study-timer snapshot).
    pub fn storage_mut(&mut self) -> &mut dyn KeyValueStore {
        self.storage.as_mut()
    }

    /// Registers a callback invoked after every mutation.
    pub fn subscribe(&mut self, subscriber: impl Fn() + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Replaces the active course unconditionally and persists the full
    /// snapshot. No existence check against the user courses.
    pub fn set_active_course(&mut self, course: Course) -> Result<(), StudylogError> {
        self.active_course = Some(course);
        self.persist_active()?;
        self.notify();
        Ok(())
    }

    pub fn add_user_course(&mut self, course: Course) -> Result<(), StudylogError> {
        if course.name.trim().is_empty() {
            return Err(StudylogError::InvalidCourse("course name is required".to_string()));
        }
        if self.user_courses.iter().any(|c| c.id == course.id) {
            return Err(StudylogError::DuplicateCourseId(course.id));
        }

        self.user_courses.push(course);
        self.persist_user_courses()?;
        self.notify();
        Ok(())
    }

    /// Removes the course; if it was active, the active pointer is cleared
    /// and its persisted record erased.
    pub fn remove_user_course(&mut self, id: &str) -> Result<(), StudylogError> {
        self.user_courses.retain(|c| c.id != id);

        if self.active_course.as_ref().is_some_and(|c| c.id == id) {
            self.active_course = None;
            self.storage.remove(ACTIVE_COURSE_KEY)?;
        }

        self.persist_user_courses()?;
        self.notify();
        Ok(())
    }

    /// Queues a course for moderation. Purely local bookkeeping, no dedup.
    pub fn add_public_submit(&mut self, course: Course) -> Result<(), StudylogError> {
        self.public_submits.push(course);
        self.persist_public_submits()?;
        self.notify();
        Ok(())
    }

    /// Marks a topic of the active course done or not done.
    ///
    /// Marking done stamps `last_done_date` (from `extras` or now) and fills
    /// minutes/rating/note from `extras`, the prior record, or the defaults.
    /// Un-marking clears date, rating and note and resets minutes to 0.
    /// Without an active course this is a silent no-op.
    pub fn set_topic_done_with_date(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
        done: bool,
        extras: DoneExtras,
    ) -> Result<(), StudylogError> {
        let key = match self.active_topic_key(chapter_index, topic_index) {
            Some(key) => key,
            None => return Ok(()),
        };

        let state = self.topic_states.entry(key).or_default();
        state.done = done;
        if done {
            state.last_done_date = Some(extras.date.unwrap_or_else(Utc::now));
            if let Some(minutes) = extras.minutes {
                state.minutes = minutes;
            }
            state.rating = Some(extras.rating.or(state.rating).unwrap_or(3));
            state.note = Some(extras.note.or_else(|| state.note.take()).unwrap_or_default());
        } else {
            state.last_done_date = None;
            state.minutes = 0;
            state.rating = None;
            state.note = None;
        }

        self.persist_topic_states()?;
        self.notify();
        Ok(())
    }

    pub fn set_topic_note(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
        note: String,
    ) -> Result<(), StudylogError> {
        self.upsert_topic_state(chapter_index, topic_index, |state| state.note = Some(note))
    }

    pub fn set_topic_rating(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
        rating: u8,
    ) -> Result<(), StudylogError> {
        self.upsert_topic_state(chapter_index, topic_index, |state| state.rating = Some(rating))
    }

    pub fn set_topic_minutes(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
        minutes: u32,
    ) -> Result<(), StudylogError> {
        self.upsert_topic_state(chapter_index, topic_index, |state| state.minutes = minutes)
    }

    pub fn set_topic_needs_repeat(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
        needs_repeat: bool,
    ) -> Result<(), StudylogError> {
        self.upsert_topic_state(chapter_index, topic_index, |state| {
            state.needs_repeat = needs_repeat
        })
    }

    /// Flags a topic for the repeat queue.
    pub fn mark_topic_for_repeat(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
    ) -> Result<(), StudylogError> {
        self.set_topic_needs_repeat(chapter_index, topic_index, true)
    }

    /// Replaces the active course's session log wholesale and persists the
    /// full course. The copy kept under `userCourses` is left untouched.
    pub fn update_sessions(&mut self, sessions: Vec<Session>) -> Result<(), StudylogError> {
        match self.active_course.as_mut() {
            Some(course) => course.sessions = sessions,
            None => return Ok(()),
        }

        self.persist_active()?;
        self.notify();
        Ok(())
    }

    pub fn set_selected_note_topic(&mut self, chapter_index: usize, topic_index: usize) {
        self.selected_note_topic = Some((chapter_index, topic_index));
        self.notify();
    }

    pub fn clear_selected_note_topic(&mut self) {
        self.selected_note_topic = None;
        self.notify();
    }

    /// Resets every state slice and erases all four persisted keys.
    pub fn clear_all(&mut self) -> Result<(), StudylogError> {
        self.user_courses.clear();
        self.public_submits.clear();
        self.active_course = None;
        self.topic_states.clear();
        self.selected_note_topic = None;

        self.storage.remove(USER_COURSES_KEY)?;
        self.storage.remove(PUBLIC_SUBMITS_KEY)?;
        self.storage.remove(ACTIVE_COURSE_KEY)?;
        self.storage.remove(TOPIC_STATES_KEY)?;
        self.notify();
        Ok(())
    }

    fn active_topic_key(&self, chapter_index: usize, topic_index: usize) -> Option<String> {
        self.active_course
            .as_ref()
            .map(|course| topic_key(&course.id, chapter_index, topic_index))
    }

    fn upsert_topic_state(
        &mut self,
        chapter_index: usize,
        topic_index: usize,
        apply: impl FnOnce(&mut TopicState),
    ) -> Result<(), StudylogError> {
        let key = match self.active_topic_key(chapter_index, topic_index) {
            Some(key) => key,
            None => return Ok(()),
        };

        apply(self.topic_states.entry(key).or_default());
        self.persist_topic_states()?;
        self.notify();
        Ok(())
    }

    fn persist_active(&mut self) -> Result<(), StudylogError> {
        save_json(self.storage.as_mut(), ACTIVE_COURSE_KEY, &self.active_course)
    }

    fn persist_user_courses(&mut self) -> Result<(), StudylogError> {
        save_json(self.storage.as_mut(), USER_COURSES_KEY, &self.user_courses)
    }

    fn persist_public_submits(&mut self) -> Result<(), StudylogError> {
        save_json(self.storage.as_mut(), PUBLIC_SUBMITS_KEY, &self.public_submits)
    }

    fn persist_topic_states(&mut self) -> Result<(), StudylogError> {
        save_json(self.storage.as_mut(), TOPIC_STATES_KEY, &self.topic_states)
    }

    fn notify(&self) {
        for subscriber in &self.subscribers {
            subscriber();
        }
    }
}
