//! Core of a personal study-progress tracker: course documents, per-topic
//! progress records, logged study sessions and their derived statistics,
//! persisted synchronously to a local per-user key/value store.
//!
//! The presentation layer is expected to own a [`store::CourseStore`], call
//! its mutation operations and re-read state after each change; every
//! mutation is mirrored to storage before it returns.

pub mod core;
pub mod import;
pub mod persistence;
pub mod stats;
pub mod store;
pub mod timer;

pub use crate::core::{ topic_key, Chapter, Course, Session, StudylogError, Topic, TopicState };
pub use crate::import::{ parse_course, sample_course };
pub use crate::persistence::{ FileStore, KeyValueStore, MemoryStore };
pub use crate::store::{ CourseStore, DoneExtras };
pub use crate::timer::{ SessionOutcome, TimerSnapshot };
