pub mod errors;
pub mod models;

pub use errors::StudylogError;
pub use models::{ topic_key, Chapter, Course, Session, Topic, TopicState };
