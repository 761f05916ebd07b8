use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudylogError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid course document: {0}")]
    InvalidCourse(String),

    #[error("A course with id '{0}' already exists")]
    DuplicateCourseId(String),

    #[error("StudylogError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for StudylogError {
    fn from(error: std::io::Error) -> Self {
        StudylogError::Io(Box::new(error))
    }
}
