use chrono::Utc;
use uuid::Uuid;

use crate::core::{ Chapter, Course, StudylogError, Topic };

/// Parses a course document pasted or imported by the user.
///
/// The document must carry a non-empty `name` and a `chapters` array;
/// anything else is rejected before deserialization so the caller gets a
/// user-presentable message instead of a serde trace. Documents without an
/// `id` get a generated one, and an import timestamp is stamped on.
pub fn parse_course(json: &str) -> Result<Course, StudylogError> {
    let document: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| StudylogError::InvalidCourse(format!("not valid JSON: {}", e)))?;

    validate_document(&document)?;

    let mut course: Course = serde_json::from_value(document)
        .map_err(|e| StudylogError::InvalidCourse(e.to_string()))?;

    if course.id.is_empty() {
        course.id = Uuid::new_v4().to_string();
    }
    if course.created_at.is_none() {
        course.created_at = Some(Utc::now());
    }
    Ok(course)
}

fn validate_document(document: &serde_json::Value) -> Result<(), StudylogError> {
    let name = document.get("name").and_then(|v| v.as_str()).unwrap_or("");
    if name.trim().is_empty() {
        return Err(StudylogError::InvalidCourse("course name is required".to_string()));
    }

    if !document.get("chapters").map(|v| v.is_array()).unwrap_or(false) {
        return Err(StudylogError::InvalidCourse("chapters must be an array".to_string()));
    }

    Ok(())
}

/// The built-in demo course offered before the user has imported anything.
pub fn sample_course() -> Course {
    Course {
        id: "cpp".to_string(),
        name: "C++ Fundamentals".to_string(),
        description: "Learn the C++ language step by step.".to_string(),
        chapters: vec![Chapter {
            id: Some("intro".to_string()),
            title: "Introduction".to_string(),
            topics: vec![
                Topic::Detailed {
                    id: Some("setup".to_string()),
                    title: "Installation".to_string(),
                    description: Some("Compilers and toolchains".to_string()),
                },
                Topic::Detailed {
                    id: Some("syntax".to_string()),
                    title: "Syntax".to_string(),
                    description: Some("A first program".to_string()),
                },
            ],
        }],
        sessions: Vec::new(),
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_detailed_topics() {
        let course = parse_course(
            r#"{
                "id": "js1",
                "name": "JS",
                "chapters": [
                    { "title": "Intro", "topics": ["Vars", { "id": "fn", "title": "Functions" }] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(course.id, "js1");
        let topics = &course.chapters[0].topics;
        assert_eq!(topics[0].title(), "Vars");
        assert_eq!(topics[0].id(), None);
        assert_eq!(topics[1].title(), "Functions");
        assert_eq!(topics[1].id(), Some("fn"));
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = parse_course(r#"{ "chapters": [] }"#).unwrap_err();
        assert!(matches!(err, StudylogError::InvalidCourse(_)));
    }

    #[test]
    fn non_array_chapters_is_rejected() {
        let err = parse_course(r#"{ "name": "X", "chapters": "nope" }"#).unwrap_err();
        assert!(matches!(err, StudylogError::InvalidCourse(_)));

        let err = parse_course(r#"{ "name": "X" }"#).unwrap_err();
        assert!(matches!(err, StudylogError::InvalidCourse(_)));
    }

    #[test]
    fn generates_id_and_import_timestamp() {
        let course = parse_course(r#"{ "name": "JS", "chapters": [] }"#).unwrap();
        assert!(!course.id.is_empty());
        assert!(course.created_at.is_some());

        let other = parse_course(r#"{ "name": "JS", "chapters": [] }"#).unwrap();
        assert_ne!(course.id, other.id);
    }

    #[test]
    fn keeps_caller_supplied_id() {
        let course = parse_course(r#"{ "id": "mine", "name": "JS", "chapters": [] }"#).unwrap();
        assert_eq!(course.id, "mine");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let course = parse_course(
            r#"{
                "name": "JS",
                "chapters": [
                    { "title": "Intro", "topics": [{ "title": "Vars", "done": false }] }
                ],
                "author": "someone"
            }"#,
        )
        .unwrap();
        assert_eq!(course.chapters[0].topics[0].title(), "Vars");
    }

    #[test]
    fn sample_course_is_well_formed() {
        let course = sample_course();
        assert!(!course.name.is_empty());
        assert_eq!(course.topic_count(), 2);
    }
}
