//! Read-only aggregates over a course and its progress records: overall and
//! per-chapter completion, calendar activity, and the repeat queue.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::core::{ topic_key, Course, Session, TopicState };

pub type TopicStates = HashMap<String, TopicState>;

/// Minutes of activity on a single day above which it counts as intense.
pub const INTENSE_DAY_MINUTES: u32 = 40;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseSummary {
    pub total_topics: usize,
    pub done_topics: usize,
    /// Average minutes per done topic, rounded. 0 when nothing is done.
    pub avg_minutes: u32,
    /// Average rating over rated done topics. Absent when none are rated.
    pub avg_rating: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOverview {
    pub title: String,
    pub total_topics: usize,
    pub done_topics: usize,
}

/// One topic row in a derived view (repeat queue, per-day drill-down).
#[derive(Debug, Clone, PartialEq)]
pub struct TopicEntry {
    pub chapter_index: usize,
    pub topic_index: usize,
    pub title: String,
    pub note: String,
    pub rating: u8,
    pub minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Idle,
    Light,
    Intense,
}

pub fn activity_level(minutes: u32) -> ActivityLevel {
    if minutes == 0 {
        ActivityLevel::Idle
    } else if minutes > INTENSE_DAY_MINUTES {
        ActivityLevel::Intense
    } else {
        ActivityLevel::Light
    }
}

pub fn course_summary(course: &Course, states: &TopicStates) -> CourseSummary {
    let mut summary = CourseSummary { total_topics: course.topic_count(), ..Default::default() };

    let mut total_minutes = 0u32;
    let mut total_rating = 0u32;
    let mut rated = 0usize;

    for_each_state(course, states, |_, _, state| {
        if state.done {
            summary.done_topics += 1;
            total_minutes += state.minutes;
            if let Some(rating) = state.rating {
                total_rating += u32::from(rating);
                rated += 1;
            }
        }
    });

    if summary.done_topics > 0 {
        summary.avg_minutes =
            (f64::from(total_minutes) / summary.done_topics as f64).round() as u32;
    }
    if rated > 0 {
        summary.avg_rating = Some(total_rating as f32 / rated as f32);
    }
    summary
}

pub fn chapter_overview(course: &Course, states: &TopicStates) -> Vec<ChapterOverview> {
    course
        .chapters
        .iter()
        .enumerate()
        .map(|(ci, chapter)| {
            let done = chapter
                .topics
                .iter()
                .enumerate()
                .filter(|(ti, _)| is_done(course, states, ci, *ti))
                .count();
            ChapterOverview {
                title: chapter.title.clone(),
                total_topics: chapter.topics.len(),
                done_topics: done,
            }
        })
        .collect()
}

/// Done-percentage of one chapter, rounded to whole percent.
pub fn chapter_progress(course: &Course, states: &TopicStates, chapter_index: usize) -> u32 {
    let total = match course.chapters.get(chapter_index) {
        Some(chapter) => chapter.topics.len(),
        None => return 0,
    };
    if total == 0 {
        return 0;
    }

    let done = (0..total).filter(|ti| is_done(course, states, chapter_index, *ti)).count();
    percent(done, total)
}

/// Done-percentage across the whole course, rounded to whole percent.
pub fn total_progress(course: &Course, states: &TopicStates) -> u32 {
    let total = course.topic_count();
    if total == 0 {
        return 0;
    }

    let mut done = 0usize;
    for_each_state(course, states, |_, _, state| {
        if state.done {
            done += 1;
        }
    });
    percent(done, total)
}

/// Total study minutes per calendar day: logged sessions plus the minutes of
/// topics completed on that day.
pub fn minutes_by_day(course: &Course, states: &TopicStates) -> BTreeMap<NaiveDate, u32> {
    let mut days: BTreeMap<NaiveDate, u32> = BTreeMap::new();

    for session in &course.sessions {
        *days.entry(session.date.date_naive()).or_insert(0) += session.minutes;
    }

    for_each_state(course, states, |_, _, state| {
        if state.done {
            if let Some(date) = state.last_done_date {
                *days.entry(date.date_naive()).or_insert(0) += state.minutes;
            }
        }
    });

    days
}

/// Topics flagged for repetition.
pub fn repeat_topics(course: &Course, states: &TopicStates) -> Vec<TopicEntry> {
    collect_entries(course, states, |state| state.needs_repeat)
}

/// Topics completed on the given day.
pub fn topics_done_on(course: &Course, states: &TopicStates, date: NaiveDate) -> Vec<TopicEntry> {
    collect_entries(course, states, |state| {
        state.done && state.last_done_date.map(|d| d.date_naive()) == Some(date)
    })
}

/// Sessions logged on the given day.
pub fn sessions_on(course: &Course, date: NaiveDate) -> Vec<&Session> {
    course.sessions.iter().filter(|s| s.date.date_naive() == date).collect()
}

fn collect_entries(
    course: &Course,
    states: &TopicStates,
    keep: impl Fn(&TopicState) -> bool,
) -> Vec<TopicEntry> {
    let mut entries = Vec::new();
    for (ci, chapter) in course.chapters.iter().enumerate() {
        for (ti, topic) in chapter.topics.iter().enumerate() {
            let key = topic_key(&course.id, ci, ti);
            if let Some(state) = states.get(&key) {
                if keep(state) {
                    entries.push(TopicEntry {
                        chapter_index: ci,
                        topic_index: ti,
                        title: topic.title().to_string(),
                        note: state.note.clone().unwrap_or_default(),
                        rating: state.rating.unwrap_or(3),
                        minutes: state.minutes,
                    });
                }
            }
        }
    }
    entries
}

fn for_each_state(
    course: &Course,
    states: &TopicStates,
    mut visit: impl FnMut(usize, usize, &TopicState),
) {
    for (ci, chapter) in course.chapters.iter().enumerate() {
        for ti in 0..chapter.topics.len() {
            let key = topic_key(&course.id, ci, ti);
            if let Some(state) = states.get(&key) {
                visit(ci, ti, state);
            }
        }
    }
}

fn is_done(course: &Course, states: &TopicStates, ci: usize, ti: usize) -> bool {
    states.get(&topic_key(&course.id, ci, ti)).map(|s| s.done).unwrap_or(false)
}

fn percent(done: usize, total: usize) -> u32 {
    (done as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::core::{Chapter, Topic};

    fn course() -> Course {
        Course {
            id: "js1".to_string(),
            name: "JS".to_string(),
            description: String::new(),
            chapters: vec![
                Chapter {
                    id: None,
                    title: "Intro".to_string(),
                    topics: vec![
                        Topic::Plain("Vars".to_string()),
                        Topic::Plain("Functions".to_string()),
                    ],
                },
                Chapter {
                    id: None,
                    title: "Advanced".to_string(),
                    topics: vec![Topic::Plain("Closures".to_string())],
                },
            ],
            sessions: Vec::new(),
            created_at: None,
        }
    }

    fn done_state(minutes: u32, rating: Option<u8>, date: &str) -> TopicState {
        TopicState {
            done: true,
            last_done_date: Some(date.parse::<DateTime<Utc>>().unwrap()),
            minutes,
            rating,
            note: None,
            needs_repeat: false,
        }
    }

    #[test]
    fn summary_counts_and_averages() {
        let course = course();
        let mut states = TopicStates::new();
        states.insert(
            topic_key("js1", 0, 0),
            done_state(30, Some(4), "2024-01-01T10:00:00Z"),
        );
        states.insert(
            topic_key("js1", 1, 0),
            done_state(45, Some(5), "2024-01-02T10:00:00Z"),
        );

        let summary = course_summary(&course, &states);
        assert_eq!(summary.total_topics, 3);
        assert_eq!(summary.done_topics, 2);
        assert_eq!(summary.avg_minutes, 38);
        assert_eq!(summary.avg_rating, Some(4.5));
    }

    #[test]
    fn summary_without_done_topics_is_empty() {
        let summary = course_summary(&course(), &TopicStates::new());
        assert_eq!(summary.done_topics, 0);
        assert_eq!(summary.avg_minutes, 0);
        assert_eq!(summary.avg_rating, None);
    }

    #[test]
    fn unrated_done_topics_do_not_skew_the_rating_average() {
        let course = course();
        let mut states = TopicStates::new();
        states.insert(topic_key("js1", 0, 0), done_state(30, None, "2024-01-01T10:00:00Z"));
        states.insert(topic_key("js1", 0, 1), done_state(30, Some(2), "2024-01-01T10:00:00Z"));

        let summary = course_summary(&course, &states);
        assert_eq!(summary.avg_rating, Some(2.0));
    }

    #[test]
    fn progress_percentages_are_rounded() {
        let course = course();
        let mut states = TopicStates::new();
        states.insert(topic_key("js1", 0, 0), done_state(10, None, "2024-01-01T10:00:00Z"));

        assert_eq!(chapter_progress(&course, &states, 0), 50);
        assert_eq!(chapter_progress(&course, &states, 1), 0);
        assert_eq!(total_progress(&course, &states), 33);
        assert_eq!(chapter_progress(&course, &states, 9), 0);
    }

    #[test]
    fn chapter_overview_rows() {
        let course = course();
        let mut states = TopicStates::new();
        states.insert(topic_key("js1", 0, 1), done_state(10, None, "2024-01-01T10:00:00Z"));

        let rows = chapter_overview(&course, &states);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Intro");
        assert_eq!(rows[0].total_topics, 2);
        assert_eq!(rows[0].done_topics, 1);
        assert_eq!(rows[1].done_topics, 0);
    }

    #[test]
    fn minutes_by_day_merges_sessions_and_done_topics() {
        let mut course = course();
        course.sessions.push(Session {
            date: "2024-01-01T08:00:00Z".parse().unwrap(),
            minutes: 20,
            topic_id: None,
            custom_topic: Some("Exercises".to_string()),
            note: String::new(),
            rating: 3,
        });

        let mut states = TopicStates::new();
        states.insert(topic_key("js1", 0, 0), done_state(25, None, "2024-01-01T18:00:00Z"));
        states.insert(topic_key("js1", 1, 0), done_state(15, None, "2024-01-03T18:00:00Z"));

        let days = minutes_by_day(&course, &states);
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let jan3 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(days.get(&jan1), Some(&45));
        assert_eq!(days.get(&jan3), Some(&15));
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn activity_level_thresholds() {
        assert_eq!(activity_level(0), ActivityLevel::Idle);
        assert_eq!(activity_level(1), ActivityLevel::Light);
        assert_eq!(activity_level(40), ActivityLevel::Light);
        assert_eq!(activity_level(41), ActivityLevel::Intense);
    }

    #[test]
    fn repeat_queue_lists_flagged_topics() {
        let course = course();
        let mut states = TopicStates::new();
        states.insert(
            topic_key("js1", 0, 1),
            TopicState {
                needs_repeat: true,
                note: Some("tricky".to_string()),
                ..Default::default()
            },
        );

        let entries = repeat_topics(&course, &states);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Functions");
        assert_eq!(entries[0].note, "tricky");
        assert_eq!(entries[0].rating, 3);
    }

    #[test]
    fn per_day_drill_down() {
        let mut course = course();
        course.sessions.push(Session {
            date: "2024-01-02T08:00:00Z".parse().unwrap(),
            minutes: 10,
            topic_id: None,
            custom_topic: Some("Reading".to_string()),
            note: String::new(),
            rating: 4,
        });

        let mut states = TopicStates::new();
        states.insert(topic_key("js1", 0, 0), done_state(25, Some(4), "2024-01-02T18:00:00Z"));

        let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let done = topics_done_on(&course, &states, jan2);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "Vars");
        assert_eq!(done[0].minutes, 25);

        assert_eq!(sessions_on(&course, jan2).len(), 1);
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(topics_done_on(&course, &states, jan1).is_empty());
        assert!(sessions_on(&course, jan1).is_empty());
    }
}
