//! Teacher-dashboard roll-ups, recomputed from scratch on every run.
use std::collections::{BTreeMap, BTreeSet};

use schema::{ClassAggregate, QuizAttempt, StudentSummary, TeacherAssignment, UserProfile};

use crate::aggregate::slug;

/// `{school}_{class}` with both parts slugged, so `"St. Mary's", "JHS 2"`
/// and `"st marys", "jhs-2"` land in the same class.
pub fn normalize_class_key(school: &str, class_name: &str) -> String {
    format!("{}_{}", slug(&school.replace('\'', "")), slug(class_name))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_teacher(user: &UserProfile) -> bool {
    user.role
        .as_deref()
        .is_some_and(|role| role.eq_ignore_ascii_case("teacher"))
}

/// One summary per student: every non-teacher user plus any user id that
/// appears only in attempts. Ordered by id.
pub fn student_summaries(attempts: &[QuizAttempt], users: &[UserProfile]) -> Vec<StudentSummary> {
    let mut summaries: BTreeMap<&str, StudentSummary> = users
        .iter()
        .filter(|user| !is_teacher(user))
        .map(|user| {
            (
                user.id.as_str(),
                StudentSummary {
                    id: user.id.clone(),
                    display_name: user.display_name.clone(),
                    school: user.school.clone(),
                    class_name: user.class_name.clone(),
                    ..Default::default()
                },
            )
        })
        .collect();
    let teachers: BTreeSet<&str> = users
        .iter()
        .filter(|user| is_teacher(user))
        .map(|user| user.id.as_str())
        .collect();

    let mut percentages: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for attempt in attempts {
        if teachers.contains(attempt.user_id.as_str()) {
            continue;
        }
        let summary = summaries
            .entry(attempt.user_id.as_str())
            .or_insert_with(|| StudentSummary {
                id: attempt.user_id.clone(),
                ..Default::default()
            });
        summary.total_xp += u64::from(attempt.xp_earned);
        summary.quiz_count += 1;
        summary.question_count += u64::from(attempt.total_questions);
        percentages
            .entry(attempt.user_id.as_str())
            .or_default()
            .push(attempt.percentage());
    }

    for (id, values) in percentages {
        if let Some(summary) = summaries.get_mut(id) {
            summary.average_percentage = round2(values.iter().sum::<f64>() / values.len() as f64);
        }
    }
    summaries.into_values().collect()
}

/// One aggregate per normalised class, including classes that only appear
/// in teacher assignments. Students without a school or class are left out.
pub fn class_aggregates(
    summaries: &[StudentSummary],
    assignments: &[TeacherAssignment],
) -> Vec<ClassAggregate> {
    let mut classes: BTreeMap<String, ClassAggregate> = BTreeMap::new();
    let mut averages: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for summary in summaries {
        let (Some(school), Some(class_name)) = (&summary.school, &summary.class_name) else {
            continue;
        };
        let key = normalize_class_key(school, class_name);
        let class = classes.entry(key.clone()).or_insert_with(|| ClassAggregate {
            id: key.clone(),
            school: school.trim().to_string(),
            class_name: class_name.trim().to_string(),
            ..Default::default()
        });
        class.student_ids.push(summary.id.clone());
        class.student_count = class.student_ids.len();
        class.total_xp += summary.total_xp;
        if summary.quiz_count > 0 {
            averages.entry(key).or_default().push(summary.average_percentage);
        }
    }

    for assignment in assignments {
        let key = normalize_class_key(&assignment.school, &assignment.class_name);
        let class = classes.entry(key.clone()).or_insert_with(|| ClassAggregate {
            id: key,
            school: assignment.school.trim().to_string(),
            class_name: assignment.class_name.trim().to_string(),
            ..Default::default()
        });
        if !class.teacher_ids.contains(&assignment.teacher_id) {
            class.teacher_ids.push(assignment.teacher_id.clone());
        }
    }

    for (key, values) in averages {
        if let Some(class) = classes.get_mut(&key) {
            class.average_percentage = round2(values.iter().sum::<f64>() / values.len() as f64);
        }
    }
    classes
        .into_values()
        .map(|mut class| {
            class.teacher_ids.sort();
            class
        })
        .collect()
}
