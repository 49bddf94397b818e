//! Teacher-dashboard inputs and the roll-ups derived from them.
//!
//! `StudentSummary` and `ClassAggregate` are projections: they are rebuilt
//! from attempts, users and teacher assignments and never edited by hand.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    /// Number of questions answered correctly.
    pub score: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub xp_earned: u32,
    #[serde(default)]
    pub subject: Option<String>,
}

impl QuizAttempt {
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_questions) * 100.0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAssignment {
    #[serde(rename = "_id")]
    pub id: String,
    pub teacher_id: String,
    pub school: String,
    pub class_name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    /// Student (user) id.
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    pub total_xp: u64,
    pub quiz_count: usize,
    pub question_count: u64,
    pub average_percentage: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassAggregate {
    /// Normalised `{school}_{class}` key.
    #[serde(rename = "_id")]
    pub id: String,
    pub school: String,
    pub class_name: String,
    pub student_ids: Vec<String>,
    pub student_count: usize,
    pub teacher_ids: Vec<String>,
    pub total_xp: u64,
    pub average_percentage: f64,
}
