//! Document shapes stored by the exam-prep question bank.
//!
//! Every document is keyed by a deterministic string `_id`, so re-running a
//! job upserts the same documents instead of creating new ones.
use serde::{Deserialize, Serialize};

pub mod asset;
pub mod dashboard;
pub mod db;

pub use asset::{Asset, AssetKind};
pub use dashboard::{ClassAggregate, QuizAttempt, StudentSummary, TeacherAssignment, UserProfile};

/// Collection names in the question-bank database.
pub mod collections {
    pub const QUESTIONS: &str = "questions";
    pub const PASSAGES: &str = "passages";
    pub const QUESTION_COLLECTIONS: &str = "questionCollections";
    pub const ASSETS: &str = "assets";
    pub const QUIZ_ATTEMPTS: &str = "quizAttempts";
    pub const USERS: &str = "users";
    pub const TEACHER_ASSIGNMENTS: &str = "teacherAssignments";
    pub const STUDENT_SUMMARIES: &str = "studentSummaries";
    pub const CLASS_AGGREGATES: &str = "classAggregates";
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    #[serde(alias = "theory")]
    Essay,
    #[serde(alias = "fill_in_blank")]
    Cloze,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Essay => "essay",
            QuestionType::Cloze => "cloze",
        }
    }

    /// Multiple-choice and cloze items are answered by picking an option.
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Cloze)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_text: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    pub subject: String,
    pub exam_type: String,
    pub year: u16,
    #[serde(default)]
    pub section: Option<String>,
    pub question_number: u32,
    #[serde(default)]
    pub options: Vec<String>,
    /// Canonical answer letter (`A`..`F`). Legacy records may hold the full
    /// option text here until the fix job rewrites them.
    #[serde(default)]
    pub correct_answer: Option<String>,
    /// Body of the option `correct_answer` points at, without its prefix.
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub passage_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    pub question_range: Vec<u32>,
    pub subject: String,
    pub exam_type: String,
    pub year: u16,
}

/// A queryable bundle of question ids. The collection never owns its
/// questions; `question_count` always equals `question_ids.len()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCollection {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub exam_type: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub topic: Option<String>,
    pub question_ids: Vec<String>,
    pub question_count: usize,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
