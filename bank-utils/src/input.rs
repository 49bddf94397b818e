//! Shapes of the JSON files the import job accepts.
use serde::Deserialize;
use std::collections::BTreeMap;

use schema::QuestionType;

use crate::{
    error::Error,
    normalize::option_body,
    parser::{ParsedDocument, ParsedQuestion},
};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QuestionBankFile {
    /// `{ "multiple_choice": { "q1": { "question": .., "possibleAnswers": [..] } } }`
    Keyed {
        multiple_choice: BTreeMap<String, KeyedEntry>,
    },
    /// `[{ "questionNumber": 1, "questionText": .., "options": [..] }]`
    Flat(Vec<FlatEntry>),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyedEntry {
    pub question: String,
    #[serde(default)]
    pub possible_answers: Vec<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    pub question_number: u32,
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, rename = "type")]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerKeyFile {
    /// `{ "multiple_choice": { "q1": "B. full option text" } }`
    Keyed {
        multiple_choice: BTreeMap<String, String>,
    },
    /// `{ "q1": "B" }`
    Flat(BTreeMap<String, String>),
}

/// Raw answers by question number, as written in the key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnswerKey(pub BTreeMap<u32, String>);

impl AnswerKey {
    pub fn get(&self, number: u32) -> Option<&str> {
        self.0.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `q12` (or `12`) to `12`.
pub fn question_number_from_key(key: &str) -> Option<u32> {
    key.trim()
        .trim_start_matches(['q', 'Q'])
        .parse()
        .ok()
        .filter(|n| *n > 0)
}

impl AnswerKeyFile {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_answer_key(self) -> Result<AnswerKey, Error> {
        let entries = match self {
            AnswerKeyFile::Keyed { multiple_choice } => multiple_choice,
            AnswerKeyFile::Flat(entries) => entries,
        };
        let mut answers = BTreeMap::new();
        for (key, answer) in entries {
            let number = question_number_from_key(&key)
                .ok_or_else(|| Error::Input(format!("answer key entry {key:?} is not q<N>")))?;
            answers.insert(number, answer);
        }
        Ok(AnswerKey(answers))
    }
}

impl QuestionBankFile {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts to the parser's output shape, ordered by question number.
    /// Answers embedded in flat entries are returned as an answer key.
    pub fn into_document(self, subject: &str, year: u16) -> Result<(ParsedDocument, AnswerKey), Error> {
        let mut questions = vec![];
        let mut answers = BTreeMap::new();

        match self {
            QuestionBankFile::Keyed { multiple_choice } => {
                for (key, entry) in multiple_choice {
                    let number = question_number_from_key(&key).ok_or_else(|| {
                        Error::Input(format!("question bank entry {key:?} is not q<N>"))
                    })?;
                    questions.push(ParsedQuestion {
                        question_number: number,
                        question_text: entry.question,
                        question_type: QuestionType::MultipleChoice,
                        options: bodies(&entry.possible_answers),
                        answer: None,
                        section: None,
                        passage: None,
                        topic: entry.topic,
                    });
                }
            }
            QuestionBankFile::Flat(entries) => {
                for entry in entries {
                    if let Some(answer) = entry.correct_answer {
                        answers.insert(entry.question_number, answer);
                    }
                    questions.push(ParsedQuestion {
                        question_number: entry.question_number,
                        question_text: entry.question_text,
                        question_type: entry.question_type.unwrap_or_default(),
                        options: bodies(&entry.options),
                        answer: None,
                        section: entry.section,
                        passage: None,
                        topic: entry.topic,
                    });
                }
            }
        }

        questions.sort_by(|a, b| {
            (a.section.as_deref(), a.question_number).cmp(&(b.section.as_deref(), b.question_number))
        });
        let document = ParsedDocument {
            subject: subject.to_string(),
            year,
            questions,
            passages: vec![],
        };
        Ok((document, AnswerKey(answers)))
    }
}

/// Banks carry options with or without their letter prefixes.
fn bodies(options: &[String]) -> Vec<String> {
    options.iter().map(|o| option_body(o).to_string()).collect()
}
