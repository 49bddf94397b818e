//! Recovers question structure from text extracted out of exam documents.
//!
//! The text is first split on section headers. Each section is sniffed for
//! its layout and handed to the matching strategy:
//!
//! - [`Layout::Standard`]: numbered blocks, options either packed inline
//!   (`A. foo B. bar`) or one per line.
//! - [`Layout::Cloze`]: a passage with numbered gaps followed by one option
//!   row per gap. Ordinary questions set between passages still parse as
//!   standard blocks.
//!
//! A block that does not yield a full option set produces no record. Callers
//! compare the result against the expected numbering with
//! [`missing_numbers`].
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use schema::QuestionType;

mod blocks;
mod cloze;
mod options;
mod sections;

pub use blocks::parse_block;

/// Fewest options a multiple-choice block may yield.
pub const MIN_OPTIONS: usize = 4;
/// Option letters run `A` through `F`.
pub const MAX_OPTIONS: usize = 6;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseContext {
    pub subject: String,
    pub year: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuestion {
    pub question_number: u32,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Option bodies in letter order, without their letter prefixes.
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<char>,
    #[serde(default)]
    pub section: Option<String>,
    /// Index into [`ParsedDocument::passages`].
    #[serde(default)]
    pub passage: Option<usize>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPassage {
    pub content: String,
    #[serde(default)]
    pub section: Option<String>,
    pub question_range: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub subject: String,
    pub year: u16,
    pub questions: Vec<ParsedQuestion>,
    pub passages: Vec<ParsedPassage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    Standard,
    Cloze,
}

/// Cheap look at the text to pick a strategy.
pub fn sniff_layout(text: &str) -> Layout {
    if cloze::looks_like_cloze(text) {
        Layout::Cloze
    } else {
        Layout::Standard
    }
}

#[tracing::instrument(skip_all, fields(subject = %ctx.subject, year = ctx.year))]
pub fn parse_document(text: &str, ctx: &ParseContext) -> ParsedDocument {
    let mut document = ParsedDocument {
        subject: ctx.subject.clone(),
        year: ctx.year,
        ..Default::default()
    };

    for section in sections::split_sections(text) {
        let layout = sniff_layout(&section.body);
        tracing::debug!(section = ?section.label, ?layout, "parsing section");
        match layout {
            Layout::Standard => {
                for block in blocks::segment(&section.body) {
                    match blocks::parse_segment(&block) {
                        Some(mut question) => {
                            question.section = section.label.clone();
                            document.questions.push(question);
                        }
                        None => {
                            tracing::debug!(number = block.number, "block yielded no question");
                        }
                    }
                }
            }
            Layout::Cloze => {
                let parsed = cloze::parse_cloze(&section.body);
                for (passage, questions) in parsed.passages {
                    let index = document.passages.len();
                    document.passages.push(ParsedPassage {
                        section: section.label.clone(),
                        ..passage
                    });
                    document
                        .questions
                        .extend(questions.into_iter().map(|mut question| {
                            question.section = section.label.clone();
                            question.passage = Some(index);
                            question
                        }));
                }
                document
                    .questions
                    .extend(parsed.questions.into_iter().map(|mut question| {
                        question.section = section.label.clone();
                        question
                    }));
            }
        }
    }

    tracing::info!(
        questions = document.questions.len(),
        passages = document.passages.len(),
        "parsed document"
    );
    document
}

/// Numbers in `1..=expected` with no parsed question, in ascending order.
pub fn missing_numbers(questions: &[ParsedQuestion], expected: u32) -> Vec<u32> {
    let seen: BTreeSet<u32> = questions.iter().map(|q| q.question_number).collect();
    (1..=expected).filter(|n| !seen.contains(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ParseContext {
        ParseContext {
            subject: "maths".into(),
            year: 2019,
        }
    }

    #[test]
    fn parses_inline_and_line_separated_blocks() {
        let text = "\
Answer all questions.

1. What is 2+2?A. 3B. 4C. 5D. 6


2. Which of these is a prime number?
A.
9
B.
15
C.
7
D.
21

3. Simplify 3x + 2x
(A) 5x
(B) 6x
(C) x
(D) 5
";
        let doc = parse_document(text, &ctx());
        let numbers: Vec<u32> = doc.questions.iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(doc.questions[0].options, vec!["3", "4", "5", "6"]);
        assert_eq!(doc.questions[1].question_text, "Which of these is a prime number?");
        assert_eq!(doc.questions[1].options, vec!["9", "15", "7", "21"]);
        assert_eq!(doc.questions[2].options, vec!["5x", "6x", "x", "5"]);
        assert!(doc.passages.is_empty());
    }

    #[test]
    fn trailing_question_without_following_marker_is_kept() {
        let text = "1. First?\nA. a B. b C. c D. d\n\n\n\n2. Last?\nA. w B. x C. y D. z";
        let doc = parse_document(text, &ctx());
        assert_eq!(doc.questions.len(), 2);
        assert_eq!(doc.questions[1].options, vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn short_blocks_are_dropped_and_reported_missing() {
        let text = "1. Study the diagram below.\nA. top B. bottom\n\n2. Pick one.\nA. a B. b C. c D. d\n";
        let doc = parse_document(text, &ctx());
        assert_eq!(doc.questions.len(), 1);
        assert_eq!(doc.questions[0].question_number, 2);
        assert_eq!(missing_numbers(&doc.questions, 3), vec![1, 3]);
    }

    #[test]
    fn section_headers_label_following_questions() {
        let text = "\
SECTION A
1. One?
A. a B. b C. c D. d
SECTION B: Grammar
1. Two?
A. e B. f C. g D. h
";
        let doc = parse_document(text, &ctx());
        assert_eq!(doc.questions.len(), 2);
        assert_eq!(doc.questions[0].section.as_deref(), Some("A"));
        assert_eq!(doc.questions[1].section.as_deref(), Some("B"));
        assert_eq!(doc.questions[1].options, vec!["e", "f", "g", "h"]);
    }

    #[test]
    fn answer_lines_are_captured() {
        let text = "1. What is 2+2?\nA. 3 B. 4 C. 5 D. 6\nAnswer: B\n";
        let doc = parse_document(text, &ctx());
        assert_eq!(doc.questions[0].answer, Some('B'));
        assert_eq!(doc.questions[0].options[3], "6");
    }

    #[test]
    fn cloze_sections_produce_a_linked_passage() {
        let text = "\
Read the passage and choose the word that best fills each gap.
Kofi (1) ____ to school early. His sister (2) ____ him at the gate.
1. A. go B. goes C. went D. going
2. A. meet B. met C. meeting D. meets
";
        assert_eq!(sniff_layout(text), Layout::Cloze);
        let doc = parse_document(text, &ctx());
        assert_eq!(doc.passages.len(), 1);
        assert_eq!(doc.passages[0].question_range, vec![1, 2]);
        assert_eq!(doc.questions.len(), 2);
        assert!(doc.questions.iter().all(|q| q.passage == Some(0)));
        assert!(doc.questions.iter().all(|q| q.question_type == QuestionType::Cloze));
        assert_eq!(doc.questions[0].question_text, "Kofi (1) ____ to school early.");
    }

    #[test]
    fn questions_after_cloze_rows_are_not_lost() {
        let text = "\
Kofi (1) ____ to school early. His sister (2) ____ him at the gate.
1. A. go B. goes C. went D. going
2. A. meet B. met C. meeting D. meets
3. What is the boy's name?
A. Kofi B. Ama C. Yaw D. Esi
";
        let doc = parse_document(text, &ctx());
        let mut numbers: Vec<u32> = doc.questions.iter().map(|q| q.question_number).collect();
        numbers.sort();
        assert_eq!(numbers, vec![1, 2, 3]);
        let third = doc.questions.iter().find(|q| q.question_number == 3).unwrap();
        assert_eq!(third.passage, None);
        assert_eq!(third.question_type, QuestionType::MultipleChoice);
        assert!(missing_numbers(&doc.questions, 3).is_empty());
    }

    #[test]
    fn missing_numbers_is_empty_when_complete() {
        let text = "1. a?\nA. a B. b C. c D. d\n2. b?\nA. a B. b C. c D. d\n";
        let doc = parse_document(text, &ctx());
        assert!(missing_numbers(&doc.questions, 2).is_empty());
    }
}
