//! Structural checks and safe repairs for question records.
//!
//! Nothing here performs I/O. Validation returns issues as data; the caller
//! decides whether to write a repaired record, delete a placeholder, or
//! leave the record for manual review.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use schema::Question;

/// Fixed set of answer letters.
pub const ANSWER_LETTERS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

static OPTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(([A-Fa-f])\)|([A-F])\s*[.):]|([a-f])[.)])")
        .expect("valid option prefix regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    NoOptions,
    NoCorrectAnswer,
    InvalidLetter,
    LetterOutOfRange,
    OptionFormatMismatch,
}

/// Checks, in order: options present, answer present, answer letter valid
/// and in range, and the indexed option carrying the same letter prefix.
///
/// Only option-bearing question types are checked.
pub fn validate(question: &Question) -> Vec<IssueKind> {
    let mut issues = vec![];
    if !question.question_type.has_options() {
        return issues;
    }

    if question.options.is_empty() {
        issues.push(IssueKind::NoOptions);
    }

    let Some(answer) = question
        .correct_answer
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
    else {
        issues.push(IssueKind::NoCorrectAnswer);
        return issues;
    };

    let mut chars = answer.chars();
    let (Some(letter), None) = (chars.next(), chars.next()) else {
        // Full option text; the fix job rewrites it to a letter
        return issues;
    };

    let Some(index) = letter_index(letter) else {
        issues.push(IssueKind::InvalidLetter);
        return issues;
    };
    let Some(option) = question.options.get(index) else {
        issues.push(IssueKind::LetterOutOfRange);
        return issues;
    };
    if !option
        .trim_start()
        .to_uppercase()
        .starts_with(&format!("{letter}."))
    {
        issues.push(IssueKind::OptionFormatMismatch);
    }
    issues
}

/// Zero-based index of an answer letter from the fixed set. Lowercase is not
/// accepted.
pub fn letter_index(letter: char) -> Option<usize> {
    ANSWER_LETTERS.iter().position(|&l| l == letter)
}

/// Letter for the option at `index`; there is none past `F`.
pub fn option_letter(index: usize) -> Option<char> {
    ANSWER_LETTERS.get(index).copied()
}

/// Letter and byte length of an option's letter prefix. A dotted letter
/// glued to more letters (`D.N.A`, `A.D. 1957`, `a.m.`) is text.
fn prefix_match(option: &str) -> Option<(char, usize)> {
    let caps = OPTION_PREFIX.captures(option)?;
    let end = caps.get(0)?.end();
    let next = option[end..].chars().next();
    let (letter, is_prefix) = if let Some(m) = caps.get(1) {
        (m, true)
    } else if let Some(m) = caps.get(2) {
        (m, next.is_none_or(|c| !c.is_alphabetic()))
    } else {
        (caps.get(3)?, next.is_none_or(char::is_whitespace))
    };
    if !is_prefix {
        return None;
    }
    let letter = letter.as_str().chars().next()?.to_ascii_uppercase();
    Some((letter, end))
}

/// Letter of an option's existing prefix (`B.`, `(b)`, `B)`), if any.
pub fn option_prefix(option: &str) -> Option<char> {
    prefix_match(option).map(|(letter, _)| letter)
}

/// Option text with any letter prefix removed.
pub fn option_body(option: &str) -> &str {
    match prefix_match(option) {
        Some((_, end)) => option[end..].trim(),
        None => option.trim(),
    }
}

/// Prefixes an option body that carries no prefix of its own with the
/// letter of its position. Bodies past `F` stay bare.
pub fn prefix_option(body: &str, ordinal_index: usize) -> String {
    let body = clean_text(body);
    match option_letter(ordinal_index) {
        Some(letter) => format!("{letter}. {body}"),
        None => body,
    }
}

/// Prefixes the option with the letter of its position, replacing any
/// existing (possibly wrong) prefix.
pub fn normalize_option_text(raw_option: &str, ordinal_index: usize) -> String {
    prefix_option(option_body(raw_option), ordinal_index)
}

/// The option whose own prefix letter matches `letter`.
pub fn resolve_answer_text(letter: char, options: &[String]) -> Option<String> {
    let letter = letter.to_ascii_uppercase();
    options
        .iter()
        .find(|option| option_prefix(option) == Some(letter))
        .cloned()
}

/// Reads a stored answer in any of the forms found in the bank: `B`, `b`,
/// `(B)`, `B. full text`, or the bare text of one of the options, and
/// returns the letter of the option's position in `options`.
///
/// Letters are matched against the options' own prefixes first, so an
/// answer keeps pointing at the same option text when the options are later
/// re-prefixed by position.
pub fn canonical_answer(raw: &str, options: &[String]) -> Option<char> {
    answer_index(raw, options).and_then(option_letter)
}

fn answer_index(raw: &str, options: &[String]) -> Option<usize> {
    let by_text = |text: &str| {
        let wanted = clean_text(text).to_lowercase();
        options
            .iter()
            .position(|option| clean_text(option_body(option)).to_lowercase() == wanted)
            .filter(|&i| i < ANSWER_LETTERS.len())
    };

    let trimmed = raw.trim().trim_matches(|c| c == '(' || c == ')' || c == '"');
    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return letter_position(c.to_ascii_uppercase(), options).or_else(|| by_text(trimmed));
    }

    if let Some(letter) = option_prefix(raw) {
        return by_text(option_body(raw)).or_else(|| letter_position(letter, options));
    }
    by_text(trimmed)
}

fn letter_position(letter: char, options: &[String]) -> Option<usize> {
    let positional = letter_index(letter)?;
    Some(
        options
            .iter()
            .position(|option| option_prefix(option) == Some(letter))
            .unwrap_or(positional),
    )
}

/// Collapses whitespace runs and drops zero-width characters.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// What to do with a multiple-choice record that has no recoverable answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFallback {
    /// Default to option `A`.
    FirstOption,
    #[default]
    ManualReview,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Triage {
    Valid,
    AutoFixed,
    /// Placeholder with no options.
    Delete,
    ManualReview,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    TextCleaned,
    OptionsReformatted,
    AnswerCanonicalised,
    AnswerDefaulted,
    AnswerTextDerived,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Repair {
    pub question: Question,
    pub changes: Vec<Change>,
    /// Issues still present after the repair.
    pub issues: Vec<IssueKind>,
    pub triage: Triage,
}

pub fn repair(question: &Question, fallback: AnswerFallback) -> Repair {
    let mut fixed = question.clone();
    let mut changes = vec![];

    let text = clean_text(&fixed.question_text);
    if text != fixed.question_text {
        fixed.question_text = text;
        changes.push(Change::TextCleaned);
    }

    if !fixed.question_type.has_options() {
        return finish(fixed, changes);
    }

    if fixed.options.is_empty() {
        let issues = validate(&fixed);
        return Repair {
            question: fixed,
            changes,
            issues,
            triage: Triage::Delete,
        };
    }

    let options: Vec<String> = fixed
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| normalize_option_text(option, i))
        .collect();
    if options != fixed.options {
        fixed.options = options;
        changes.push(Change::OptionsReformatted);
    }

    // Resolved against the original options; positions are unchanged
    let letter = fixed
        .correct_answer
        .as_deref()
        .and_then(|raw| canonical_answer(raw, &question.options));
    match letter {
        Some(letter) => {
            let letter = letter.to_string();
            if fixed.correct_answer.as_deref() != Some(letter.as_str()) {
                fixed.correct_answer = Some(letter);
                changes.push(Change::AnswerCanonicalised);
            }
        }
        None if fixed.correct_answer.is_none() && fallback == AnswerFallback::FirstOption => {
            fixed.correct_answer = Some("A".to_string());
            changes.push(Change::AnswerDefaulted);
        }
        None => {}
    }

    let answer_text = fixed
        .correct_answer
        .as_deref()
        .filter(|a| a.chars().count() == 1)
        .and_then(|a| a.chars().next())
        .and_then(|letter| resolve_answer_text(letter, &fixed.options))
        .map(|option| option_body(&option).to_string());
    if answer_text.is_some() && answer_text != fixed.answer_text {
        fixed.answer_text = answer_text;
        changes.push(Change::AnswerTextDerived);
    }

    let mut repair = finish(fixed, changes);
    // Answer text that matches no option cannot be turned into a letter
    let had_answer = question
        .correct_answer
        .as_deref()
        .is_some_and(|a| !a.trim().is_empty());
    if letter.is_none() && had_answer {
        if !repair.issues.contains(&IssueKind::InvalidLetter) {
            repair.issues.push(IssueKind::InvalidLetter);
        }
        repair.triage = Triage::ManualReview;
    }
    repair
}

fn finish(question: Question, changes: Vec<Change>) -> Repair {
    let issues = validate(&question);
    let triage = match (issues.is_empty(), changes.is_empty()) {
        (true, true) => Triage::Valid,
        (true, false) => Triage::AutoFixed,
        (false, _) => Triage::ManualReview,
    };
    Repair {
        question,
        changes,
        issues,
        triage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::QuestionType;

    fn mcq(options: &[&str], answer: Option<&str>) -> Question {
        Question {
            id: "maths_2019_q1".into(),
            question_text: "What is 2+2?".into(),
            question_type: QuestionType::MultipleChoice,
            subject: "maths".into(),
            exam_type: "BECE".into(),
            year: 2019,
            question_number: 1,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: answer.map(str::to_string),
            is_active: true,
            ..Default::default()
        }
    }

    #[test]
    fn valid_question_has_no_issues() {
        let q = mcq(&["A. 3", "B. 4", "C. 5", "D. 6"], Some("B"));
        assert!(validate(&q).is_empty());
    }

    #[test]
    fn missing_options_and_answer_are_both_reported() {
        let q = mcq(&[], None);
        assert_eq!(
            validate(&q),
            vec![IssueKind::NoOptions, IssueKind::NoCorrectAnswer]
        );
    }

    #[test]
    fn letter_checks() {
        assert_eq!(
            validate(&mcq(&["A. 3", "B. 4"], Some("G"))),
            vec![IssueKind::InvalidLetter]
        );
        assert_eq!(
            validate(&mcq(&["A. 3", "B. 4"], Some("D"))),
            vec![IssueKind::LetterOutOfRange]
        );
        assert_eq!(
            validate(&mcq(&["3", "4", "5", "6"], Some("B"))),
            vec![IssueKind::OptionFormatMismatch]
        );
    }

    #[test]
    fn essays_are_not_checked_for_options() {
        let mut q = mcq(&[], None);
        q.question_type = QuestionType::Essay;
        assert!(validate(&q).is_empty());
    }

    #[test]
    fn option_text_is_reprefixed_by_position() {
        assert_eq!(normalize_option_text("C. Accra", 0), "A. Accra");
        assert_eq!(normalize_option_text("(b)  Kumasi", 1), "B. Kumasi");
        assert_eq!(normalize_option_text("Tamale", 2), "C. Tamale");
        assert_eq!(normalize_option_text("a.m. sharp", 3), "D. a.m. sharp");
    }

    #[test]
    fn abbreviations_are_not_prefixes() {
        assert_eq!(option_prefix("D.N.A"), None);
        assert_eq!(option_body("A.D. 1957"), "A.D. 1957");
        assert_eq!(option_body("a.m. sharp"), "a.m. sharp");
        assert_eq!(option_prefix("B.4"), Some('B'));
        assert_eq!(normalize_option_text("D.N.A", 0), "A. D.N.A");
        assert_eq!(normalize_option_text("A. D.N.A", 0), "A. D.N.A");

        let options: Vec<String> = vec!["D.N.A".into(), "Starch".into(), "Lipid".into(), "Water".into()];
        assert_eq!(canonical_answer("D", &options), Some('D'));
        assert_eq!(canonical_answer("D.N.A", &options), Some('A'));
    }

    #[test]
    fn letters_stop_at_f() {
        assert_eq!(option_letter(0), Some('A'));
        assert_eq!(option_letter(5), Some('F'));
        assert_eq!(option_letter(6), None);
        assert_eq!(option_letter(26), None);
        assert_eq!(prefix_option("seventh", 6), "seventh");
    }

    #[test]
    fn answer_text_resolves_by_prefix_letter() {
        let options: Vec<String> = vec!["A. 3".into(), "B. 4".into()];
        assert_eq!(resolve_answer_text('b', &options), Some("B. 4".to_string()));
        assert_eq!(resolve_answer_text('E', &options), None);
    }

    #[test]
    fn canonical_answer_accepts_every_stored_form() {
        let options: Vec<String> = vec!["A. 3".into(), "B. 4".into(), "C. 5".into()];
        assert_eq!(canonical_answer("b", &options), Some('B'));
        assert_eq!(canonical_answer("(C)", &options), Some('C'));
        assert_eq!(canonical_answer("B. 4", &options), Some('B'));
        assert_eq!(canonical_answer("5", &options), Some('C'));
        assert_eq!(canonical_answer("seven", &options), None);
        assert_eq!(canonical_answer("Z", &options), None);
    }

    #[test]
    fn repair_fixes_prefixes_and_answer() {
        let q = mcq(&["3", "4", "5", "6"], Some("4"));
        let repaired = repair(&q, AnswerFallback::ManualReview);
        assert_eq!(repaired.triage, Triage::AutoFixed);
        assert_eq!(repaired.question.options, vec!["A. 3", "B. 4", "C. 5", "D. 6"]);
        assert_eq!(repaired.question.correct_answer.as_deref(), Some("B"));
        assert_eq!(repaired.question.answer_text.as_deref(), Some("4"));
        assert!(repaired.issues.is_empty());
    }

    #[test]
    fn repair_keeps_answer_pointing_at_same_option_text() {
        // Options were stored out of order; the answer named option `C. 5`
        let q = mcq(&["C. 5", "A. 3", "B. 4", "D. 6"], Some("C"));
        let repaired = repair(&q, AnswerFallback::ManualReview);
        assert_eq!(repaired.question.options[0], "A. 5");
        assert_eq!(repaired.question.correct_answer.as_deref(), Some("A"));
        assert_eq!(repaired.question.answer_text.as_deref(), Some("5"));
        assert!(validate(&repaired.question).is_empty());
    }

    #[test]
    fn unmatched_answer_text_goes_to_manual_review() {
        let q = mcq(&["A. 3", "B. 4", "C. 5", "D. 6"], Some("seven"));
        let repaired = repair(&q, AnswerFallback::FirstOption);
        assert_eq!(repaired.triage, Triage::ManualReview);
        assert_eq!(repaired.issues, vec![IssueKind::InvalidLetter]);
        assert_eq!(repaired.question.correct_answer.as_deref(), Some("seven"));
    }

    #[test]
    fn repair_triages_placeholders_and_missing_answers() {
        let placeholder = repair(&mcq(&[], Some("A")), AnswerFallback::FirstOption);
        assert_eq!(placeholder.triage, Triage::Delete);

        let unanswered = mcq(&["A. 3", "B. 4", "C. 5", "D. 6"], None);
        let review = repair(&unanswered, AnswerFallback::ManualReview);
        assert_eq!(review.triage, Triage::ManualReview);
        assert_eq!(review.issues, vec![IssueKind::NoCorrectAnswer]);

        let defaulted = repair(&unanswered, AnswerFallback::FirstOption);
        assert_eq!(defaulted.triage, Triage::AutoFixed);
        assert_eq!(defaulted.changes, vec![Change::AnswerDefaulted, Change::AnswerTextDerived]);
        assert_eq!(defaulted.question.answer_text.as_deref(), Some("3"));
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  What\u{00A0}is\u{200B} it?\n "), "What is it?");
    }
}
