use regex::Regex;
use std::sync::LazyLock;

use schema::QuestionType;

use super::{ParsedQuestion, options};

static QUESTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3})\s*\.\s*(.*)$").expect("valid question marker regex")
});

static ANSWER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:ans(?:wer)?)\s*[:.\-]\s*\(?([A-Fa-f])\b").expect("valid answer regex")
});

#[derive(Debug, PartialEq)]
pub(crate) struct Block {
    pub number: u32,
    /// First entry is the remainder of the marker line.
    pub lines: Vec<String>,
    pub answer: Option<char>,
}

/// Cuts a section into blocks, one per question-number marker. End of text
/// closes the last block.
pub(crate) fn segment(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = vec![];
    let mut current: Option<Block> = None;

    for line in text.lines() {
        // A bare number right after a lone option letter is that option's text
        let awaiting_option_text = current
            .as_ref()
            .and_then(|b| b.lines.iter().rev().find(|l| !l.trim().is_empty()))
            .is_some_and(|l| options::is_bare_letter(l));

        if !awaiting_option_text {
            if let Some((number, rest)) = question_marker(line) {
                blocks.extend(current.take());
                current = Some(Block {
                    number,
                    lines: vec![rest.to_string()],
                    answer: None,
                });
                continue;
            }
        }

        let Some(block) = current.as_mut() else {
            // Preamble before the first question
            continue;
        };
        if let Some(caps) = ANSWER_LINE.captures(line) {
            block.answer = caps[1].chars().next().map(|c| c.to_ascii_uppercase());
            continue;
        }
        block.lines.push(line.to_string());
    }

    blocks.extend(current);
    blocks
}

pub(crate) fn question_marker(line: &str) -> Option<(u32, &str)> {
    let caps = QUESTION_MARKER.captures(line)?;
    let rest = caps.get(2).map_or("", |m| m.as_str());
    // `1.5 kg ...` is a decimal, not a marker
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let number: u32 = caps[1].parse().ok()?;
    if number == 0 {
        return None;
    }
    Some((number, rest))
}

pub(crate) fn parse_segment(block: &Block) -> Option<ParsedQuestion> {
    let (question_text, options) = options::inline(&block.lines)
        .or_else(|| options::line_separated(&block.lines))?;
    if question_text.is_empty() {
        return None;
    }

    Some(ParsedQuestion {
        question_number: block.number,
        question_text,
        question_type: QuestionType::MultipleChoice,
        options,
        answer: block.answer,
        section: None,
        passage: None,
        topic: None,
    })
}

/// Parses the text of a single question block (without its number marker).
///
/// Returns `None` when fewer than four options are found or no question text
/// precedes them.
pub fn parse_block(question_number: u32, text: &str) -> Option<ParsedQuestion> {
    let block = Block {
        number: question_number,
        lines: text.lines().map(str::to_string).collect(),
        answer: None,
    };
    parse_segment(&block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_four_inline_options_yield_one_record() {
        let question = parse_block(1, "What is 2+2?A. 3B. 4C. 5D. 6").unwrap();
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.question_text, "What is 2+2?");
        assert_eq!(question.options, vec!["3", "4", "5", "6"]);
    }

    #[test]
    fn two_option_markers_yield_nothing() {
        assert_eq!(parse_block(7, "Which is larger?A. 3B. 4"), None);
    }

    #[test]
    fn blank_lines_before_markers_are_tolerated() {
        let blocks = segment("1. a\n\n\n\n2. b\n\n3. c");
        let numbers: Vec<u32> = blocks.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn decimals_do_not_open_blocks() {
        let blocks = segment("1. How heavy?\n2.5 kg is the mass of the box.\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines.len(), 2);
    }

    #[test]
    fn numeric_option_text_after_bare_letter_is_not_a_marker() {
        let blocks = segment("1. Pick the multiple of three.\nA.\n12.\nB.\n14.\nC.\n16.\nD.\n20.\n");
        assert_eq!(blocks.len(), 1);
        let question = parse_segment(&blocks[0]).unwrap();
        assert_eq!(question.options, vec!["12.", "14.", "16.", "20."]);
    }
}
