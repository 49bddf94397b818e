use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use schema::QuestionType;

use super::{MIN_OPTIONS, ParsedPassage, ParsedQuestion, blocks, options};

/// `(12) ____`, `____ (12)` or `[12]`.
static GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d{1,3})\s*\)\s*_{2,}|_{2,}\s*\(\s*(\d{1,3})\s*\)|\[\s*(\d{1,3})\s*\]")
        .expect("valid gap regex")
});

static ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3})\s*[.)]?(?:\s+|\t)(.*)$").expect("valid option row regex")
});

pub(crate) fn looks_like_cloze(text: &str) -> bool {
    let gaps: BTreeSet<u32> = GAP
        .captures_iter(text)
        .filter_map(|caps| gap_number(&caps))
        .collect();
    if gaps.len() < 2 {
        return false;
    }
    text.lines().filter_map(option_row).count() >= 2
}

fn gap_number(caps: &regex::Captures<'_>) -> Option<u32> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .parse()
        .ok()
}

/// A numbered row of options with no question text: `3. A. go B. went ...`
/// or tab-separated cells from a table.
fn option_row(line: &str) -> Option<(u32, Vec<String>)> {
    let caps = ROW.captures(line)?;
    let number: u32 = caps[1].parse().ok()?;
    let rest = caps.get(2).map_or("", |m| m.as_str());

    if let Some((question_text, options)) = options::inline_text(rest.trim()) {
        if question_text.is_empty() {
            return Some((number, options));
        }
        return None;
    }

    let cells: Vec<String> = rest
        .split('\t')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if cells.len() >= MIN_OPTIONS && line.contains('\t') {
        return Some((number, cells));
    }
    None
}

#[derive(Debug, Default)]
pub(crate) struct ClozeSection {
    /// Each passage with the questions of its option rows.
    pub passages: Vec<(ParsedPassage, Vec<ParsedQuestion>)>,
    /// Ordinary numbered questions set between the passages.
    pub questions: Vec<ParsedQuestion>,
}

#[derive(Default)]
struct ClozeBuilder<'a> {
    section: ClozeSection,
    passage_lines: Vec<&'a str>,
    rows: Vec<(u32, Vec<String>)>,
    block: Vec<&'a str>,
}

impl<'a> ClozeBuilder<'a> {
    fn prose(&mut self, line: &'a str) {
        // Prose after a run of rows opens the next passage
        if !self.rows.is_empty() {
            let rows = std::mem::take(&mut self.rows);
            self.section
                .passages
                .extend(finish_passage(&self.passage_lines, rows));
            self.passage_lines.clear();
        }
        self.passage_lines.push(line.trim());
    }

    /// A numbered block that parses as a question is kept as one; anything
    /// else it held is passage prose.
    fn close_block(&mut self) {
        if self.block.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.block);
        let question = blocks::segment(&lines.join("\n"))
            .first()
            .and_then(blocks::parse_segment);
        match question {
            Some(question) => self.section.questions.push(question),
            None => {
                for line in lines {
                    self.prose(line);
                }
            }
        }
    }

    fn finish(mut self) -> ClozeSection {
        self.close_block();
        let rows = std::mem::take(&mut self.rows);
        self.section
            .passages
            .extend(finish_passage(&self.passage_lines, rows));
        self.section
    }
}

/// Splits the section into passages, each followed by its option rows.
/// Numbered questions between the rows are parsed as standard blocks.
pub(crate) fn parse_cloze(text: &str) -> ClozeSection {
    let mut builder = ClozeBuilder::default();

    for line in text.lines() {
        let row = option_row(line);
        let blank = line.trim().is_empty();
        let has_gap = GAP.is_match(line);
        // A bare number right after a lone option letter is that option's text
        let awaiting_option_text = builder
            .block
            .last()
            .is_some_and(|l| options::is_bare_letter(l));
        let opens_block = row.is_none()
            && !has_gap
            && !awaiting_option_text
            && blocks::question_marker(line).is_some();

        if row.is_some() || opens_block || blank || has_gap {
            builder.close_block();
        }
        if let Some(row) = row {
            builder.rows.push(row);
        } else if opens_block || (!blank && !builder.block.is_empty()) {
            builder.block.push(line);
        } else if !blank {
            builder.prose(line);
        }
    }
    builder.finish()
}

fn finish_passage(
    lines: &[&str],
    rows: Vec<(u32, Vec<String>)>,
) -> Option<(ParsedPassage, Vec<ParsedQuestion>)> {
    if rows.is_empty() {
        return None;
    }
    let content = lines.join("\n");
    let questions: Vec<ParsedQuestion> = rows
        .into_iter()
        .map(|(number, options)| ParsedQuestion {
            question_number: number,
            question_text: gap_sentence(&content, number).unwrap_or_else(|| format!("({number}) ____")),
            question_type: QuestionType::Cloze,
            options,
            answer: None,
            section: None,
            passage: None,
            topic: None,
        })
        .collect();

    let passage = ParsedPassage {
        content,
        section: None,
        question_range: questions.iter().map(|q| q.question_number).collect(),
    };
    Some((passage, questions))
}

/// The sentence of the passage holding gap `number`.
fn gap_sentence(content: &str, number: u32) -> Option<String> {
    let gap = GAP
        .captures_iter(content)
        .find(|caps| gap_number(caps) == Some(number))?
        .get(0)?;

    let is_boundary = |c: char| matches!(c, '.' | '!' | '?' | '\n');
    let start = content[..gap.start()]
        .rfind(is_boundary)
        .map_or(0, |i| i + 1);
    let end = content[gap.end()..]
        .find(is_boundary)
        .map_or(content.len(), |i| gap.end() + i + 1);

    let sentence = content[start..end].trim();
    (!sentence.is_empty()).then(|| sentence.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_separated_rows_are_option_rows() {
        let (number, options) = option_row("4\twent\tgo\tgone\tgoing").unwrap();
        assert_eq!(number, 4);
        assert_eq!(options, vec!["went", "go", "gone", "going"]);
    }

    #[test]
    fn question_lines_are_not_option_rows() {
        assert_eq!(option_row("4. Who wrote it? A. x B. y C. z D. w"), None);
    }

    #[test]
    fn each_passage_keeps_its_own_rows() {
        let text = "\
The boy (1) ____ home. He (2) ____ tired.
1. A. walk B. walked C. walks D. walking
2. A. is B. was C. be D. being
Ama (3) ____ a song. She [4] loves music.
3. A. sang B. sing C. sung D. sings
4. A. really B. real C. reals D. realer
";
        let parsed = parse_cloze(text).passages;
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0.question_range, vec![1, 2]);
        assert_eq!(parsed[1].0.question_range, vec![3, 4]);
        assert_eq!(parsed[1].1[1].question_text, "She [4] loves music.");
    }

    #[test]
    fn missing_gap_falls_back_to_placeholder_text() {
        assert_eq!(gap_sentence("No gaps here.", 9), None);
        let parsed = parse_cloze("Text (1) ____ and (2) ____.\n9. A. a B. b C. c D. d\n").passages;
        assert_eq!(parsed[0].1[0].question_text, "(9) ____");
    }

    #[test]
    fn standard_questions_between_rows_are_kept() {
        let text = "\
Kofi (1) ____ to school early. His sister (2) ____ him at the gate.
1. A. go B. goes C. went D. going
2. A. meet B. met C. meeting D. meets
3. What is the boy's name?
A. Kofi B. Ama C. Yaw D. Esi
Answer: A
Ama (4) ____ a song. She (5) ____ music.
4. A. sang B. sing C. sung D. sings
5. A. love B. loves C. loving D. loved
";
        let parsed = parse_cloze(text);

        assert_eq!(parsed.passages.len(), 2);
        assert_eq!(parsed.passages[0].0.question_range, vec![1, 2]);
        assert_eq!(parsed.passages[1].0.question_range, vec![4, 5]);
        assert!(!parsed.passages[1].0.content.contains("boy's name"));

        assert_eq!(parsed.questions.len(), 1);
        let question = &parsed.questions[0];
        assert_eq!(question.question_number, 3);
        assert_eq!(question.question_text, "What is the boy's name?");
        assert_eq!(question.question_type, QuestionType::MultipleChoice);
        assert_eq!(question.options, vec!["Kofi", "Ama", "Yaw", "Esi"]);
        assert_eq!(question.answer, Some('A'));
    }

    #[test]
    fn numbered_prose_without_options_stays_in_the_passage() {
        let parsed = parse_cloze(
            "1. The boy (1) ____ home.\n2. He (2) ____ tired.\n1. A. a B. b C. c D. d\n2. A. e B. f C. g D. h\n",
        );
        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.passages[0].1.len(), 2);
    }
}
