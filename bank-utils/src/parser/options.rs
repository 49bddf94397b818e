use regex::Regex;
use std::sync::LazyLock;

use super::{MAX_OPTIONS, MIN_OPTIONS};

const LETTERS: [char; MAX_OPTIONS] = ['A', 'B', 'C', 'D', 'E', 'F'];

/// `A.`, `(A)`, `A)` or a lone `A`, optionally followed by the option text.
static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\(([A-F])\)|([A-F])\s*[.)]|([A-F])\s*$)\s*(.*)$")
        .expect("valid option line regex")
});

static BARE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(?[A-F][.)]?\s*$").expect("valid bare letter regex"));

pub(crate) fn is_bare_letter(line: &str) -> bool {
    BARE_LETTER.is_match(line)
}

/// Options packed into the running text, each introduced by `<Letter>.`.
///
/// Markers are searched in letter order, so a stray `C.` inside the question
/// text cannot be taken for an option before `A.` and `B.` were seen.
pub(crate) fn inline(lines: &[String]) -> Option<(String, Vec<String>)> {
    let joined = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    inline_text(&joined)
}

pub(crate) fn inline_text(text: &str) -> Option<(String, Vec<String>)> {
    let mut markers: Vec<(usize, usize)> = vec![];
    let mut from = 0;
    for letter in LETTERS {
        match find_marker(text, letter, from) {
            Some(start) => {
                let end = start + 2;
                markers.push((start, end));
                from = end;
            }
            None => break,
        }
    }
    if markers.len() < MIN_OPTIONS {
        return None;
    }

    let question_text = text[..markers[0].0].trim().to_string();
    let options: Vec<String> = markers
        .iter()
        .enumerate()
        .map(|(i, &(_, end))| {
            let stop = markers.get(i + 1).map_or(text.len(), |&(next, _)| next);
            text[end..stop].trim().to_string()
        })
        .collect();

    if options.iter().any(String::is_empty) {
        return None;
    }
    Some((question_text, options))
}

/// Byte offset of the first `<letter>.` at or after `from` that is not glued
/// to a preceding letter (`DNA.` does not hold an `A.` marker).
fn find_marker(text: &str, letter: char, from: usize) -> Option<usize> {
    let needle = [letter as u8, b'.'];
    let bytes = text.as_bytes();
    (from..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i..i + 2] == needle && (i == 0 || !bytes[i - 1].is_ascii_alphabetic())
    })
}

/// One option per line: a letter marker at the start of the line, with the
/// option text on the same line or on the lines that follow.
pub(crate) fn line_separated(lines: &[String]) -> Option<(String, Vec<String>)> {
    let mut question_lines: Vec<&str> = vec![];
    let mut options: Vec<Vec<&str>> = vec![];

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let expected = LETTERS.get(options.len());
        if let Some((letter, rest)) = option_marker(line) {
            if Some(&letter) == expected {
                options.push(if rest.is_empty() { vec![] } else { vec![rest] });
                continue;
            }
        }
        match options.last_mut() {
            Some(body) => body.push(trimmed),
            None => question_lines.push(trimmed),
        }
    }

    if options.len() < MIN_OPTIONS {
        return None;
    }
    let options: Vec<String> = options.into_iter().map(|body| body.join(" ")).collect();
    if options.iter().any(String::is_empty) {
        return None;
    }
    Some((question_lines.join(" "), options))
}

fn option_marker(line: &str) -> Option<(char, &str)> {
    let caps = OPTION_LINE.captures(line)?;
    let letter = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .chars()
        .next()?;
    let rest = caps.get(4).map_or("", |m| m.as_str().trim());
    Some((letter, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn inline_skips_letters_glued_to_words() {
        let (question, options) =
            inline_text("Which molecule carries DNA. code? A. RNA B. ATP C. CO2 D. H2O").unwrap();
        assert_eq!(question, "Which molecule carries DNA. code?");
        assert_eq!(options, vec!["RNA", "ATP", "CO2", "H2O"]);
    }

    #[test]
    fn inline_reads_up_to_six_options() {
        let (_, options) = inline_text("Pick? A. a B. b C. c D. d E. e F. f").unwrap();
        assert_eq!(options.len(), 6);
    }

    #[test]
    fn inline_rejects_empty_option_bodies() {
        assert_eq!(inline_text("Pick? A. B. C. D."), None);
    }

    #[test]
    fn line_separated_joins_multiline_option_text() {
        let (question, options) = line_separated(&lines(
            "Choose the best\nanswer.\nA\nfirst part\nof option\nB\nsecond\nC\nthird\nD\nfourth",
        ))
        .unwrap();
        assert_eq!(question, "Choose the best answer.");
        assert_eq!(options[0], "first part of option");
        assert_eq!(options[3], "fourth");
    }

    #[test]
    fn line_separated_ignores_out_of_order_letters() {
        let (_, options) =
            line_separated(&lines("Q?\nA) one\nC) stray\nB) two\nC) three\nD) four")).unwrap();
        assert_eq!(options, vec!["one C) stray", "two", "three", "four"]);
    }

    #[test]
    fn line_separated_needs_four_options() {
        assert_eq!(line_separated(&lines("Q?\nA. one\nB. two\nC. three")), None);
    }

    #[test]
    fn bare_letters() {
        assert!(is_bare_letter("A."));
        assert!(is_bare_letter(" (C) "));
        assert!(!is_bare_letter("A. text"));
    }
}
