use regex::Regex;
use std::sync::LazyLock;

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:SECTION|Section|PART|Part)\s+([A-Z]|[IVX]{1,4}|\d{1,2})\s*(?:[:.\-–]\s*.*)?$")
        .expect("valid section header regex")
});

#[derive(Debug, PartialEq)]
pub(crate) struct Section {
    pub label: Option<String>,
    pub body: String,
}

/// Splits on header lines such as `SECTION A` or `PART II: Comprehension`.
/// Text before the first header forms an unlabelled section.
pub(crate) fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = vec![];
    let mut current = Section {
        label: None,
        body: String::new(),
    };

    for line in text.lines() {
        if let Some(caps) = SECTION_HEADER.captures(line) {
            let finished = std::mem::replace(
                &mut current,
                Section {
                    label: Some(caps[1].to_string()),
                    body: String::new(),
                },
            );
            if finished.label.is_some() || !finished.body.trim().is_empty() {
                sections.push(finished);
            }
            continue;
        }
        current.body.push_str(line);
        current.body.push('\n');
    }

    if current.label.is_some() || !current.body.trim().is_empty() {
        sections.push(current);
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_split_and_label() {
        let sections = split_sections("intro\nSECTION A\n1. x\nPart II - Essays\n2. y\n");
        let labels: Vec<_> = sections.iter().map(|s| s.label.as_deref()).collect();
        assert_eq!(labels, vec![None, Some("A"), Some("II")]);
        assert_eq!(sections[1].body, "1. x\n");
    }

    #[test]
    fn prose_starting_with_part_is_not_a_header() {
        let sections = split_sections("1. Part A of the passage says what?\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label, None);
    }
}
