//! Plain-text extraction from `.docx` exam papers.
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml`.
//! Each paragraph becomes one line. Each table row becomes one line with its
//! cells joined by tabs, which is how cloze option grids reach the parser.
use anyhow::{Context, Result};
use roxmltree::Node;
use std::{fs::File, io::Read, path::Path};
use zip::ZipArchive;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub fn extract_text(docx_path: &Path) -> Result<String> {
    let file = File::open(docx_path)
        .with_context(|| format!("Failed to open DOCX file: {}", docx_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read DOCX as ZIP: {}", docx_path.display()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("Invalid DOCX file: word/document.xml not found")?
        .read_to_string(&mut xml)?;

    document_xml_to_text(&xml)
}

pub fn document_xml_to_text(xml: &str) -> Result<String> {
    let doc = roxmltree::Document::parse(xml).context("word/document.xml is not valid XML")?;
    let body = doc
        .descendants()
        .find(|n| n.has_tag_name((W_NS, "body")))
        .context("word/document.xml has no body")?;

    let mut lines = vec![];
    for node in body.children().filter(Node::is_element) {
        push_block(node, &mut lines);
    }
    Ok(lines.join("\n"))
}

fn push_block(node: Node, lines: &mut Vec<String>) {
    match node.tag_name().name() {
        "p" => lines.push(paragraph_text(node)),
        "tbl" => {
            for row in node.children().filter(|n| n.has_tag_name((W_NS, "tr"))) {
                let cells: Vec<String> = row
                    .children()
                    .filter(|n| n.has_tag_name((W_NS, "tc")))
                    .map(cell_text)
                    .collect();
                lines.push(cells.join("\t"));
            }
        }
        // Content controls wrap ordinary paragraphs and tables
        "sdt" => {
            for content in node.children().filter(|n| n.has_tag_name((W_NS, "sdtContent"))) {
                for child in content.children().filter(Node::is_element) {
                    push_block(child, lines);
                }
            }
        }
        _ => {}
    }
}

fn cell_text(cell: Node) -> String {
    cell.descendants()
        .filter(|n| n.has_tag_name((W_NS, "p")))
        .map(paragraph_text)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Text of the paragraph's runs. Tab stops in paragraph properties are not
/// runs and are skipped.
fn paragraph_text(paragraph: Node) -> String {
    let mut text = String::new();
    for run in paragraph
        .descendants()
        .filter(|n| n.has_tag_name((W_NS, "r")))
    {
        for child in run.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "t" => text.push_str(child.text().unwrap_or_default()),
                "tab" => text.push('\t'),
                "br" | "cr" => text.push('\n'),
                _ => {}
            }
        }
    }
    text
}
