use anyhow::{Context, Result, bail};
use bank_utils::{
    input::{AnswerKey, AnswerKeyFile, QuestionBankFile},
    parser::{ParseContext, ParsedDocument, parse_document},
};
use std::path::Path;

use crate::docx;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Json,
    Text,
    Docx,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(SourceKind::Json),
            Some("txt") => Ok(SourceKind::Text),
            Some("docx") => Ok(SourceKind::Docx),
            _ => bail!("unsupported input file {}: expected .json, .txt or .docx", path.display()),
        }
    }
}

/// Raw text of a `.txt` or `.docx` exam paper.
pub fn read_text(path: &Path) -> Result<String> {
    match SourceKind::from_path(path)? {
        SourceKind::Text => std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display())),
        SourceKind::Docx => docx::extract_text(path),
        SourceKind::Json => bail!("{} is a question bank, not a document", path.display()),
    }
}

/// Loads any supported input as a parsed document, with the answers a JSON
/// question bank carries inline.
pub fn load_document(path: &Path, ctx: &ParseContext) -> Result<(ParsedDocument, AnswerKey)> {
    match SourceKind::from_path(path)? {
        SourceKind::Json => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("unable to read {}", path.display()))?;
            let bank = QuestionBankFile::from_json(&json)
                .with_context(|| format!("{} is not a question bank", path.display()))?;
            Ok(bank.into_document(&ctx.subject, ctx.year)?)
        }
        SourceKind::Text | SourceKind::Docx => {
            let text = read_text(path)?;
            Ok((parse_document(&text, ctx), AnswerKey::default()))
        }
    }
}

pub fn load_answer_key(path: &Path) -> Result<AnswerKey> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    let key = AnswerKeyFile::from_json(&json)
        .with_context(|| format!("{} is not an answer key", path.display()))?;
    Ok(key.into_answer_key()?)
}
