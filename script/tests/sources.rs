use bank_script::{
    import_questions::{FallbackArg, ImportArgs, import_questions},
    parse_document::{ParseArgs, parse_file},
};
use bank_utils::{store::MemoryStore, writer::BatchWriter};
use schema::{Question, collections};
use std::{io::Write, path::Path};
use zip::{CompressionMethod, write::FileOptions};

fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
}

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:body>{body}</w:body></w:document>"
    );
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(
        "word/document.xml",
        FileOptions::default().compression_method(CompressionMethod::Stored),
    )
    .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

const PAPER: &[&str] = &[
    "BECE 2019 MATHEMATICS",
    "1. What is 2+2?",
    "A. 3 B. 4 C. 5 D. 6",
    "Answer: B",
    "2. Which of these is a prime number?",
    "A. 9 B. 15 C. 7 D. 21",
    "Answer: C",
    "4. Simplify 3x + 2x",
    "A. 5x B. 6x C. x D. 5",
];

#[test]
fn docx_papers_parse_like_text() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("maths-2019.docx");
    write_docx(&file, PAPER);
    let out = dir.path().join("parsed.json");

    let outcome = parse_file(&ParseArgs {
        file,
        subject: "Maths".into(),
        year: 2019,
        expected: 4,
        out: Some(out.clone()),
    })
    .unwrap();

    let numbers: Vec<u32> = outcome
        .document
        .questions
        .iter()
        .map(|q| q.question_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 4]);
    assert_eq!(outcome.missing, vec![3]);
    assert_eq!(outcome.document.questions[1].options, vec!["9", "15", "7", "21"]);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(written["missing"], serde_json::json!([3]));
}

#[tokio::test]
async fn docx_import_uses_answer_lines() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("maths-2019.docx");
    write_docx(&file, PAPER);
    let store = MemoryStore::new();

    let summary = import_questions(
        &store,
        &BatchWriter::default(),
        &ImportArgs {
            file,
            answers: None,
            subject: "Maths".into(),
            exam_type: "BECE".into(),
            year: 2019,
            answer_fallback: FallbackArg::ManualReview,
            dry_run: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.questions, 3);
    assert_eq!(summary.manual_review, vec!["maths_2019_q4"]);
    let q2: Question =
        bson::from_document(store.get(collections::QUESTIONS, "maths_2019_q2").unwrap()).unwrap();
    assert_eq!(q2.correct_answer.as_deref(), Some("C"));
    assert_eq!(q2.answer_text.as_deref(), Some("7"));
    assert_eq!(q2.options[2], "C. 7");
    let q4: Question =
        bson::from_document(store.get(collections::QUESTIONS, "maths_2019_q4").unwrap()).unwrap();
    assert!(!q4.is_active);
}

#[test]
fn archives_without_a_body_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.docx");
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(
        "word/styles.xml",
        FileOptions::default().compression_method(CompressionMethod::Stored),
    )
    .unwrap();
    zip.write_all(b"<styles/>").unwrap();
    zip.finish().unwrap();

    let err = bank_script::docx::extract_text(&path).unwrap_err();
    assert!(format!("{err:#}").contains("word/document.xml"));
}
