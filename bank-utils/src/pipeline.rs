//! Parsed documents to stored documents: ids, repairs, collections.
//!
//! Planning is pure. The resulting [`ImportPlan`] turns into write
//! operations keyed by deterministic ids, so importing the same input twice
//! leaves the store unchanged.
use serde::Serialize;
use std::collections::HashSet;

use schema::{Passage, Question, QuestionCollection, collections};

use crate::{
    aggregate::{Grouping, build_collections, collection_write, slug},
    error::Error,
    input::AnswerKey,
    normalize::{AnswerFallback, Triage, prefix_option, repair},
    parser::ParsedDocument,
    store::WriteOp,
};

#[derive(Clone, Debug)]
pub struct ImportContext {
    pub subject: String,
    pub exam_type: String,
    pub year: u16,
    pub answer_fallback: AnswerFallback,
}

/// `{subject}_{year}_q{n}`, or `{subject}_{year}_{section}_q{n}` when the
/// question sits in a section.
pub fn question_id(subject: &str, year: u16, section: Option<&str>, number: u32) -> String {
    match section.map(slug).filter(|s| !s.is_empty()) {
        Some(section) => format!("{}_{year}_{section}_q{number}", slug(subject)),
        None => format!("{}_{year}_q{number}", slug(subject)),
    }
}

/// `{subject}_{year}_passage{n}`, `n` counting from 1 in document order.
pub fn passage_id(subject: &str, year: u16, index: usize) -> String {
    format!("{}_{year}_passage{}", slug(subject), index + 1)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportPlan {
    /// Every question to write, including inactive ones held for review.
    pub questions: Vec<Question>,
    pub passages: Vec<Passage>,
    /// Built from active questions only.
    pub collections: Vec<QuestionCollection>,
    pub manual_review: Vec<String>,
    /// Placeholders that are not written.
    pub skipped: Vec<String>,
    pub duplicates: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub questions: usize,
    pub active: usize,
    pub passages: usize,
    pub collections: usize,
    pub manual_review: Vec<String>,
    pub skipped: Vec<String>,
    pub duplicates: Vec<String>,
}

#[tracing::instrument(skip_all, fields(subject = %ctx.subject, year = ctx.year))]
pub fn plan_import(
    document: &ParsedDocument,
    answers: &AnswerKey,
    ctx: &ImportContext,
) -> Result<ImportPlan, Error> {
    let mut plan = ImportPlan::default();

    let passage_ids: Vec<String> = (0..document.passages.len())
        .map(|i| passage_id(&ctx.subject, ctx.year, i))
        .collect();
    for (passage, id) in document.passages.iter().zip(&passage_ids) {
        plan.passages.push(Passage {
            id: id.clone(),
            content: passage.content.clone(),
            title: None,
            section: passage.section.clone(),
            question_range: passage.question_range.clone(),
            subject: ctx.subject.clone(),
            exam_type: ctx.exam_type.clone(),
            year: ctx.year,
        });
    }

    let mut seen = HashSet::new();
    for parsed in &document.questions {
        let id = question_id(
            &ctx.subject,
            ctx.year,
            parsed.section.as_deref(),
            parsed.question_number,
        );
        if !seen.insert(id.clone()) {
            tracing::warn!(id = %id, "duplicate question number, keeping the first");
            plan.duplicates.push(id);
            continue;
        }
        if parsed.question_text.trim().is_empty() {
            tracing::warn!(id = %id, "question has no text");
            plan.skipped.push(id);
            continue;
        }

        // The answer key wins over an answer line found in the document
        let correct_answer = answers
            .get(parsed.question_number)
            .map(str::to_string)
            .or_else(|| parsed.answer.map(String::from));

        let raw = Question {
            id: id.clone(),
            question_text: parsed.question_text.clone(),
            question_type: parsed.question_type,
            subject: ctx.subject.clone(),
            exam_type: ctx.exam_type.clone(),
            year: ctx.year,
            section: parsed.section.clone(),
            question_number: parsed.question_number,
            // Parsed options are bare bodies; prefix them without stripping
            options: parsed
                .options
                .iter()
                .enumerate()
                .map(|(i, body)| prefix_option(body, i))
                .collect(),
            correct_answer,
            answer_text: None,
            passage_id: parsed.passage.and_then(|i| passage_ids.get(i).cloned()),
            topic: parsed.topic.clone(),
            is_active: true,
        };

        let repaired = repair(&raw, ctx.answer_fallback);
        match repaired.triage {
            Triage::Delete => {
                tracing::warn!(id = %id, "placeholder question without options");
                plan.skipped.push(id);
            }
            Triage::ManualReview => {
                tracing::warn!(id = %id, issues = ?repaired.issues, "question needs manual review");
                plan.manual_review.push(id);
                plan.questions.push(Question {
                    is_active: false,
                    ..repaired.question
                });
            }
            Triage::Valid | Triage::AutoFixed => plan.questions.push(repaired.question),
        }
    }

    let active: Vec<Question> = plan
        .questions
        .iter()
        .filter(|q| q.is_active)
        .cloned()
        .collect();
    plan.collections = build_collections(&active, Grouping::Exam)?;
    plan.collections
        .extend(build_collections(&active, Grouping::Topic)?);

    tracing::info!(
        questions = plan.questions.len(),
        passages = plan.passages.len(),
        collections = plan.collections.len(),
        manual_review = plan.manual_review.len(),
        skipped = plan.skipped.len(),
        "planned import"
    );
    Ok(plan)
}

impl ImportPlan {
    /// Questions and passages first, then the collections that reference
    /// them.
    pub fn writes(&self) -> Result<Vec<WriteOp>, Error> {
        let mut ops = Vec::with_capacity(
            self.questions.len() + self.passages.len() + self.collections.len(),
        );
        for question in &self.questions {
            ops.push(WriteOp::upsert(collections::QUESTIONS, &question.id, question)?);
        }
        for passage in &self.passages {
            ops.push(WriteOp::upsert(collections::PASSAGES, &passage.id, passage)?);
        }
        for collection in &self.collections {
            ops.push(collection_write(collection)?);
        }
        Ok(ops)
    }

    /// Topic collections span years and exam types, so an import only
    /// replaces its own questions in them. Ids of other questions already
    /// stored stay first, in their stored order; stored topic collections
    /// the import no longer places its questions in lose those ids.
    pub fn merge_stored_collections(&mut self, stored: &[QuestionCollection]) {
        let imported: HashSet<&str> = self
            .questions
            .iter()
            .map(|q| q.id.as_str())
            .chain(self.skipped.iter().map(String::as_str))
            .collect();
        let retained = |collection: &QuestionCollection| -> Vec<String> {
            collection
                .question_ids
                .iter()
                .filter(|id| !imported.contains(id.as_str()))
                .cloned()
                .collect()
        };

        let mut merged = vec![];
        for planned in &mut self.collections {
            if !Grouping::Topic.owns(planned) {
                continue;
            }
            if let Some(existing) = stored.iter().find(|c| c.id == planned.id) {
                let mut ids = retained(existing);
                ids.extend(
                    planned
                        .question_ids
                        .drain(..)
                        .filter(|id| imported.contains(id.as_str())),
                );
                planned.question_count = ids.len();
                planned.question_ids = ids;
            }
            merged.push(planned.id.clone());
        }

        for existing in stored {
            if !Grouping::Topic.owns(existing) || merged.contains(&existing.id) {
                continue;
            }
            let ids = retained(existing);
            if ids.len() == existing.question_ids.len() {
                continue;
            }
            self.collections.push(QuestionCollection {
                question_count: ids.len(),
                question_ids: ids,
                ..existing.clone()
            });
        }
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            questions: self.questions.len(),
            active: self.questions.iter().filter(|q| q.is_active).count(),
            passages: self.passages.len(),
            collections: self.collections.len(),
            manual_review: self.manual_review.clone(),
            skipped: self.skipped.clone(),
            duplicates: self.duplicates.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::QuestionBankFile,
        parser::{ParseContext, parse_document},
    };
    use schema::QuestionType;
    use std::collections::BTreeMap;

    fn ctx(fallback: AnswerFallback) -> ImportContext {
        ImportContext {
            subject: "Maths".into(),
            exam_type: "BECE".into(),
            year: 2019,
            answer_fallback: fallback,
        }
    }

    #[test]
    fn ids_carry_the_section_when_present() {
        assert_eq!(question_id("Maths", 2019, None, 7), "maths_2019_q7");
        assert_eq!(
            question_id("Integrated Science", 2020, Some("B"), 1),
            "integrated-science_2020_b_q1"
        );
        assert_eq!(passage_id("english", 2021, 0), "english_2021_passage1");
    }

    #[test]
    fn answer_key_takes_priority_over_answer_lines() {
        let text = "1. What is 2+2?\nA. 3 B. 4 C. 5 D. 6\nAnswer: A\n";
        let document = parse_document(
            text,
            &ParseContext {
                subject: "maths".into(),
                year: 2019,
            },
        );
        let key = AnswerKey(BTreeMap::from([(1, "B. 4".to_string())]));

        let plan = plan_import(&document, &key, &ctx(AnswerFallback::ManualReview)).unwrap();

        let question = &plan.questions[0];
        assert_eq!(question.id, "maths_2019_q1");
        assert_eq!(question.options, vec!["A. 3", "B. 4", "C. 5", "D. 6"]);
        assert_eq!(question.correct_answer.as_deref(), Some("B"));
        assert_eq!(question.answer_text.as_deref(), Some("4"));
        assert!(question.is_active);
    }

    #[test]
    fn abbreviated_options_keep_their_text_and_answer() {
        let text = "1. Which carries genetic code?\nA. D.N.A B. Starch C. Lipid D. Water\n";
        let document = parse_document(
            text,
            &ParseContext {
                subject: "science".into(),
                year: 2019,
            },
        );
        let key = AnswerKey(BTreeMap::from([(1, "D".to_string())]));

        let plan = plan_import(&document, &key, &ctx(AnswerFallback::ManualReview)).unwrap();

        let question = &plan.questions[0];
        assert_eq!(
            question.options,
            vec!["A. D.N.A", "B. Starch", "C. Lipid", "D. Water"]
        );
        assert_eq!(question.correct_answer.as_deref(), Some("D"));
        assert_eq!(question.answer_text.as_deref(), Some("Water"));
        assert!(question.is_active);
    }

    #[test]
    fn unresolved_answers_are_held_back_from_collections() {
        let json = r#"[
            { "questionNumber": 1, "questionText": "One?", "options": ["a", "b", "c", "d"], "correctAnswer": "b", "topic": "Sets" },
            { "questionNumber": 2, "questionText": "Two?", "options": ["a", "b", "c", "d"] },
            { "questionNumber": 3, "questionText": "Three?", "options": [] }
        ]"#;
        let (document, key) = QuestionBankFile::from_json(json)
            .unwrap()
            .into_document("maths", 2019)
            .unwrap();

        let plan = plan_import(&document, &key, &ctx(AnswerFallback::ManualReview)).unwrap();

        assert_eq!(plan.questions.len(), 2);
        assert_eq!(plan.manual_review, vec!["maths_2019_q2"]);
        assert!(!plan.questions[1].is_active);
        assert_eq!(plan.skipped, vec!["maths_2019_q3"]);

        let ids: Vec<&str> = plan.collections.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bece_maths_2019_multiple_choice", "maths_topic_sets"]);
        assert!(plan
            .collections
            .iter()
            .all(|c| c.question_ids == vec!["maths_2019_q1"]));
    }

    #[test]
    fn first_option_fallback_activates_unanswered_questions() {
        let json = r#"[{ "questionNumber": 1, "questionText": "One?", "options": ["a", "b", "c", "d"] }]"#;
        let (document, key) = QuestionBankFile::from_json(json)
            .unwrap()
            .into_document("maths", 2019)
            .unwrap();
        let plan = plan_import(&document, &key, &ctx(AnswerFallback::FirstOption)).unwrap();
        assert_eq!(plan.questions[0].correct_answer.as_deref(), Some("A"));
        assert!(plan.manual_review.is_empty());
    }

    #[test]
    fn cloze_questions_reference_their_passage() {
        let text = "\
Kofi (1) ____ to school early. His sister (2) ____ him at the gate.
1. A. go B. goes C. went D. going
2. A. meet B. met C. meeting D. meets
";
        let document = parse_document(
            text,
            &ParseContext {
                subject: "english".into(),
                year: 2021,
            },
        );
        let key = AnswerKey(BTreeMap::from([(1, "C".to_string()), (2, "B".to_string())]));
        let plan = plan_import(&document, &key, &ctx(AnswerFallback::ManualReview)).unwrap();

        assert_eq!(plan.passages.len(), 1);
        assert!(plan
            .questions
            .iter()
            .all(|q| q.passage_id.as_deref() == Some("maths_2019_passage1")));
        assert!(plan.questions.iter().all(|q| q.question_type == QuestionType::Cloze));
        assert_eq!(plan.collections[0].id, "bece_maths_2019_cloze");
    }

    #[test]
    fn duplicate_numbers_keep_the_first_question() {
        let text = "1. First?\nA. a B. b C. c D. d\n1. Again?\nA. e B. f C. g D. h\n";
        let document = parse_document(
            text,
            &ParseContext {
                subject: "maths".into(),
                year: 2019,
            },
        );
        let plan = plan_import(&document, &AnswerKey::default(), &ctx(AnswerFallback::FirstOption))
            .unwrap();
        assert_eq!(plan.questions.len(), 1);
        assert_eq!(plan.questions[0].question_text, "First?");
        assert_eq!(plan.duplicates, vec!["maths_2019_q1"]);
    }

    #[test]
    fn stored_topic_collections_keep_other_years() {
        let json = r#"[
            { "questionNumber": 1, "questionText": "One?", "options": ["a", "b", "c", "d"], "correctAnswer": "A", "topic": "Sets" },
            { "questionNumber": 2, "questionText": "Two?", "options": ["a", "b", "c", "d"], "correctAnswer": "A", "topic": "Sets" }
        ]"#;
        let (document, key) = QuestionBankFile::from_json(json)
            .unwrap()
            .into_document("maths", 2019)
            .unwrap();
        let mut plan = plan_import(&document, &key, &ctx(AnswerFallback::ManualReview)).unwrap();

        let sets = QuestionCollection {
            id: "maths_topic_sets".into(),
            topic: Some("Sets".into()),
            question_ids: vec!["maths_2018_q4".into(), "maths_2019_q2".into()],
            question_count: 2,
            ..Default::default()
        };
        let algebra = QuestionCollection {
            id: "maths_topic_algebra".into(),
            topic: Some("Algebra".into()),
            question_ids: vec!["maths_2019_q1".into(), "maths_2017_q9".into()],
            question_count: 2,
            ..Default::default()
        };
        plan.merge_stored_collections(&[sets, algebra]);

        let find = |id: &str| plan.collections.iter().find(|c| c.id == id).unwrap();
        assert_eq!(
            find("maths_topic_sets").question_ids,
            vec!["maths_2018_q4", "maths_2019_q1", "maths_2019_q2"]
        );
        assert_eq!(find("maths_topic_algebra").question_ids, vec!["maths_2017_q9"]);
        assert!(plan.collections.iter().all(|c| c.question_count == c.question_ids.len()));

        // Merging the same stored state again changes nothing
        let before = plan.collections.clone();
        let stored = plan.collections.clone();
        plan.merge_stored_collections(&stored);
        assert_eq!(plan.collections, before);
    }

    #[test]
    fn writes_put_collections_last() {
        let json = r#"[{ "questionNumber": 1, "questionText": "One?", "options": ["a", "b", "c", "d"], "correctAnswer": "A" }]"#;
        let (document, key) = QuestionBankFile::from_json(json)
            .unwrap()
            .into_document("maths", 2019)
            .unwrap();
        let plan = plan_import(&document, &key, &ctx(AnswerFallback::ManualReview)).unwrap();
        let writes = plan.writes().unwrap();
        let targets: Vec<&str> = writes.iter().map(WriteOp::collection).collect();
        assert_eq!(targets, vec!["questions", "questionCollections"]);
        assert_eq!(plan.summary().active, 1);
    }
}
