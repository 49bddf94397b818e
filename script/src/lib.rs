//! Batch jobs for the exam-prep question bank. Every job takes its
//! [`DocumentStore`](bank_utils::store::DocumentStore) as a parameter;
//! `main` hands in a [`store::MongoStore`].
pub mod audit_questions;
pub mod config;
pub mod docx;
pub mod fix_questions;
pub mod import_questions;
pub mod parse_document;
pub mod rebuild_collections;
pub mod redistribute_unclassified;
pub mod report;
pub mod rollup_dashboard;
pub mod source;
pub mod store;
pub mod upload_asset;
