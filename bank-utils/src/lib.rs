//! Question Bank Utility Functions
//!
//! ## Current API
//!
//! - Parse extracted exam text into question records
//! - Validate and repair question records
//! - Group questions into collections and rebalance them
//! - Write documents in bounded, sequential batches
//! - Recompute dashboard roll-ups
//!
pub mod aggregate;
pub mod error;
pub mod input;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod rollup;
pub mod store;
pub mod writer;

pub use error::Error;
