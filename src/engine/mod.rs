// src/engine/mod.rs

//! Pure assessment rules: answer capture, scoring and retake eligibility.
//! Nothing in here touches the store.

pub mod answers;
pub mod eligibility;
pub mod scoring;

pub use answers::AnswerSet;
pub use eligibility::{AttemptStatus, Eligibility, evaluate};
pub use scoring::{ScoreSummary, ScoringError, score};
