// src/models/mod.rs

pub mod assessment;
pub mod assessment_result;
pub mod question;
