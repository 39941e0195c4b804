// src/services/mod.rs

pub mod attempts;

pub use attempts::AttemptService;
