// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, repository::AssessmentRepository, services::AttemptService};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn AssessmentRepository>,
    pub attempts: AttemptService,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<dyn AssessmentRepository>, config: Config) -> Self {
        let attempts = AttemptService::new(repo.clone(), config.default_max_attempts);
        Self {
            repo,
            attempts,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn AssessmentRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for AttemptService {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
