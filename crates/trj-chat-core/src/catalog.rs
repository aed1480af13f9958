//! Model directory query.

use serde::Serialize;

use crate::ai::InferenceService;
use crate::error::{ChatError, Result};

/// Installed model identifiers, in the order the service reported them.
///
/// Refreshed on every interaction and never cached across them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn first(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Fails closed: an unreachable service or an empty catalog is an error.
pub async fn fetch_catalog(service: &dyn InferenceService) -> Result<ModelCatalog> {
    let models = match service.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!("model catalog query failed: {}", e);
            return Err(e);
        }
    };

    if models.is_empty() {
        tracing::warn!("model catalog is empty");
        return Err(ChatError::EmptyCatalog);
    }

    Ok(ModelCatalog::new(models))
}
