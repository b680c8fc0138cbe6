use serde::{Deserialize, Serialize};

use crate::types::{ConversationTurn, Role};

/// Role vocabulary the model API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    User,
    Model,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::User => "user",
            ModelRole::Model => "model",
        }
    }
}

/// A conversation turn in the shape sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTurn {
    pub role: ModelRole,
    pub content: String,
}

impl ModelTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::Model,
            content: content.into(),
        }
    }
}

/// Convert chat UI history into a model history that starts with a user turn.
///
/// Everything before the first user turn (the UI's canned greeting, typically)
/// is dropped; with no user turn at all the result is empty.
pub fn normalize_history(history: &[ConversationTurn]) -> Vec<ModelTurn> {
    history
        .iter()
        .skip_while(|turn| turn.role != Role::User)
        .map(|turn| ModelTurn {
            role: match turn.role {
                Role::User => ModelRole::User,
                Role::Assistant => ModelRole::Model,
            },
            content: turn.content.clone(),
        })
        .collect()
}
