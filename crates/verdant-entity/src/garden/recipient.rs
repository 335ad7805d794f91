//! Alert recipients derived from garden membership.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use verdant_core::error::AppError;
use verdant_core::types::UserId;

use crate::text_enum::impl_text_column;

/// How a recipient relates to the garden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    /// The garden owner.
    Owner,
    /// A user with an active collaborator relationship.
    Collaborator,
}

impl RecipientRole {
    /// Return the role as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Collaborator => "collaborator",
        }
    }
}

impl FromStr for RecipientRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "collaborator" => Ok(Self::Collaborator),
            other => Err(AppError::validation(format!("Unknown recipient role '{other}'"))),
        }
    }
}

impl_text_column!(RecipientRole);

/// One member of a garden's audience for an alert.
///
/// Never cached: membership is resolved again for every dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recipient {
    /// Recipient user.
    pub user_id: UserId,
    /// Display name, used when other recipients are told who handled an alert.
    pub username: String,
    /// Owner or collaborator.
    pub role: RecipientRole,
}

impl Recipient {
    /// The garden owner.
    pub fn owner(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            role: RecipientRole::Owner,
        }
    }

    /// A garden collaborator.
    pub fn collaborator(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            role: RecipientRole::Collaborator,
        }
    }
}
