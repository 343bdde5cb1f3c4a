//! Transient user-facing notifications and the configuration-error panel.

use serde::Serialize;

use crate::error::SchoolMatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// A toast shown once and then dismissed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub variant: NoticeVariant,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: NoticeVariant::Default,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            variant: NoticeVariant::Destructive,
            title: "Error".to_string(),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}

impl From<&SchoolMatchError> for Notice {
    fn from(err: &SchoolMatchError) -> Self {
        Notice::error(err.user_message())
    }
}

/// Static panel replacing the search UI when a required key is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigErrorPanel {
    pub title: String,
    pub message: String,
}

impl ConfigErrorPanel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: "Configuration Error".to_string(),
            message: message.into(),
        }
    }
}
