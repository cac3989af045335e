//! Member profiles.

use serde::{Deserialize, Serialize};

use crate::backend::{Document, from_document, to_document};
use crate::error::UntetheredResult;

/// One registered identity. The uid is the document key, not a stored field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default, skip_serializing)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl Member {
    pub fn from_document(uid: &str, document: Document) -> UntetheredResult<Self> {
        let mut member: Member = from_document(document)?;
        member.uid = uid.to_string();
        Ok(member)
    }

    pub fn to_document(&self) -> UntetheredResult<Document> {
        to_document(self)
    }

    /// Display name, falling back to email, then uid.
    pub fn label(&self) -> &str {
        non_empty(&self.display_name)
            .or_else(|| non_empty(&self.email))
            .unwrap_or(&self.uid)
    }

    /// Short attribution name: display name, else the email's local part.
    pub fn handle(&self) -> Option<String> {
        if let Some(name) = non_empty(&self.display_name) {
            return Some(name.to_string());
        }
        non_empty(&self.email).map(|email| email.split('@').next().unwrap_or(email).to_string())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
