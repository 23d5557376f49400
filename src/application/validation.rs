//! Field-level form validation errors shared by the post and comment forms.

use std::collections::BTreeMap;

use serde::Serialize;

/// Errors keyed by form field name, each carrying one or more messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(|m| (*field, m.as_str())))
    }
}

pub(crate) fn require_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max_len: usize,
) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "This field is required.");
    } else if trimmed.chars().count() > max_len {
        errors.push(
            field,
            format!("Ensure this value has at most {max_len} characters."),
        );
    }
}
