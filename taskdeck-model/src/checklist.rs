//! Checklist codec and completion aggregation.
//!
//! A task's `description` column stores a JSON-encoded sequence of
//! sections, each holding checkable subtasks. [`Checklist::decode`] is
//! total: malformed or legacy plain-text input degrades to a single
//! synthetic section instead of failing, so no stored description is ever
//! dropped. [`Checklist::encode`] produces the canonical JSON written
//! back on every mutation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Title of the synthetic section wrapping legacy or headless content.
pub const DEFAULT_SECTION_TITLE: &str = "Tasks";

/// JSON `type` tag of a heading section.
const HEADING_TYPE: &str = "heading";

/// Stable identifier for a subtask, based on UUID v7.
///
/// Generated at decode time when the stored JSON predates ids, persisted
/// thereafter. Mutations address subtasks by id, so they keep targeting
/// the same entry across reorders and insertions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtaskId(Uuid);

impl SubtaskId {
    /// Creates a new time-ordered subtask identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `SubtaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubtaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single checkable line item within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Stable identifier; generated when missing from stored JSON.
    #[serde(default)]
    pub id: SubtaskId,
    /// Display text.
    #[serde(default)]
    pub content: String,
    /// Whether the item is checked off.
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    /// Creates an unchecked subtask with a fresh id.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: SubtaskId::new(),
            content: content.into(),
            completed: false,
        }
    }
}

/// One entry of a checklist.
///
/// Only `Heading` sections carry subtasks and contribute to the
/// completion percentage. Sections with an unrecognized `type` tag (or a
/// `heading` tag whose fields do not parse) are kept as `Unknown` so they
/// survive the encode/decode round-trip instead of being silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// A named group of subtasks.
    Heading {
        /// Section title.
        content: String,
        /// Ordered subtasks; may be empty.
        subtasks: Vec<Subtask>,
    },
    /// An unrecognized section, preserved verbatim.
    Unknown(Value),
}

/// Field shape of a heading section in stored JSON.
#[derive(Deserialize)]
struct HeadingFields {
    #[serde(default)]
    content: String,
    #[serde(default)]
    subtasks: Vec<Subtask>,
}

impl Section {
    /// Creates a heading section.
    pub fn heading(content: impl Into<String>, subtasks: Vec<Subtask>) -> Self {
        Self::Heading {
            content: content.into(),
            subtasks,
        }
    }

    fn from_value(value: Value) -> Self {
        if value.get("type").and_then(Value::as_str) == Some(HEADING_TYPE) {
            if let Ok(fields) = serde_json::from_value::<HeadingFields>(value.clone()) {
                return Self::Heading {
                    content: fields.content,
                    subtasks: fields.subtasks,
                };
            }
        }
        Self::Unknown(value)
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Heading { content, subtasks } => serde_json::json!({
                "type": HEADING_TYPE,
                "content": content,
                "subtasks": subtasks,
            }),
            Self::Unknown(value) => value.clone(),
        }
    }
}

/// Errors from id-addressed checklist mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecklistError {
    /// No subtask with the given id exists in any section.
    #[error("subtask not found: {0}")]
    SubtaskNotFound(SubtaskId),
}

/// A flat entry of the task-creation form, before grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEntry {
    /// Starts a new section.
    Heading(String),
    /// Attaches to the most recently started section.
    Subtask(String),
}

/// The decoded nested section/subtask structure stored inside a task's
/// description field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checklist(Vec<Section>);

impl Checklist {
    /// Creates an empty checklist.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Decodes a stored description into a checklist. Total: never fails.
    ///
    /// - `None` or the empty string decode to an empty checklist.
    /// - A JSON array decodes element-wise; members missing `subtasks`
    ///   get an empty sequence, unrecognized members become
    ///   [`Section::Unknown`].
    /// - Anything else — a parse failure or valid non-array JSON alike —
    ///   is wrapped as a single [`DEFAULT_SECTION_TITLE`] section holding
    ///   the raw text as one unchecked subtask, so legacy plain-text
    ///   descriptions stay visible and editable.
    #[must_use]
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        if raw.is_empty() {
            return Self::new();
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => {
                Self(items.into_iter().map(Section::from_value).collect())
            }
            Ok(_) | Err(_) => Self(vec![Section::heading(
                DEFAULT_SECTION_TITLE,
                vec![Subtask::new(raw)],
            )]),
        }
    }

    /// Encodes the checklist as the canonical JSON written back to the
    /// task's description field.
    #[must_use]
    pub fn encode(&self) -> String {
        Value::Array(self.0.iter().map(Section::to_value).collect()).to_string()
    }

    /// Groups the flat entries of a creation form into sections.
    ///
    /// A `Heading` entry starts a new section; `Subtask` entries attach to
    /// the most recently started one. A subtask arriving before any
    /// heading opens a synthetic [`DEFAULT_SECTION_TITLE`] section, and
    /// later headless subtasks keep attaching to whichever section is
    /// open.
    #[must_use]
    pub fn from_draft(entries: &[DraftEntry]) -> Self {
        let mut sections: Vec<(String, Vec<Subtask>)> = Vec::new();
        for entry in entries {
            match entry {
                DraftEntry::Heading(content) => {
                    sections.push((content.clone(), Vec::new()));
                }
                DraftEntry::Subtask(content) => {
                    if sections.is_empty() {
                        sections.push((DEFAULT_SECTION_TITLE.to_string(), Vec::new()));
                    }
                    // Invariant: sections is non-empty here.
                    if let Some((_, subtasks)) = sections.last_mut() {
                        subtasks.push(Subtask::new(content.clone()));
                    }
                }
            }
        }
        Self(
            sections
                .into_iter()
                .map(|(content, subtasks)| Section::Heading { content, subtasks })
                .collect(),
        )
    }

    /// Returns the sections in display order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.0
    }

    /// Returns true if the checklist has no sections at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a section, preserving display order.
    pub fn push_section(&mut self, section: Section) {
        self.0.push(section);
    }

    /// Looks up a subtask by id across all sections.
    #[must_use]
    pub fn find_subtask(&self, id: &SubtaskId) -> Option<&Subtask> {
        self.0.iter().find_map(|section| match section {
            Section::Heading { subtasks, .. } => subtasks.iter().find(|s| s.id == *id),
            Section::Unknown(_) => None,
        })
    }

    /// Sets a subtask's completed flag, returning the prior value.
    ///
    /// # Errors
    ///
    /// Returns [`ChecklistError::SubtaskNotFound`] if no subtask carries
    /// the given id.
    pub fn set_completed(
        &mut self,
        id: &SubtaskId,
        completed: bool,
    ) -> Result<bool, ChecklistError> {
        for section in &mut self.0 {
            if let Section::Heading { subtasks, .. } = section {
                if let Some(subtask) = subtasks.iter_mut().find(|s| s.id == *id) {
                    let prior = subtask.completed;
                    subtask.completed = completed;
                    return Ok(prior);
                }
            }
        }
        Err(ChecklistError::SubtaskNotFound(id.clone()))
    }

    /// Computes the completion percentage over all heading sections.
    ///
    /// `round(completed / total * 100)` when any subtasks exist, else 0.
    /// Unknown sections contribute nothing. The result is persisted next
    /// to the checklist as a cached projection and must be recomputed on
    /// every mutation.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion_percentage(&self) -> u8 {
        let mut total = 0usize;
        let mut completed = 0usize;
        for section in &self.0 {
            if let Section::Heading { subtasks, .. } = section {
                total += subtasks.len();
                completed += subtasks.iter().filter(|s| s.completed).count();
            }
        }
        if total == 0 {
            return 0;
        }
        // Safe: the ratio is within 0..=100.
        (completed as f64 / total as f64 * 100.0).round() as u8
    }
}
