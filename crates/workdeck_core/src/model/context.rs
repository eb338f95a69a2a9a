//! Context domain model.
//!
//! # Responsibility
//! - Define the context record, its note history, and the state enumeration.
//! - Provide lifecycle mutators that keep `updated_at` monotonic.
//!
//! # Invariants
//! - `name` is assigned at creation and never changes.
//! - `updated_at >= created_at` at all times.
//! - `custom_emoji` is cleared when a non-custom state is set without an
//!   explicit emoji.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON object used for free-form metadata and plugin-scoped documents.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Default window for [`Context::recent_notes`].
pub const DEFAULT_RECENT_NOTES: usize = 5;

/// Lifecycle state of a context, each with a display glyph.
///
/// The enumeration is closed, but parsing is deliberately lossy: any
/// unrecognized string degrades to [`ContextState::Custom`] instead of
/// failing. The serde representation shares the same parser, so the wire
/// format and programmatic parsing always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextState {
    Active,
    InProgress,
    OnHold,
    InReview,
    Blocked,
    Pending,
    Completed,
    Cancelled,
    Custom,
}

impl ContextState {
    /// Stable string form used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InProgress => "in-progress",
            Self::OnHold => "on-hold",
            Self::InReview => "in-review",
            Self::Blocked => "blocked",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Custom => "custom",
        }
    }

    /// Display glyph for this state. `custom` carries a placeholder; the
    /// effective glyph of a custom-state context comes from its
    /// `custom_emoji` field.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Active => "\u{1f535}",
            Self::InProgress => "\u{1f4bb}",
            Self::OnHold => "\u{23f8}\u{fe0f}",
            Self::InReview => "\u{1f440}",
            Self::Blocked => "\u{1f6ab}",
            Self::Pending => "\u{23f3}",
            Self::Completed => "\u{2705}",
            Self::Cancelled => "\u{274c}",
            Self::Custom => "\u{1f538}",
        }
    }

    /// Parses a state from its string form.
    ///
    /// Unrecognized values yield [`ContextState::Custom`], never an error.
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "in-progress" => Self::InProgress,
            "on-hold" => Self::OnHold,
            "in-review" => Self::InReview,
            "blocked" => Self::Blocked,
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Custom,
        }
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::Active
    }
}

impl From<String> for ContextState {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ContextState> for String {
    fn from(value: ContextState) -> Self {
        value.as_str().to_string()
    }
}

/// A timestamped note attached to a context.
///
/// Notes are immutable once created: they are appended through
/// [`Context::add_note`] and only ever removed in bulk via
/// [`Context::clear_notes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A named unit of tracked work.
///
/// Fields are public for read access and serialization; mutation goes
/// through the methods below so `updated_at` stays monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier, fixed at creation.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: ContextState,
    /// Caller-supplied glyph override; meaningful for the custom state.
    #[serde(default)]
    pub custom_emoji: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Append-only, insertion order.
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub metadata: JsonMap,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Per-plugin documents keyed by plugin name.
    #[serde(default)]
    pub plugin_data: BTreeMap<String, JsonMap>,
}

impl Context {
    /// Creates a context in the `active` state with both instants set to
    /// the current time.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
        metadata: JsonMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            state: ContextState::Active,
            custom_emoji: None,
            created_at: now,
            updated_at: now,
            notes: Vec::new(),
            metadata,
            tags,
            plugin_data: BTreeMap::new(),
        }
    }

    /// Effective display glyph: `custom_emoji` when set, else the state
    /// glyph.
    pub fn glyph(&self) -> &str {
        match &self.custom_emoji {
            Some(emoji) if !emoji.is_empty() => emoji,
            _ => self.state.glyph(),
        }
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Last `count` notes in chronological order, most recent last.
    pub fn recent_notes(&self, count: usize) -> &[Note] {
        let start = self.notes.len().saturating_sub(count);
        &self.notes[start..]
    }

    /// Appends a note stamped with the current instant and returns it.
    ///
    /// Empty text is permitted.
    pub fn add_note(&mut self, text: impl Into<String>, tags: Vec<String>) -> Note {
        let note = Note {
            timestamp: Utc::now(),
            text: text.into(),
            tags,
        };
        self.notes.push(note.clone());
        self.touch();
        note
    }

    /// Removes every note.
    pub fn clear_notes(&mut self) {
        self.notes.clear();
        self.touch();
    }

    /// Updates the state.
    ///
    /// A non-empty `custom_emoji` is adopted as the glyph override;
    /// otherwise a transition to a non-custom state clears any previous
    /// override.
    pub fn set_state(&mut self, state: ContextState, custom_emoji: Option<&str>) {
        self.state = state;
        match custom_emoji {
            Some(emoji) if !emoji.is_empty() => {
                self.custom_emoji = Some(emoji.to_string());
            }
            _ => {
                if state != ContextState::Custom {
                    self.custom_emoji = None;
                }
            }
        }
        self.touch();
    }

    /// Replaces the plugin-scoped document for `plugin`.
    pub fn set_plugin_data(&mut self, plugin: impl Into<String>, data: JsonMap) {
        self.plugin_data.insert(plugin.into(), data);
        self.touch();
    }

    // Clamped against clock regressions so updated_at never decreases.
    fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }
}
