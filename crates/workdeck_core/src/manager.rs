//! Context manager orchestration.
//!
//! # Responsibility
//! - Own the in-memory dataset and be its sole mutator.
//! - Run every operation to completion as mutate, notify plugins, persist
//!   (in the per-operation order documented on each method).
//!
//! # Invariants
//! - The dataset is reloaded once at construction and rewritten whole on
//!   every mutating operation.
//! - Operations fail synchronously with a semantic error or a store error;
//!   plugin hook failures are contained by the registry and never surface
//!   here.

use crate::model::context::{Context, ContextState, JsonMap, Note};
use crate::model::dataset::Dataset;
use crate::plugin::protocol::PluginError;
use crate::plugin::registry::PluginRegistry;
use crate::store::{DatasetStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Semantic failure of a manager operation.
#[derive(Debug)]
pub enum ManagerError {
    /// The named context is absent from the dataset.
    NotFound(String),
    /// Create/import collided with an existing name.
    AlreadyExists(String),
    /// Malformed caller input, e.g. an undecodable import document.
    InvalidInput(String),
    /// Persistence failed; the operation aborted.
    Store(StoreError),
    /// A plugin command handler failed.
    Plugin(PluginError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "context not found: {name}"),
            Self::AlreadyExists(name) => write!(f, "context already exists: {name}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Plugin(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Plugin(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ManagerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PluginError> for ManagerError {
    fn from(value: PluginError) -> Self {
        Self::Plugin(value)
    }
}

/// Orchestrates entity mutation, plugin notification, and persistence.
///
/// Constructed once per process invocation and passed explicitly to
/// callers; there is no hidden global instance.
pub struct ContextManager {
    store: Box<dyn DatasetStore>,
    plugins: PluginRegistry,
    data: Dataset,
}

impl ContextManager {
    /// Loads the dataset from `store` with an empty plugin registry.
    pub fn new(store: Box<dyn DatasetStore>) -> ManagerResult<Self> {
        Self::with_plugins(store, PluginRegistry::new())
    }

    /// Loads the dataset from `store` with a pre-populated registry.
    pub fn with_plugins(store: Box<dyn DatasetStore>, plugins: PluginRegistry) -> ManagerResult<Self> {
        let data = store.load()?;
        info!(
            "event=manager_init module=manager status=ok contexts={} plugins={}",
            data.contexts.len(),
            plugins.len()
        );
        Ok(Self {
            store,
            plugins,
            data,
        })
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    /// Creates a context and makes it active.
    ///
    /// `on_context_created` runs before the save, so plugins can populate
    /// `plugin_data` and `metadata` on the new context and have that state
    /// persisted. The possibly-mutated context is returned.
    pub fn create(
        &mut self,
        name: &str,
        description: &str,
        tags: Vec<String>,
        metadata: JsonMap,
    ) -> ManagerResult<Context> {
        if self.data.contexts.contains_key(name) {
            return Err(ManagerError::AlreadyExists(name.to_string()));
        }

        let mut context = Context::new(name, description, tags, metadata);
        self.plugins.notify_created(&mut context);

        self.data.contexts.insert(name.to_string(), context.clone());
        self.data.active = Some(name.to_string());
        self.persist()?;

        info!("event=context_create module=manager status=ok name={name}");
        Ok(context)
    }

    /// Pure lookup; no side effects, no plugin notification.
    pub fn get(&self, name: &str) -> Option<Context> {
        self.data.contexts.get(name).cloned()
    }

    /// Name of the active context, if any.
    pub fn active_name(&self) -> Option<&str> {
        self.data.active.as_deref()
    }

    /// The active context, if any.
    pub fn get_active(&self) -> Option<Context> {
        self.data
            .active
            .as_ref()
            .and_then(|name| self.data.contexts.get(name))
            .cloned()
    }

    /// All contexts, most recently touched first. The sort is stable, so
    /// ties keep name order.
    pub fn list(&self) -> Vec<Context> {
        let mut contexts: Vec<Context> = self.data.contexts.values().cloned().collect();
        contexts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        contexts
    }

    /// Switches the active context to `name`.
    ///
    /// The previously active context, when different from the target, is
    /// pushed onto the navigation stack first; switching to the already
    /// active context leaves the stack untouched.
    pub fn switch(&mut self, name: &str) -> ManagerResult<Context> {
        if !self.data.contexts.contains_key(name) {
            return Err(ManagerError::NotFound(name.to_string()));
        }

        if let Some(active) = self.data.active.clone() {
            if active != name {
                self.data.stack.push(active);
            }
        }
        self.data.active = Some(name.to_string());
        self.persist()?;

        if let Some(context) = self.data.contexts.get_mut(name) {
            self.plugins.notify_switched(context);
        }
        info!("event=context_switch module=manager status=ok name={name}");
        self.data
            .contexts
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))
    }

    /// Deletes a context.
    ///
    /// When the deleted context was active, the most recent stack entry
    /// that still names a live context is restored, discarding dead
    /// entries along the way; with the stack exhausted the first remaining
    /// context becomes active, or none when the dataset is empty.
    /// `on_context_deleted` fires with the pre-deletion snapshot.
    pub fn delete(&mut self, name: &str) -> ManagerResult<()> {
        let snapshot = self
            .data
            .contexts
            .remove(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        if self.data.active.as_deref() == Some(name) {
            self.data.active = self.restore_previous();
        }
        self.persist()?;

        self.plugins.notify_deleted(&snapshot);
        info!(
            "event=context_delete module=manager status=ok name={name} active={}",
            self.data.active.as_deref().unwrap_or("none")
        );
        Ok(())
    }

    fn restore_previous(&mut self) -> Option<String> {
        while let Some(previous) = self.data.stack.pop() {
            if self.data.contexts.contains_key(&previous) {
                return Some(previous);
            }
        }
        self.data.contexts.keys().next().cloned()
    }

    /// Sets a context's state; see [`Context::set_state`] for the emoji
    /// rules.
    pub fn set_state(
        &mut self,
        name: &str,
        state: ContextState,
        custom_emoji: Option<&str>,
    ) -> ManagerResult<()> {
        let context = self
            .data
            .contexts
            .get_mut(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        context.set_state(state, custom_emoji);
        self.persist()?;

        if let Some(context) = self.data.contexts.get_mut(name) {
            self.plugins.notify_state_changed(context, state);
        }
        info!(
            "event=context_state module=manager status=ok name={name} state={}",
            state.as_str()
        );
        Ok(())
    }

    /// Appends a note to a context and returns it.
    pub fn add_note(&mut self, name: &str, text: &str, tags: Vec<String>) -> ManagerResult<Note> {
        let context = self
            .data
            .contexts
            .get_mut(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        let note = context.add_note(text, tags);
        self.persist()?;

        if let Some(context) = self.data.contexts.get_mut(name) {
            self.plugins.notify_note_added(context, &note);
        }
        Ok(note)
    }

    /// Removes every note from a context. No plugin hook fires.
    pub fn clear_notes(&mut self, name: &str) -> ManagerResult<()> {
        let context = self
            .data
            .contexts
            .get_mut(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        context.clear_notes();
        self.persist()
    }

    /// Alias for [`ContextManager::switch`]; the push semantics live
    /// entirely in `switch`'s stack handling.
    pub fn push(&mut self, name: &str) -> ManagerResult<Context> {
        self.switch(name)
    }

    /// Pops the most recent stack entry and switches to it.
    ///
    /// Exactly one attempt is made: an empty stack or a stale entry (the
    /// named context no longer exists) yields `None` without unwinding
    /// deeper. A successful pop delegates to `switch`, which re-pushes the
    /// context being left.
    pub fn pop(&mut self) -> ManagerResult<Option<Context>> {
        let Some(previous) = self.data.stack.pop() else {
            return Ok(None);
        };
        if !self.data.contexts.contains_key(&previous) {
            info!("event=context_pop module=manager status=stale name={previous}");
            return Ok(None);
        }
        self.switch(&previous).map(Some)
    }

    /// Stack entries oldest-first, most recent last.
    pub fn peek_stack(&self) -> Vec<String> {
        self.data.stack.entries().to_vec()
    }

    /// Case-insensitive substring search over name, description, note
    /// texts, and tags; results keep [`ContextManager::list`] order.
    pub fn search(&self, query: &str) -> Vec<Context> {
        let needle = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|context| context_matches(context, &needle))
            .collect()
    }

    pub fn filter_by_state(&self, state: ContextState) -> Vec<Context> {
        self.list()
            .into_iter()
            .filter(|context| context.state == state)
            .collect()
    }

    pub fn filter_by_tag(&self, tag: &str) -> Vec<Context> {
        self.list()
            .into_iter()
            .filter(|context| context.tags.iter().any(|entry| entry == tag))
            .collect()
    }

    /// Canonical document form of a context.
    pub fn export_context(&self, name: &str) -> ManagerResult<serde_json::Value> {
        let context = self
            .data
            .contexts
            .get(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        Ok(serde_json::to_value(context).map_err(StoreError::Encode)?)
    }

    /// Imports a context from its canonical document form.
    ///
    /// The active context is not reassigned. Fires `on_context_imported`.
    pub fn import_context(
        &mut self,
        document: serde_json::Value,
        overwrite: bool,
    ) -> ManagerResult<Context> {
        let context: Context = serde_json::from_value(document)
            .map_err(|err| ManagerError::InvalidInput(format!("malformed context document: {err}")))?;
        let name = context.name.clone();

        if !overwrite && self.data.contexts.contains_key(&name) {
            return Err(ManagerError::AlreadyExists(name));
        }

        self.data.contexts.insert(name.clone(), context);
        self.persist()?;

        if let Some(context) = self.data.contexts.get_mut(&name) {
            self.plugins.notify_imported(context);
        }
        info!("event=context_import module=manager status=ok name={name}");
        self.data
            .contexts
            .get(&name)
            .cloned()
            .ok_or(ManagerError::NotFound(name))
    }

    /// Replaces the plugin-scoped document for one context and persists
    /// immediately.
    pub fn set_plugin_data(
        &mut self,
        context_name: &str,
        plugin_name: &str,
        data: JsonMap,
    ) -> ManagerResult<()> {
        let context = self
            .data
            .contexts
            .get_mut(context_name)
            .ok_or_else(|| ManagerError::NotFound(context_name.to_string()))?;
        context.set_plugin_data(plugin_name, data);
        self.persist()
    }

    /// Plugin-scoped document for one context; `None` for a missing
    /// context or a missing key, never an error.
    pub fn get_plugin_data(&self, context_name: &str, plugin_name: &str) -> Option<JsonMap> {
        self.data
            .contexts
            .get(context_name)?
            .plugin_data
            .get(plugin_name)
            .cloned()
    }

    /// Aggregated plugin status lines for one context.
    pub fn status_info(&self, name: &str) -> ManagerResult<Vec<String>> {
        let context = self
            .data
            .contexts
            .get(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        Ok(self.plugins.status_info(context))
    }

    /// Aggregated plugin prompt fragments for one context.
    pub fn prompt_info(&self, name: &str) -> ManagerResult<Vec<String>> {
        let context = self
            .data
            .contexts
            .get(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;
        Ok(self.plugins.prompt_info(context))
    }

    /// Runs a plugin command, optionally against a target context, and
    /// persists afterwards so handler mutations become durable.
    pub fn run_plugin_command(
        &mut self,
        plugin_name: &str,
        command: &str,
        context_name: Option<&str>,
        args: &[String],
    ) -> ManagerResult<String> {
        let context = match context_name {
            Some(name) => Some(
                self.data
                    .contexts
                    .get_mut(name)
                    .ok_or_else(|| ManagerError::NotFound(name.to_string()))?,
            ),
            None => None,
        };
        let output = self.plugins.run_command(plugin_name, command, context, args)?;
        self.persist()?;
        Ok(output)
    }

    fn persist(&mut self) -> ManagerResult<()> {
        self.store.save(&self.data)?;
        Ok(())
    }
}

fn context_matches(context: &Context, needle: &str) -> bool {
    context.name.to_lowercase().contains(needle)
        || context.description.to_lowercase().contains(needle)
        || context
            .notes
            .iter()
            .any(|note| note.text.to_lowercase().contains(needle))
        || context
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}
