//! Sprint workflow plugin.
//!
//! # Responsibility
//! - Layer a sprint-phase workflow on top of the unconstrained context
//!   state machine, tracked entirely in plugin-scoped data.
//!
//! # Invariants
//! - All bookkeeping lives under the `sprint` key of `plugin_data`; the
//!   core state machine is never constrained.
//! - Phase changes append to `phase_history`, never rewrite it.

use crate::model::context::{Context, ContextState, JsonMap};
use crate::plugin::protocol::{CommandSpec, Plugin, PluginError, PluginResult};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Registry name of the sprint plugin and its `plugin_data` key.
pub const SPRINT_PLUGIN: &str = "sprint";

/// Sprint phases in workflow order: stable id, label, glyph.
const PHASES: &[(&str, &str, &str)] = &[
    ("new", "New Item", "\u{1f195}"),
    ("refinement", "Refinement", "\u{1f4cb}"),
    ("planning", "Planning", "\u{1f4c5}"),
    ("development", "Development", "\u{1f4bb}"),
    ("review", "Code Review", "\u{1f50d}"),
    ("qa-handoff", "QA Handoff", "\u{1f9ea}"),
    ("qa-testing", "QA Testing", "\u{2705}"),
    ("stage", "Stage Deploy", "\u{1f680}"),
    ("production", "Production", "\u{1f3af}"),
];

fn phase_entry(phase: &str) -> Option<(&'static str, &'static str)> {
    PHASES
        .iter()
        .find(|(id, _, _)| *id == phase)
        .map(|(_, label, glyph)| (*label, *glyph))
}

fn phase_ids() -> Vec<&'static str> {
    PHASES.iter().map(|(id, _, _)| *id).collect()
}

/// Ticket-shaped names (`ABC-123`, optionally with a suffix) opt a context
/// into sprint tracking automatically at creation.
fn looks_like_ticket(name: &str) -> bool {
    let Some((prefix, rest)) = name.split_once('-') else {
        return false;
    };
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    rest.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn history_entry(phase: &str, note: &str) -> Value {
    json!({
        "phase": phase,
        "timestamp": Utc::now().to_rfc3339(),
        "note": note,
    })
}

fn seed_doc(name: &str) -> JsonMap {
    let mut doc = JsonMap::new();
    doc.insert("phase".to_string(), json!("new"));
    doc.insert("branch".to_string(), json!(format!("feature/{name}")));
    doc.insert("pr_number".to_string(), Value::Null);
    doc.insert("pr_url".to_string(), Value::Null);
    doc.insert("test_results".to_string(), json!([]));
    doc.insert(
        "phase_history".to_string(),
        json!([history_entry("new", "Sprint tracking initialized")]),
    );
    doc
}

/// First-party plugin tracking sprint phases per context.
///
/// The core never enforces a workflow; this plugin layers one on by
/// observing lifecycle events and recording phases in `plugin_data`.
#[derive(Debug, Default)]
pub struct SprintPlugin;

impl SprintPlugin {
    pub fn new() -> Self {
        Self
    }

    fn advance_phase(&self, context: &mut Context, phase: &str, note: &str) {
        let Some(doc) = context.plugin_data.get_mut(SPRINT_PLUGIN) else {
            return;
        };
        doc.insert("phase".to_string(), json!(phase));
        if let Some(Value::Array(history)) = doc.get_mut("phase_history") {
            history.push(history_entry(phase, note));
        }
        if let Some((label, glyph)) = phase_entry(phase) {
            context.add_note(format!("Sprint phase: {label} {glyph} - {note}"), vec![]);
        }
    }
}

impl Plugin for SprintPlugin {
    fn name(&self) -> &str {
        SPRINT_PLUGIN
    }

    fn description(&self) -> &str {
        "Sprint lifecycle tracking for ticket-shaped contexts"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn commands(&self) -> BTreeMap<String, CommandSpec> {
        BTreeMap::from([
            (
                "sprint-init".to_string(),
                CommandSpec::new("Initialize sprint tracking for a context"),
            ),
            (
                "sprint-phase".to_string(),
                CommandSpec::new("Update the sprint phase"),
            ),
            (
                "sprint-info".to_string(),
                CommandSpec::new("Show sprint information"),
            ),
        ])
    }

    fn run_command(
        &mut self,
        command: &str,
        context: Option<&mut Context>,
        args: &[String],
    ) -> Result<String, PluginError> {
        let context = context.ok_or_else(|| {
            PluginError::InvalidArgs(format!("`{command}` needs a target context"))
        })?;

        match command {
            "sprint-init" => {
                if context.plugin_data.contains_key(SPRINT_PLUGIN) {
                    return Ok("Sprint tracking already initialized".to_string());
                }
                let mut doc = seed_doc(&context.name);
                if let Some(branch) = args.first() {
                    doc.insert("branch".to_string(), json!(branch));
                }
                context.set_plugin_data(SPRINT_PLUGIN, doc);
                context.add_note("Sprint tracking initialized", vec![]);
                Ok("Sprint tracking initialized successfully".to_string())
            }
            "sprint-phase" => {
                let phase = args.first().ok_or_else(|| {
                    PluginError::InvalidArgs("`sprint-phase` needs a phase argument".to_string())
                })?;
                let Some((label, glyph)) = phase_entry(phase) else {
                    return Err(PluginError::InvalidArgs(format!(
                        "unknown phase `{phase}`; valid phases: {}",
                        phase_ids().join(", ")
                    )));
                };
                let Some(doc) = context.plugin_data.get(SPRINT_PLUGIN) else {
                    return Ok(
                        "Sprint tracking not initialized. Run `sprint-init` first.".to_string()
                    );
                };
                let old_phase = doc
                    .get("phase")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                if old_phase == *phase {
                    return Ok(format!("Already in phase: {phase}"));
                }
                let note = match args.get(1) {
                    Some(note) => note.clone(),
                    None => format!("Phase updated from {old_phase} to {phase}"),
                };
                self.advance_phase(context, phase, &note);
                let state = context.state;
                context.set_state(state, Some(glyph));
                Ok(format!("Phase updated to: {label} {glyph}"))
            }
            "sprint-info" => {
                let Some(doc) = context.plugin_data.get(SPRINT_PLUGIN) else {
                    return Ok("No sprint tracking data available".to_string());
                };
                let phase = doc.get("phase").and_then(Value::as_str).unwrap_or("unknown");
                let (label, glyph) = phase_entry(phase).unwrap_or(("Unknown", "\u{2753}"));

                let mut lines = vec![
                    "Sprint Information:".to_string(),
                    format!("Current Phase: {label} {glyph}"),
                ];
                if let Some(branch) = doc.get("branch").and_then(Value::as_str) {
                    lines.push(format!("Branch: {branch}"));
                }
                if let Some(pr_number) = doc.get("pr_number").and_then(Value::as_i64) {
                    let pr_url = doc.get("pr_url").and_then(Value::as_str).unwrap_or("");
                    lines.push(format!("PR: #{pr_number} {pr_url}"));
                }
                if let Some(history) = doc.get("phase_history").and_then(Value::as_array) {
                    if history.len() > 1 {
                        lines.push("Phase History (last 5):".to_string());
                        for entry in history.iter().rev().take(5).rev() {
                            let phase = entry.get("phase").and_then(Value::as_str).unwrap_or("?");
                            let note = entry.get("note").and_then(Value::as_str).unwrap_or("");
                            lines.push(format!("  {phase}: {note}"));
                        }
                    }
                }
                Ok(lines.join("\n"))
            }
            other => Err(PluginError::UnknownCommand {
                plugin: SPRINT_PLUGIN.to_string(),
                command: other.to_string(),
            }),
        }
    }

    fn on_context_created(&mut self, context: &mut Context) -> PluginResult {
        if !looks_like_ticket(&context.name) {
            return Ok(());
        }
        context.set_plugin_data(SPRINT_PLUGIN, seed_doc(&context.name));
        if let Some((_, glyph)) = phase_entry("new") {
            context.set_state(ContextState::Active, Some(glyph));
        }
        Ok(())
    }

    fn on_state_changed(&mut self, context: &mut Context, new_state: ContextState) -> PluginResult {
        if !context.plugin_data.contains_key(SPRINT_PLUGIN) {
            return Ok(());
        }
        let phase = match new_state {
            ContextState::InProgress => "development",
            ContextState::InReview => "review",
            ContextState::Pending => "qa-handoff",
            ContextState::Completed => "production",
            _ => return Ok(()),
        };
        let note = format!("Auto-updated from state change to {}", new_state.as_str());
        self.advance_phase(context, phase, &note);
        Ok(())
    }

    fn status_info(&self, context: &Context) -> Option<String> {
        let doc = context.plugin_data.get(SPRINT_PLUGIN)?;
        let phase = doc.get("phase").and_then(Value::as_str).unwrap_or("unknown");
        let (label, _) = phase_entry(phase).unwrap_or(("Unknown", ""));

        let mut parts = vec![format!("Sprint Phase: {label}")];
        if let Some(pr_number) = doc.get("pr_number").and_then(Value::as_i64) {
            parts.push(format!("PR: #{pr_number}"));
        }
        if let Some(results) = doc.get("test_results").and_then(Value::as_array) {
            if !results.is_empty() {
                let passed = results
                    .iter()
                    .filter(|entry| entry.get("result").and_then(Value::as_str) == Some("pass"))
                    .count();
                parts.push(format!("Tests: {passed}/{} passed", results.len()));
            }
        }
        Some(parts.join(" | "))
    }

    fn prompt_info(&self, context: &Context) -> Option<String> {
        let doc = context.plugin_data.get(SPRINT_PLUGIN)?;
        let phase = doc.get("phase").and_then(Value::as_str)?;
        phase_entry(phase).map(|(_, glyph)| glyph.to_string())
    }
}
