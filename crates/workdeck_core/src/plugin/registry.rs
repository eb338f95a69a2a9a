//! Plugin registry and event dispatcher.
//!
//! # Responsibility
//! - Hold registered plugins in registration order.
//! - Fan lifecycle events out to every plugin, isolating failures.
//! - Aggregate status/prompt contributions and command maps.
//!
//! # Invariants
//! - Registration is idempotent: re-registering a name replaces the plugin
//!   in place, keeping its original position in the order.
//! - A hook error is logged and never stops the remaining plugins nor
//!   propagates to the manager.

use crate::model::context::{Context, ContextState, Note};
use crate::plugin::protocol::{CommandSpec, Plugin, PluginError, PluginResult};
use log::error;
use std::collections::BTreeMap;

/// Ordered collection of plugins with fail-isolating event fan-out.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under its own name.
    ///
    /// Last registration for a given name wins; the replacement keeps the
    /// original registration position.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        let name = plugin.name().to_string();
        match self.plugins.iter_mut().find(|entry| entry.name() == name) {
            Some(slot) => *slot = plugin,
            None => self.plugins.push(plugin),
        }
    }

    /// Removes the plugin registered as `name`, if any.
    pub fn unregister(&mut self, name: &str) {
        self.plugins.retain(|plugin| plugin.name() != name);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.name() == name)
            .map(Box::as_ref)
    }

    /// Plugin names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Commands of every plugin that advertises any, keyed by plugin name.
    pub fn all_commands(&self) -> BTreeMap<String, BTreeMap<String, CommandSpec>> {
        let mut commands = BTreeMap::new();
        for plugin in &self.plugins {
            let plugin_commands = plugin.commands();
            if !plugin_commands.is_empty() {
                commands.insert(plugin.name().to_string(), plugin_commands);
            }
        }
        commands
    }

    /// Dispatches one command on one plugin.
    pub fn run_command(
        &mut self,
        plugin_name: &str,
        command: &str,
        context: Option<&mut Context>,
        args: &[String],
    ) -> Result<String, PluginError> {
        let plugin = self
            .plugins
            .iter_mut()
            .find(|plugin| plugin.name() == plugin_name)
            .ok_or_else(|| PluginError::UnknownPlugin(plugin_name.to_string()))?;
        plugin.run_command(command, context, args)
    }

    pub fn notify_created(&mut self, context: &mut Context) {
        self.dispatch("context_created", |plugin| {
            plugin.on_context_created(context)
        });
    }

    pub fn notify_switched(&mut self, context: &mut Context) {
        self.dispatch("context_switched", |plugin| {
            plugin.on_context_switched(context)
        });
    }

    pub fn notify_deleted(&mut self, context: &Context) {
        self.dispatch("context_deleted", |plugin| {
            plugin.on_context_deleted(context)
        });
    }

    pub fn notify_imported(&mut self, context: &mut Context) {
        self.dispatch("context_imported", |plugin| {
            plugin.on_context_imported(context)
        });
    }

    pub fn notify_state_changed(&mut self, context: &mut Context, new_state: ContextState) {
        self.dispatch("state_changed", |plugin| {
            plugin.on_state_changed(context, new_state)
        });
    }

    pub fn notify_note_added(&mut self, context: &mut Context, note: &Note) {
        self.dispatch("note_added", |plugin| plugin.on_note_added(context, note));
    }

    /// Non-empty status contributions, in registration order.
    pub fn status_info(&self, context: &Context) -> Vec<String> {
        self.plugins
            .iter()
            .filter_map(|plugin| plugin.status_info(context))
            .filter(|info| !info.is_empty())
            .collect()
    }

    /// Non-empty prompt contributions, in registration order.
    pub fn prompt_info(&self, context: &Context) -> Vec<String> {
        self.plugins
            .iter()
            .filter_map(|plugin| plugin.prompt_info(context))
            .filter(|info| !info.is_empty())
            .collect()
    }

    // Every fan-out goes through here so the isolation policy lives in one
    // place: log the failing plugin, keep going.
    fn dispatch<F>(&mut self, hook: &str, mut invoke: F)
    where
        F: FnMut(&mut dyn Plugin) -> PluginResult,
    {
        for plugin in &mut self.plugins {
            if let Err(err) = invoke(plugin.as_mut()) {
                error!(
                    "event=plugin_hook module=plugin hook={hook} plugin={} status=error error={}",
                    plugin.name(),
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PluginRegistry;
    use crate::model::context::{Context, JsonMap};
    use crate::plugin::protocol::{Plugin, PluginError, PluginResult};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        fail: bool,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn on_context_created(&mut self, context: &mut Context) -> PluginResult {
            self.seen
                .borrow_mut()
                .push(format!("{}:{}", self.name, context.name));
            if self.fail {
                return Err(PluginError::Failed("boom".to_string()));
            }
            Ok(())
        }

        fn status_info(&self, _context: &Context) -> Option<String> {
            Some(format!("{} status", self.name))
        }
    }

    fn recorder(
        name: &'static str,
        fail: bool,
        seen: &Rc<RefCell<Vec<String>>>,
    ) -> Box<Recorder> {
        Box::new(Recorder {
            name,
            fail,
            seen: Rc::clone(seen),
        })
    }

    #[test]
    fn events_fan_out_in_registration_order_despite_failures() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register(recorder("first", true, &seen));
        registry.register(recorder("second", false, &seen));

        let mut context = Context::new("alpha", "", vec![], JsonMap::new());
        registry.notify_created(&mut context);

        assert_eq!(
            *seen.borrow(),
            vec!["first:alpha".to_string(), "second:alpha".to_string()]
        );
    }

    #[test]
    fn reregistration_replaces_in_place_and_keeps_position() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register(recorder("first", false, &seen));
        registry.register(recorder("second", false, &seen));
        registry.register(recorder("first", true, &seen));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["first", "second"]);
    }

    #[test]
    fn status_info_aggregates_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register(recorder("first", false, &seen));
        registry.register(recorder("second", false, &seen));

        let context = Context::new("alpha", "", vec![], JsonMap::new());
        assert_eq!(
            registry.status_info(&context),
            vec!["first status".to_string(), "second status".to_string()]
        );
    }

    #[test]
    fn run_command_reports_unknown_plugin() {
        let mut registry = PluginRegistry::new();
        let err = registry
            .run_command("ghost", "anything", None, &[])
            .unwrap_err();
        assert_eq!(err, PluginError::UnknownPlugin("ghost".to_string()));
    }
}
