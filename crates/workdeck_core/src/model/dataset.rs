//! The unit of persistence.

use crate::model::context::Context;
use crate::model::stack::ContextStack;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete persisted state: all contexts, the active pointer, and the
/// navigation stack.
///
/// The manager owns the in-memory dataset for the lifetime of the process
/// and rewrites it whole on every mutating operation. Every field defaults
/// independently so partial or missing documents load cleanly.
///
/// Contexts are keyed by name in a `BTreeMap`, which makes "first remaining
/// context" fallbacks deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,
    /// Name of the currently active context, if any.
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub stack: ContextStack,
}

#[cfg(test)]
mod tests {
    use super::Dataset;
    use crate::model::context::{Context, JsonMap};

    #[test]
    fn empty_document_loads_as_default_dataset() {
        let dataset: Dataset = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(dataset, Dataset::default());
        assert_eq!(dataset.stack.max_size(), 10);
    }

    #[test]
    fn dataset_round_trips_through_document_form() {
        let mut dataset = Dataset::default();
        let context = Context::new("alpha", "first", vec![], JsonMap::new());
        dataset.contexts.insert(context.name.clone(), context);
        dataset.active = Some("alpha".to_string());
        dataset.stack.push("alpha");

        let document = serde_json::to_value(&dataset).unwrap();
        let decoded: Dataset = serde_json::from_value(document).unwrap();
        assert_eq!(decoded, dataset);
    }
}
