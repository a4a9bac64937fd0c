//! Workflow Registry
//!
//! Read-only collection of workflow metadata. The single source of truth
//! the composition root wires handlers from.

mod catalog;
mod metadata;

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{EventFamily, EventType};

pub use catalog::{standard_entries, STANDARD_ENTRY_COUNT};
pub use metadata::{HandlerCategory, WorkflowMetadata};

/// Counts by family and category, for documentation and observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStatistics {
    pub total_entries: usize,
    pub workflows: usize,
    pub operational: usize,
    pub event_classes: usize,
    pub requiring_logging: usize,
    pub requiring_audit: usize,
    pub requiring_notification: usize,
    pub requiring_invalidation: usize,
}

/// Registry of workflow metadata
#[derive(Debug, Clone)]
pub struct WorkflowRegistry {
    entries: Vec<WorkflowMetadata>,
    by_event_type: HashMap<EventType, usize>,
}

impl WorkflowRegistry {
    /// Build a registry from explicit entries.
    ///
    /// Entries are not validated here; a malformed entry is reported by the
    /// compliance check. When an event class is listed twice the first
    /// entry owns it.
    pub fn new(entries: Vec<WorkflowMetadata>) -> Self {
        let mut by_event_type = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            for event_type in &entry.event_classes {
                by_event_type.entry(*event_type).or_insert(index);
            }
        }

        Self {
            entries,
            by_event_type,
        }
    }

    /// Registry holding the standard catalog
    pub fn standard() -> Self {
        Self::new(standard_entries())
    }

    pub fn get_all(&self) -> &[WorkflowMetadata] {
        &self.entries
    }

    pub fn get_by_workflow_name(&self, name: &str) -> Option<&WorkflowMetadata> {
        self.entries.iter().find(|entry| entry.workflow_name == name)
    }

    pub fn get_by_event_type(&self, event_type: EventType) -> Option<&WorkflowMetadata> {
        self.by_event_type
            .get(&event_type)
            .and_then(|index| self.entries.get(*index))
    }

    pub fn contains_event_type(&self, event_type: EventType) -> bool {
        self.by_event_type.contains_key(&event_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let count = |category: HandlerCategory| {
            self.entries
                .iter()
                .filter(|entry| entry.requires(category))
                .count()
        };

        RegistryStatistics {
            total_entries: self.entries.len(),
            workflows: self
                .entries
                .iter()
                .filter(|entry| entry.family == EventFamily::Workflow)
                .count(),
            operational: self
                .entries
                .iter()
                .filter(|entry| entry.family == EventFamily::Operational)
                .count(),
            event_classes: self.entries.iter().map(|entry| entry.event_classes.len()).sum(),
            requiring_logging: count(HandlerCategory::Logging),
            requiring_audit: count(HandlerCategory::Audit),
            requiring_notification: count(HandlerCategory::Notification),
            requiring_invalidation: count(HandlerCategory::Invalidation),
        }
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
