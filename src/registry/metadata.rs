//! Workflow Metadata
//!
//! Declarative description of one registry entry and the handler
//! categories that must react to its events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{EventFamily, EventType, OperationalKind, Workflow, WorkflowState};

/// Cross-cutting handler categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerCategory {
    Logging,
    Audit,
    Notification,
    Invalidation,
}

impl HandlerCategory {
    pub const ALL: [HandlerCategory; 4] = [
        HandlerCategory::Logging,
        HandlerCategory::Audit,
        HandlerCategory::Notification,
        HandlerCategory::Invalidation,
    ];

    /// Handler name used in subscription identities
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerCategory::Logging => "logging",
            HandlerCategory::Audit => "audit",
            HandlerCategory::Notification => "notification",
            HandlerCategory::Invalidation => "invalidation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == name)
    }

    /// Whether this category reacts to the given event class.
    ///
    /// Logging and audit see every state; notification and invalidation
    /// only react to outcomes that actually happened.
    pub fn applies_to(&self, event_type: EventType) -> bool {
        match self {
            HandlerCategory::Logging | HandlerCategory::Audit => true,
            HandlerCategory::Notification | HandlerCategory::Invalidation => event_type
                .state()
                .map_or(true, |state| state == WorkflowState::Succeeded),
        }
    }
}

impl fmt::Display for HandlerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registry entry: a workflow (three classes) or an operational event (one class)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowMetadata {
    pub workflow_name: &'static str,
    pub family: EventFamily,
    pub event_classes: Vec<EventType>,
    pub requires_logging: bool,
    pub requires_audit: bool,
    pub requires_notification: bool,
    pub requires_invalidation: bool,
    /// Key the audit handler classifies records under
    pub audit_action_name: &'static str,
}

impl WorkflowMetadata {
    /// Entry for a three-state workflow, no categories flagged yet
    pub fn for_workflow(workflow: Workflow, audit_action_name: &'static str) -> Self {
        Self {
            workflow_name: workflow.as_str(),
            family: EventFamily::Workflow,
            event_classes: workflow.event_types().to_vec(),
            requires_logging: false,
            requires_audit: false,
            requires_notification: false,
            requires_invalidation: false,
            audit_action_name,
        }
    }

    /// Entry for a single-state operational event
    pub fn for_operational(kind: OperationalKind, audit_action_name: &'static str) -> Self {
        Self {
            workflow_name: kind.as_str(),
            family: EventFamily::Operational,
            event_classes: vec![EventType::Operational(kind)],
            requires_logging: false,
            requires_audit: false,
            requires_notification: false,
            requires_invalidation: false,
            audit_action_name,
        }
    }

    pub fn with_logging(mut self) -> Self {
        self.requires_logging = true;
        self
    }

    pub fn with_audit(mut self) -> Self {
        self.requires_audit = true;
        self
    }

    pub fn with_notification(mut self) -> Self {
        self.requires_notification = true;
        self
    }

    pub fn with_invalidation(mut self) -> Self {
        self.requires_invalidation = true;
        self
    }

    pub fn requires(&self, category: HandlerCategory) -> bool {
        match category {
            HandlerCategory::Logging => self.requires_logging,
            HandlerCategory::Audit => self.requires_audit,
            HandlerCategory::Notification => self.requires_notification,
            HandlerCategory::Invalidation => self.requires_invalidation,
        }
    }

    pub fn required_categories(&self) -> Vec<HandlerCategory> {
        HandlerCategory::ALL
            .into_iter()
            .filter(|category| self.requires(*category))
            .collect()
    }

    /// Every (event class, category) pair the composition root must wire
    pub fn expected_subscriptions(&self) -> Vec<(EventType, HandlerCategory)> {
        let categories = self.required_categories();
        self.event_classes
            .iter()
            .flat_map(|event_type| {
                categories
                    .iter()
                    .filter(|category| category.applies_to(*event_type))
                    .map(|category| (*event_type, *category))
            })
            .collect()
    }

    /// Event class of this entry for a given lifecycle state
    pub fn class_for_state(&self, state: WorkflowState) -> Option<EventType> {
        self.event_classes
            .iter()
            .copied()
            .find(|event_type| event_type.state() == Some(state))
    }

    /// Audit action for one event class: `<action>.<state>` for workflows
    pub fn audit_action_for(&self, event_type: EventType) -> String {
        match event_type.state() {
            Some(state) => format!("{}.{}", self.audit_action_name, state.as_str()),
            None => self.audit_action_name.to_string(),
        }
    }
}
