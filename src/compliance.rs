//! Wiring Compliance
//!
//! Cross-checks the workflow registry against a bus's subscription table.
//! Run at startup in strict mode, on demand through the ops API, and in
//! tests.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::bus::{EventBus, HandlerId};
use crate::domain::{EventFamily, EventType, WorkflowState};
use crate::registry::{WorkflowMetadata, WorkflowRegistry};

/// A single inconsistency between registry and bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("Registry entry {workflow_name} is malformed: {problem}")]
    MalformedEntry {
        workflow_name: String,
        problem: String,
    },

    #[error("Registry entry {workflow_name} is declared more than once")]
    DuplicateWorkflow { workflow_name: String },

    #[error("{workflow_name} requires {handler} for {event_type} but it is not subscribed")]
    MissingSubscription {
        workflow_name: String,
        event_type: EventType,
        handler: HandlerId,
    },

    #[error("{handler} is subscribed to {event_type}, which no registry entry declares")]
    OrphanedSubscription {
        event_type: EventType,
        handler: HandlerId,
    },

    #[error("{handler} is subscribed to {event_type} but {workflow_name} does not require it")]
    UnexpectedSubscription {
        workflow_name: String,
        event_type: EventType,
        handler: HandlerId,
    },

    #[error("{handler} is subscribed to {event_type} {count} times")]
    DuplicateSubscription {
        event_type: EventType,
        handler: HandlerId,
        count: usize,
    },

    #[error("Registry has {actual} entries, expected {expected}")]
    EntryCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub workflows_checked: usize,
    pub subscriptions_checked: usize,
    pub violations: Vec<Violation>,
}

impl ComplianceReport {
    fn new(
        violations: Vec<Violation>,
        workflows_checked: usize,
        subscriptions_checked: usize,
    ) -> Self {
        Self {
            compliant: violations.is_empty(),
            workflows_checked,
            subscriptions_checked,
            violations,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.compliant
    }
}

// =========================================================================
// Registry checks
// =========================================================================

/// Shape problems of a single entry
fn entry_problems(entry: &WorkflowMetadata) -> Vec<String> {
    let mut problems = Vec::new();

    if entry.workflow_name.is_empty() {
        problems.push("workflow name is empty".to_string());
    }
    if entry.requires_audit && entry.audit_action_name.is_empty() {
        problems.push("requires audit but has no audit action name".to_string());
    }

    for event_type in &entry.event_classes {
        if event_type.family() != entry.family {
            problems.push(format!(
                "{} is a {} event in a {} entry",
                event_type,
                event_type.family().as_str(),
                entry.family.as_str()
            ));
        } else if event_type.registry_name() != entry.workflow_name {
            problems.push(format!("{} belongs to {}", event_type, event_type.registry_name()));
        }
    }

    match entry.family {
        EventFamily::Workflow => {
            for state in WorkflowState::ALL {
                let count = entry
                    .event_classes
                    .iter()
                    .filter(|event_type| event_type.state() == Some(state))
                    .count();
                if count != 1 {
                    problems.push(format!("expected one {} class, found {}", state, count));
                }
            }
        }
        EventFamily::Operational => {
            if entry.event_classes.len() != 1 {
                problems.push(format!(
                    "expected one operational class, found {}",
                    entry.event_classes.len()
                ));
            }
        }
    }

    problems
}

/// Check the registry on its own: entry shapes, duplicate names, and event
/// classes claimed by more than one entry
pub fn check_registry(registry: &WorkflowRegistry) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut names = HashSet::new();
    let mut owners: HashMap<EventType, &str> = HashMap::new();

    for entry in registry.get_all() {
        if !names.insert(entry.workflow_name) {
            violations.push(Violation::DuplicateWorkflow {
                workflow_name: entry.workflow_name.to_string(),
            });
        }

        let mut problems = entry_problems(entry);
        for event_type in &entry.event_classes {
            if let Some(owner) = owners.insert(*event_type, entry.workflow_name) {
                if owner != entry.workflow_name {
                    problems.push(format!("{} is already declared by {}", event_type, owner));
                }
            }
        }

        violations.extend(problems.into_iter().map(|problem| Violation::MalformedEntry {
            workflow_name: entry.workflow_name.to_string(),
            problem,
        }));
    }

    violations
}

// =========================================================================
// Registry against bus
// =========================================================================

/// Full compliance check of `bus` against `registry`.
///
/// Subscriptions that are not category handlers are allowed on any
/// registered event type; category handlers must match the registry flags
/// exactly.
pub fn check_compliance(
    registry: &WorkflowRegistry,
    bus: &EventBus,
    expected_entries: Option<usize>,
) -> ComplianceReport {
    let mut violations = check_registry(registry);

    if let Some(expected) = expected_entries {
        if registry.len() != expected {
            violations.push(Violation::EntryCountMismatch {
                expected,
                actual: registry.len(),
            });
        }
    }

    for entry in registry.get_all() {
        for (event_type, category) in entry.expected_subscriptions() {
            let expected = HandlerId::for_category(category, event_type);
            if !bus.handlers_for(event_type).contains(&&expected) {
                violations.push(Violation::MissingSubscription {
                    workflow_name: entry.workflow_name.to_string(),
                    event_type,
                    handler: expected,
                });
            }
        }
    }

    let subscriptions = bus.subscriptions();
    let mut seen: HashMap<(EventType, &HandlerId), usize> = HashMap::new();
    for (event_type, handler) in &subscriptions {
        *seen.entry((*event_type, *handler)).or_default() += 1;
    }

    let mut reported = HashSet::new();
    for (event_type, handler) in &subscriptions {
        let (event_type, handler) = (*event_type, *handler);
        if !reported.insert((event_type, handler)) {
            continue;
        }

        let count = seen.get(&(event_type, handler)).copied().unwrap_or_default();
        if count > 1 {
            violations.push(Violation::DuplicateSubscription {
                event_type,
                handler: handler.clone(),
                count,
            });
        }

        let Some(entry) = registry.get_by_event_type(event_type) else {
            violations.push(Violation::OrphanedSubscription {
                event_type,
                handler: handler.clone(),
            });
            continue;
        };

        if let Some(category) = handler.category() {
            let expected = entry.requires(category)
                && category.applies_to(event_type)
                && handler.method() == event_type.handler_method();
            if !expected {
                violations.push(Violation::UnexpectedSubscription {
                    workflow_name: entry.workflow_name.to_string(),
                    event_type,
                    handler: handler.clone(),
                });
            }
        }
    }

    ComplianceReport::new(violations, registry.len(), bus.subscription_count())
}
