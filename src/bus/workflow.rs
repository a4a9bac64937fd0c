//! Workflow invocation guard
//!
//! Enforces the publishing contract of a workflow on the caller side: one
//! Attempted event, then exactly one terminal event of the same workflow.

use uuid::Uuid;

use crate::domain::{Event, EventType, Workflow, WorkflowState};

use super::dispatcher::{EventPublisher, PublishReport};
use super::handler::DispatchContext;

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("{0} is not a workflow event")]
    NotWorkflowEvent(EventType),

    #[error("Expected a {expected} event, got {actual}")]
    UnexpectedState {
        expected: WorkflowState,
        actual: EventType,
    },

    #[error("{actual} does not belong to workflow {workflow}")]
    WorkflowMismatch { workflow: Workflow, actual: EventType },

    #[error("Workflow {0} already published its terminal event")]
    AlreadyFinished(Workflow),
}

/// A workflow invocation in flight.
///
/// Created by publishing the Attempted event and finished by publishing the
/// terminal one. A rejected terminal event leaves the invocation open, so
/// the caller can still publish the right one. Dropping it unfinished logs
/// a warning.
#[must_use = "a workflow invocation must end with succeed() or fail()"]
pub struct WorkflowInvocation<'p, P: EventPublisher + ?Sized> {
    publisher: &'p P,
    workflow: Workflow,
    attempted_id: Uuid,
    finished: bool,
}

impl<'p, P: EventPublisher + ?Sized> WorkflowInvocation<'p, P> {
    /// Publish the Attempted event and open the invocation
    pub async fn begin(
        publisher: &'p P,
        attempted: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(Self, PublishReport), InvocationError> {
        let event_type = attempted.event_type();
        let (workflow, state) = match (event_type.workflow(), event_type.state()) {
            (Some(workflow), Some(state)) => (workflow, state),
            _ => return Err(InvocationError::NotWorkflowEvent(event_type)),
        };
        if state != WorkflowState::Attempted {
            return Err(InvocationError::UnexpectedState {
                expected: WorkflowState::Attempted,
                actual: event_type,
            });
        }

        let report = publisher.publish(attempted, context).await;
        let invocation = Self {
            publisher,
            workflow,
            attempted_id: attempted.id(),
            finished: false,
        };
        Ok((invocation, report))
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    /// Id of the Attempted event this invocation started with
    pub fn attempted_id(&self) -> Uuid {
        self.attempted_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub async fn succeed(
        &mut self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<PublishReport, InvocationError> {
        self.finish(WorkflowState::Succeeded, event, context).await
    }

    pub async fn fail(
        &mut self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<PublishReport, InvocationError> {
        self.finish(WorkflowState::Failed, event, context).await
    }

    async fn finish(
        &mut self,
        expected: WorkflowState,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<PublishReport, InvocationError> {
        if self.finished {
            return Err(InvocationError::AlreadyFinished(self.workflow));
        }

        let event_type = event.event_type();
        match event_type.workflow() {
            Some(workflow) if workflow == self.workflow => {}
            Some(_) => {
                return Err(InvocationError::WorkflowMismatch {
                    workflow: self.workflow,
                    actual: event_type,
                })
            }
            None => return Err(InvocationError::NotWorkflowEvent(event_type)),
        }
        if event_type.state() != Some(expected) {
            return Err(InvocationError::UnexpectedState {
                expected,
                actual: event_type,
            });
        }

        self.finished = true;
        Ok(self.publisher.publish(event, context).await)
    }
}

impl<'p, P: EventPublisher + ?Sized> Drop for WorkflowInvocation<'p, P> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                workflow = %self.workflow,
                attempted_id = %self.attempted_id,
                "Workflow invocation dropped without a terminal event"
            );
        }
    }
}
