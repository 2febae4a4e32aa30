//! The robot runtime: a long-lived loop that claims one unit of work,
//! invokes the robot's handler, and advances the unit's state.
//!
//! Multiple runtimes per type may run in parallel; correctness relies
//! solely on the atomicity of `Store::claim_next`. A runtime killed
//! mid-handler leaves its row in `PROCESSING` for an operator to
//! revive; the runtime itself never infers liveness.

use std::time::Duration;

use async_trait::async_trait;
use pdf2search_core::{Document, EnhancementType, PendingStatus};
use pdf2search_store::Store;
use serde_json::Value;
use tracing::{info, warn};

/// What a handler did with one document.
///
/// Tagged variants instead of errors-as-control-flow: `Discard` means
/// "nothing to do for this input" and is not an error to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// Artifact content to upsert; the unit completes.
    Produced(Value),
    /// Semantic no-match; the unit is discarded with this reason.
    Discard(String),
    /// Transient failure; the unit fails with this reason and may be
    /// re-enqueued later.
    Fail(String),
}

/// A named producer of artifacts of a single enhancement type.
#[async_trait]
pub trait Robot: Send + Sync {
    /// Stable producer name recorded on every artifact.
    fn id(&self) -> &str;

    /// The one enhancement type this robot claims and produces.
    fn enhancement_type(&self) -> EnhancementType;

    /// Process one document. Internal errors must be folded into the
    /// returned outcome; the runtime treats them all as `Fail`.
    async fn handle(&self, document: &Document) -> HandlerOutcome;
}

/// Counters reported when a runtime loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub completed: u64,
    pub discarded: u64,
    pub failed: u64,
}

/// Long-lived polling loop around one robot and one store handle.
pub struct RobotRunner {
    store: Store,
    robot: Box<dyn Robot>,
    poll_interval: Duration,
}

impl RobotRunner {
    pub fn new(store: Store, robot: Box<dyn Robot>) -> Self {
        Self {
            store,
            robot,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the loop.
    ///
    /// Daemon mode (`max_iterations == None`) sleeps `poll_interval`
    /// whenever the queue is empty and never returns on its own.
    /// Bounded mode stops after the given number of iterations or as
    /// soon as the queue empties, without sleeping.
    ///
    /// Handler failures are folded into the loop; store failures
    /// propagate and terminate the runtime.
    pub async fn run(
        &mut self,
        max_iterations: Option<u64>,
    ) -> pdf2search_store::Result<RunSummary> {
        info!(robot = self.robot.id(), "robot starting");
        let mut summary = RunSummary::default();
        let mut iterations: u64 = 0;

        loop {
            if let Some(max) = max_iterations {
                if iterations >= max {
                    info!(robot = self.robot.id(), max, "reached max iterations");
                    break;
                }
            }

            let processed = self.process_one().await?;
            iterations += 1;

            match processed {
                Some(outcome) => {
                    summary.processed += 1;
                    match outcome {
                        ProcessedOutcome::Completed => summary.completed += 1,
                        ProcessedOutcome::Discarded => summary.discarded += 1,
                        ProcessedOutcome::Failed => summary.failed += 1,
                    }
                    if summary.processed % 100 == 0 {
                        info!(
                            robot = self.robot.id(),
                            processed = summary.processed,
                            "progress"
                        );
                    }
                }
                None => {
                    if max_iterations.is_some() {
                        break;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        info!(
            robot = self.robot.id(),
            completed = summary.completed,
            discarded = summary.discarded,
            failed = summary.failed,
            "robot finished"
        );
        Ok(summary)
    }

    /// Claim and process a single unit. Returns `None` when the queue
    /// has no pending unit of this robot's type.
    pub async fn process_one(&mut self) -> pdf2search_store::Result<Option<ProcessedOutcome>> {
        let ty = self.robot.enhancement_type();
        let Some(pending) = self.store.claim_next(ty).await? else {
            return Ok(None);
        };

        info!(
            robot = self.robot.id(),
            pending_id = pending.id,
            document_id = pending.document_id,
            "processing"
        );

        let Some(document) = self.store.document_by_id(pending.document_id).await? else {
            warn!(
                document_id = pending.document_id,
                "document vanished, discarding unit"
            );
            self.store
                .set_status(pending.id, PendingStatus::Discarded, Some("Document not found"))
                .await?;
            return Ok(Some(ProcessedOutcome::Discarded));
        };

        let outcome = self.robot.handle(&document).await;
        let result = match outcome {
            HandlerOutcome::Produced(content) => {
                self.store
                    .set_status(pending.id, PendingStatus::Importing, None)
                    .await?;
                self.store
                    .put_enhancement(document.id, ty, content, self.robot.id())
                    .await?;
                self.store
                    .set_status(pending.id, PendingStatus::Completed, None)
                    .await?;
                ProcessedOutcome::Completed
            }
            HandlerOutcome::Discard(reason) => {
                self.store
                    .set_status(pending.id, PendingStatus::Discarded, Some(&reason))
                    .await?;
                ProcessedOutcome::Discarded
            }
            HandlerOutcome::Fail(reason) => {
                warn!(
                    robot = self.robot.id(),
                    pending_id = pending.id,
                    reason = %reason,
                    "handler failed"
                );
                self.store
                    .set_status(pending.id, PendingStatus::Failed, Some(&reason))
                    .await?;
                ProcessedOutcome::Failed
            }
        };
        Ok(Some(result))
    }
}

/// Terminal outcome of one processed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedOutcome {
    Completed,
    Discarded,
    Failed,
}
