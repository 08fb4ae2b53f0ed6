pub mod stages;

use crate::types::{StreamEvent, COMPLETE_STAGE};
use self::stages::StagePlan;
use serde_json::Value;
use tokio::sync::mpsc;

/// Lifecycle of one streamed operation.
///
/// `Complete`, `Error`, and `Cancelled` are terminal; nothing transitions out
/// of them. Events are dispatched only while `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Requesting,
    Streaming,
    Complete,
    Error,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Complete | SessionPhase::Error | SessionPhase::Cancelled
        )
    }
}

/// Re-render triggers sent to the owning component. The component never reads
/// session state from another task; these updates are its only view.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    StageStarted { stage: String },
    StepCompleted { stage: String },
    Progress { percent: f64 },
    Message { text: String },
    Completed { data: Value },
    Failed { error: String },
    Cancelled,
}

/// Runtime state of one active stream consumption. Created per operation and
/// exclusively owned by the component that started it.
pub struct StreamSession {
    phase: SessionPhase,
    progress: f64,
    stage_history: Vec<String>,
    plan: StagePlan,
    completion_data: Option<Value>,
    error: Option<String>,
    update_tx: Option<mpsc::UnboundedSender<SessionUpdate>>,
}

impl StreamSession {
    pub fn new(plan: StagePlan, update_tx: Option<mpsc::UnboundedSender<SessionUpdate>>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            progress: 0.0,
            stage_history: Vec::new(),
            plan,
            completion_data: None,
            error: None,
            update_tx,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn stage_history(&self) -> &[String] {
        &self.stage_history
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn completion_data(&self) -> Option<&Value> {
        self.completion_data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while the session can still receive events.
    pub fn is_active(&self) -> bool {
        !self.phase.is_terminal()
    }

    pub fn begin_request(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Requesting;
        }
    }

    pub fn begin_streaming(&mut self) {
        if self.phase == SessionPhase::Requesting {
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Apply one decoded event. Rules are evaluated in order: application
    /// error, completion, progress, stage transition, then message. Progress
    /// never regresses: incoming values are clamped to
    /// `max(current, incoming)` within 0..=100.
    pub fn dispatch(&mut self, event: StreamEvent) {
        if self.phase != SessionPhase::Streaming {
            return;
        }

        if let Some(error) = event.error {
            self.plan.fail_active();
            self.phase = SessionPhase::Error;
            self.error = Some(error.clone());
            self.emit(SessionUpdate::Failed { error });
            return;
        }

        if event.stage.as_deref() == Some(COMPLETE_STAGE) {
            if let Some(data) = event.data {
                for stage in self.plan.complete_all() {
                    self.emit(SessionUpdate::StepCompleted { stage });
                }
                self.progress = 100.0;
                self.phase = SessionPhase::Complete;
                self.stage_history.push(COMPLETE_STAGE.to_string());
                self.completion_data = Some(data.clone());
                self.emit(SessionUpdate::Progress { percent: 100.0 });
                self.emit(SessionUpdate::Completed { data });
                return;
            }
        }

        if let Some(incoming) = event.progress {
            let clamped = incoming.clamp(0.0, 100.0);
            if clamped > self.progress {
                self.progress = clamped;
                self.emit(SessionUpdate::Progress { percent: clamped });
            }
        }

        if let Some(stage) = event.stage {
            for completed in self.plan.enter(&stage) {
                self.emit(SessionUpdate::StepCompleted { stage: completed });
            }
            self.stage_history.push(stage.clone());
            self.emit(SessionUpdate::StageStarted { stage });
        }

        if let Some(text) = event.message {
            self.emit(SessionUpdate::Message { text });
        }
    }

    /// Transport or decode failure. Valid from `Requesting` or `Streaming`;
    /// ignored once terminal.
    pub fn fail(&mut self, error: String) {
        if self.phase.is_terminal() {
            return;
        }
        self.plan.fail_active();
        self.phase = SessionPhase::Error;
        self.error = Some(error.clone());
        self.emit(SessionUpdate::Failed { error });
    }

    /// Deliberate stop by the owner. Terminal, but distinct from `Error` so
    /// the UI does not surface a failure banner for a user-initiated stop.
    pub fn mark_cancelled(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = SessionPhase::Cancelled;
        self.emit(SessionUpdate::Cancelled);
    }

    fn emit(&self, update: SessionUpdate) {
        if let Some(tx) = &self.update_tx {
            let _ = tx.send(update);
        }
    }
}
