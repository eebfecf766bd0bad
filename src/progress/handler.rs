//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a pipeline run progresses
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { run_id: String, requirement: String },

    /// Router answered for the next stage
    RouterDecision {
        from: String,
        to: String,
        advance: bool,
        reason: Option<String>,
    },

    /// Stage took control
    StageStarted { stage: String },

    /// Stage returned control to the router
    StageCompleted { stage: String, duration: Duration },

    /// Generation loop entered a new conversational turn
    LoopTurn { turn: usize },

    /// Truncation recovery finished one GENERATE or REVISE pass
    RecoveryFinished {
        stage: String,
        absolute_attempts: usize,
        fragment_attempts: usize,
        complete: bool,
    },

    /// CHECK produced a verdict
    CheckCompleted {
        turn: usize,
        is_valid: bool,
        failed_aspects: usize,
    },

    /// REVISE fell back to the previous candidate
    RevisionFallback { turn: usize, reason: String },

    /// Composition wrote its files
    ArtifactsWritten { output_dir: String, files: usize },

    /// Run finished
    Completed {
        is_valid: bool,
        conversation_turn: usize,
        total_time: Duration,
    },

    /// Run stopped on an error
    Failed { error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
