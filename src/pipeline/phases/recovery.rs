//! Truncation recovery
//!
//! The model may stop mid-structure when output runs long. A pass keeps a
//! running best-so-far candidate, asks for more with the partial text attached,
//! and merges each new fragment into the candidate until it balances or the
//! budget runs out. An unbalanced candidate left at the end is force-closed.
//!
//! Two counters bound a pass: fragment attempts (real fragments, unusable
//! responses and failed calls) and absolute attempts (every model call,
//! conversation-end sentinels included).

use crate::extract::StructuralMarkers;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::state::CONVERSATION_END_SENTINEL;
use async_trait::async_trait;
use tracing::{debug, warn};

/// One response as seen by the recovery loop
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    /// The model signalled the end of the conversation
    Sentinel,
    /// Response or call that yielded nothing usable
    Unusable(String),
    /// Stop the pass without a result
    Abort(String),
}

/// Produces fragments for a recovery pass
#[async_trait]
pub trait FragmentSource: Send {
    /// `partial` is the running candidate so far, absent on the first call
    async fn next_fragment(&mut self, partial: Option<&str>) -> Fragment;
}

/// Conversation-end sentinel, tolerant of literal `\n` escapes around it
pub fn is_sentinel(text: &str) -> bool {
    text.replace("\\n", "").trim() == CONVERSATION_END_SENTINEL
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryBudget {
    pub fragment_attempts: usize,
    pub max_absolute_attempts: usize,
    pub merge_ratio: f64,
}

impl RecoveryBudget {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            fragment_attempts: config.fragment_attempts,
            max_absolute_attempts: config.max_absolute_attempts,
            merge_ratio: config.merge_ratio,
        }
    }
}

impl Default for RecoveryBudget {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// How a fragment changed the running candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    Initial,
    Continuation,
    Replaced,
    Appended,
    KeptRunning,
}

/// Running best-so-far candidate
#[derive(Debug, Clone)]
pub struct FragmentMerger {
    markers: StructuralMarkers,
    merge_ratio: f64,
    running: Option<String>,
}

impl FragmentMerger {
    pub fn new(markers: StructuralMarkers, merge_ratio: f64) -> Self {
        Self {
            markers,
            merge_ratio,
            running: None,
        }
    }

    pub fn running(&self) -> Option<&str> {
        self.running.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.running
            .as_deref()
            .map(|text| self.markers.is_complete(text))
            .unwrap_or(false)
    }

    /// Merges `fragment` into the running candidate
    ///
    /// Rules, first match wins:
    /// 1. fragment does not open a structure while the candidate ends inside one: continuation
    /// 2. fragment is complete on its own: replace
    /// 3. fragment is longer than `merge_ratio` times the candidate: replace
    /// 4. fragment leaves structures open: append
    /// 5. otherwise keep the longer of the two
    pub fn absorb(&mut self, fragment: String) -> MergeAction {
        let Some(running) = self.running.take() else {
            self.running = Some(fragment);
            return MergeAction::Initial;
        };

        let m = self.markers;
        let (merged, action) =
            if !m.starts_with_open(&fragment) && m.ends_with_open(&running) {
                (join(&running, &fragment), MergeAction::Continuation)
            } else if m.is_complete(&fragment) {
                (fragment, MergeAction::Replaced)
            } else if fragment.len() as f64 > running.len() as f64 * self.merge_ratio {
                (fragment, MergeAction::Replaced)
            } else if m.count_open(&fragment) > m.count_close(&fragment) {
                (join(&running, &fragment), MergeAction::Appended)
            } else if fragment.len() > running.len() {
                (fragment, MergeAction::Replaced)
            } else {
                (running, MergeAction::KeptRunning)
            };

        self.running = Some(merged);
        action
    }

    pub fn into_running(self) -> Option<String> {
        self.running
    }
}

fn join(running: &str, fragment: &str) -> String {
    format!("{}\n{}", running, fragment)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryEnd {
    /// Candidate balanced within budget
    Complete,
    /// Budget ran out; missing close markers were appended
    ForceClosed,
    /// Budget ran out without a single usable fragment
    Exhausted,
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryOutcome {
    pub text: Option<String>,
    pub end: RecoveryEnd,
    pub absolute_attempts: usize,
    pub fragment_attempts: usize,
    pub sentinels: usize,
    /// Reason given by the last unusable response
    pub last_issue: Option<String>,
}

impl RecoveryOutcome {
    pub fn is_complete(&self) -> bool {
        self.end == RecoveryEnd::Complete
    }
}

/// Runs one recovery pass over `source`
pub async fn recover<S>(
    source: &mut S,
    budget: RecoveryBudget,
    markers: StructuralMarkers,
) -> RecoveryOutcome
where
    S: FragmentSource + ?Sized,
{
    let mut merger = FragmentMerger::new(markers, budget.merge_ratio);
    let mut absolute_attempts = 0;
    let mut fragment_attempts = 0;
    let mut sentinels = 0;
    let mut last_issue = None;

    while fragment_attempts < budget.fragment_attempts
        && absolute_attempts < budget.max_absolute_attempts
    {
        absolute_attempts += 1;

        match source.next_fragment(merger.running()).await {
            Fragment::Sentinel => {
                sentinels += 1;
                debug!(absolute_attempt = absolute_attempts, "Conversation-end sentinel");
            }
            Fragment::Unusable(reason) => {
                fragment_attempts += 1;
                debug!(attempt = fragment_attempts, reason = %reason, "Unusable fragment");
                last_issue = Some(reason);
            }
            Fragment::Abort(reason) => {
                return RecoveryOutcome {
                    text: None,
                    end: RecoveryEnd::Aborted(reason),
                    absolute_attempts,
                    fragment_attempts,
                    sentinels,
                    last_issue,
                };
            }
            Fragment::Text(text) => {
                fragment_attempts += 1;
                let action = merger.absorb(text);
                debug!(attempt = fragment_attempts, ?action, "Merged fragment");
                if merger.is_complete() {
                    return RecoveryOutcome {
                        text: merger.into_running(),
                        end: RecoveryEnd::Complete,
                        absolute_attempts,
                        fragment_attempts,
                        sentinels,
                        last_issue,
                    };
                }
            }
        }
    }

    let (text, end) = match merger.into_running() {
        Some(running) => {
            warn!(
                missing = markers.deficit(&running),
                fragment_attempts, absolute_attempts, "Force-closing incomplete candidate"
            );
            (Some(markers.force_close(&running)), RecoveryEnd::ForceClosed)
        }
        None => (None, RecoveryEnd::Exhausted),
    };

    RecoveryOutcome {
        text,
        end,
        absolute_attempts,
        fragment_attempts,
        sentinels,
        last_issue,
    }
}
