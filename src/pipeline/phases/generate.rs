use super::recovery::{is_sentinel, recover, Fragment, FragmentSource, RecoveryBudget, RecoveryOutcome};
use crate::extract::{strip_code_fence, strip_fence_edges, StructuralMarkers};
use crate::llm::ChatMessage;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::prompts::{generation_prompt, render, GENERATE_CONTINUATION_PROMPT};
use crate::pipeline::state::{CandidateArtifact, RequirementDescriptor, GENERATION_FAILED_PLACEHOLDER};
use async_trait::async_trait;
use tracing::{info, warn};

/// Initial candidate and how recovery got there
#[derive(Debug, Clone)]
pub struct Generation {
    pub candidate: CandidateArtifact,
    pub recovery: RecoveryOutcome,
}

struct GenerationSource<'a> {
    context: &'a PipelineContext,
    system_prompt: String,
    brief: String,
}

#[async_trait]
impl FragmentSource for GenerationSource<'_> {
    async fn next_fragment(&mut self, partial: Option<&str>) -> Fragment {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(self.brief.clone()),
        ];
        if let Some(partial) = partial {
            messages.push(ChatMessage::user(render(
                GENERATE_CONTINUATION_PROMPT,
                &[("partial", partial)],
            )));
        }

        match self.context.complete(messages).await {
            Ok(text) if is_sentinel(&text) => Fragment::Sentinel,
            Ok(text) => {
                let code = strip_fence_edges(&strip_code_fence(&text, None));
                if code.is_empty() {
                    Fragment::Unusable("empty response".to_string())
                } else {
                    Fragment::Text(code)
                }
            }
            Err(e) => {
                warn!(error = %e, "Generation call failed");
                Fragment::Unusable(format!("generation call failed: {}", e))
            }
        }
    }
}

/// Produces the first candidate for `descriptor`
///
/// Never fails: when nothing usable comes back the candidate is the
/// error placeholder, which CHECK rejects without a model call.
pub async fn generate(context: &PipelineContext, descriptor: &RequirementDescriptor) -> Generation {
    let brief = serde_json::to_string(&descriptor.to_payload()).unwrap_or_default();
    let mut source = GenerationSource {
        context,
        system_prompt: generation_prompt(descriptor.category()),
        brief,
    };

    let recovery = recover(
        &mut source,
        RecoveryBudget::from_config(&context.config),
        StructuralMarkers::BRACES,
    )
    .await;

    let text = match &recovery.text {
        Some(text) => strip_fence_edges(text),
        None => {
            warn!(
                absolute_attempts = recovery.absolute_attempts,
                "No usable code generated"
            );
            GENERATION_FAILED_PLACEHOLDER.to_string()
        }
    };
    info!(
        category = descriptor.category().as_str(),
        chars = text.len(),
        end = ?recovery.end,
        "Generated candidate"
    );

    Generation {
        candidate: CandidateArtifact::new(text, 0),
        recovery,
    }
}
