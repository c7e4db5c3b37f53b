//! The namer pipeline: payload → questions → name → window title → cost record.
//!
//! Every failure is absorbed here. `run` never errors; the caller gets back
//! the record to append (if any) and what, if anything, was renamed.

use crate::config::{NamerConfig, NamingConfig};
use crate::cost_log::{CostRecord, RecordOutcome};
use crate::error::{NamerError, Result};
use crate::llm::NameGenerator;
use crate::payload::HookPayload;
use crate::pricing::Rates;
use crate::sanitize::sanitize_name;
use crate::tmux::{TmuxSession, WindowRenamer};

/// Policy knobs the pipeline needs, lifted out of `NamerConfig`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_questions: usize,
    pub naming: NamingConfig,
    pub rates: Rates,
}

impl PipelineSettings {
    pub fn from_config(config: &NamerConfig) -> Self {
        Self {
            max_questions: config.llm.max_questions,
            naming: config.naming.clone(),
            rates: Rates::resolve(&config.llm.model, &config.pricing),
        }
    }
}

/// What one invocation produced.
#[derive(Debug)]
pub struct RunReport {
    /// Record to append to the cost log; `None` when nothing happened worth
    /// recording (no user questions).
    pub record: Option<CostRecord>,
    /// The sanitized name, if one was generated.
    pub name: Option<String>,
    pub renamed: bool,
}

impl RunReport {
    fn skipped() -> Self {
        Self {
            record: None,
            name: None,
            renamed: false,
        }
    }

    fn failed(err: &NamerError) -> Self {
        Self {
            record: Some(CostRecord::failed(err.to_string())),
            name: None,
            renamed: false,
        }
    }
}

pub struct Pipeline<G, R> {
    generator: G,
    renamer: R,
    window: Result<TmuxSession>,
    settings: PipelineSettings,
}

impl<G: NameGenerator, R: WindowRenamer> Pipeline<G, R> {
    /// `window` is the resolved tmux session, or the reason there is none
    /// (renaming is then skipped but the rest of the run proceeds).
    pub fn new(
        generator: G,
        renamer: R,
        window: Result<TmuxSession>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            renamer,
            window,
            settings,
        }
    }

    /// `input` is the raw stdin body; it is not assumed to be UTF-8.
    pub async fn run(&self, input: &[u8]) -> RunReport {
        let payload = match HookPayload::parse_bytes(input) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("{e}");
                return RunReport::failed(&e);
            }
        };

        let questions = payload.recent_questions(self.settings.max_questions);
        if questions.is_empty() {
            tracing::debug!("skipping: {}", NamerError::NoQuestions);
            return RunReport::skipped();
        }
        tracing::debug!("naming from {} question(s)", questions.len());

        let generation = match self.generator.generate(&questions).await {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(kind = e.kind(), "name generation failed: {e}");
                return RunReport::failed(&e);
            }
        };

        let cost = self.settings.rates.cost(generation.usage);

        let name = match sanitize_name(&generation.text, &self.settings.naming) {
            Ok(n) => n,
            Err(e) => {
                tracing::info!("discarding model output {:?}: {e}", generation.text);
                return RunReport {
                    record: Some(CostRecord::now(RecordOutcome::Unusable {
                        cost,
                        usage: generation.usage,
                        reason: e.to_string(),
                    })),
                    name: None,
                    renamed: false,
                };
            }
        };

        let rename_error = match &self.window {
            Ok(session) => match self.renamer.rename(session, &name) {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!("{e}");
                    Some(e.to_string())
                }
            },
            Err(e) => {
                tracing::debug!("not renaming: {e}");
                Some(e.to_string())
            }
        };
        let renamed = rename_error.is_none();

        tracing::info!(
            name = %name,
            cost,
            input_tokens = generation.usage.input_tokens,
            output_tokens = generation.usage.output_tokens,
            renamed,
            "generated window name"
        );

        RunReport {
            record: Some(CostRecord::now(RecordOutcome::Named {
                cost,
                usage: generation.usage,
                name: name.clone(),
                rename_error,
            })),
            name: Some(name),
            renamed,
        }
    }
}
