//! Fan-out of strategies over one document, then consolidation and gap analysis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pactum_extractors::RawDocument;

use crate::config::ExtractionConfig;
use crate::consolidation::Consolidator;
use crate::error::PactumError;
use crate::gaps::GapAnalyzer;
use crate::traits::ExtractionStrategy;
use crate::types::{ExtractedField, ExtractionResult, GapList, StrategyKind};

/// What one strategy produced for a document.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub kind: StrategyKind,
    pub fields: Vec<ExtractedField>,
    /// Set when the strategy failed, panicked or timed out.
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl StrategyOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Every strategy's outcome.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub outcomes: Vec<StrategyOutcome>,
}

impl StrategyRun {
    /// All candidates from strategies that succeeded.
    pub fn candidates(&self) -> impl Iterator<Item = ExtractedField> + '_ {
        self.outcomes.iter().flat_map(|o| o.fields.iter().cloned())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StrategyOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Runs the strategies concurrently and reduces their candidates.
pub struct ExtractionEngine {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    consolidator: Consolidator,
    gaps: GapAnalyzer,
    strategy_timeout: Duration,
}

impl ExtractionEngine {
    pub fn new(
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
        consolidator: Consolidator,
        gaps: GapAnalyzer,
        strategy_timeout: Duration,
    ) -> Self {
        Self {
            strategies,
            consolidator,
            gaps,
            strategy_timeout,
        }
    }

    /// Engine configured from the extraction settings.
    pub fn from_config(
        strategies: Vec<Arc<dyn ExtractionStrategy>>,
        config: &ExtractionConfig,
    ) -> Self {
        Self::new(
            strategies,
            Consolidator::new(config.strategy_priority.clone()),
            GapAnalyzer::with_checklist(
                config.acceptance_threshold,
                config.critical_fields.clone(),
            ),
            Duration::from_secs(config.strategy_timeout_secs),
        )
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run every strategy concurrently against the same document.
    ///
    /// A strategy that errors, panics or exceeds the timeout contributes no
    /// candidates; the others are unaffected.
    pub async fn run_strategies(&self, document: Arc<RawDocument>) -> StrategyRun {
        let runs = self.strategies.iter().map(|strategy| {
            let strategy = Arc::clone(strategy);
            let document = Arc::clone(&document);
            let limit = self.strategy_timeout;
            async move {
                let kind = strategy.kind();
                let name = strategy.name();
                let started = Instant::now();

                let task = {
                    let strategy = Arc::clone(&strategy);
                    tokio::spawn(async move { strategy.extract(&document).await })
                };
                let abort = task.abort_handle();

                let result = match tokio::time::timeout(limit, task).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_error)) if join_error.is_panic() => {
                        Err(PactumError::strategy_panicked(name))
                    }
                    Ok(Err(join_error)) => Err(PactumError::strategy(name, join_error.to_string())),
                    Err(_) => {
                        abort.abort();
                        Err(PactumError::strategy_timeout(name, limit.as_secs()))
                    }
                };
                let elapsed_ms = started.elapsed().as_millis() as u64;

                match result {
                    Ok(fields) => {
                        tracing::debug!(strategy = name, fields = fields.len(), elapsed_ms, "Strategy finished");
                        StrategyOutcome {
                            kind,
                            fields,
                            error: None,
                            elapsed_ms,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            strategy = name,
                            code = e.code().as_str(),
                            elapsed_ms,
                            "Strategy failed: {}",
                            e
                        );
                        StrategyOutcome {
                            kind,
                            fields: Vec::new(),
                            error: Some(e.to_string()),
                            elapsed_ms,
                        }
                    }
                }
            }
        });

        StrategyRun {
            outcomes: futures::future::join_all(runs).await,
        }
    }

    /// Consolidate the candidates of a run.
    pub fn consolidate(&self, run: &StrategyRun) -> ExtractionResult {
        self.consolidator.consolidate(run.candidates())
    }

    /// Gaps of a consolidated result.
    pub fn analyze_gaps(&self, result: &ExtractionResult) -> GapList {
        self.gaps.analyze(result)
    }

    /// Strategies, consolidation and gap analysis in one call.
    pub async fn analyze(&self, document: Arc<RawDocument>) -> (ExtractionResult, GapList) {
        let run = self.run_strategies(document).await;
        let result = self.consolidate(&run);
        let gaps = self.analyze_gaps(&result);
        (result, gaps)
    }
}
