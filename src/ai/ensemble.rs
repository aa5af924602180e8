use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use log::{debug, info, warn};

use super::{
    build_analysis_prompt, parse_model_output, AiVulnerability, AiVulnerabilityType,
    AnalysisOptions, CompletionClient, CompletionRequest, ModelResponse, QualityMetrics,
    SYSTEM_PROMPT,
};
use crate::config::AiConfig;
use crate::errors::AiError;
use crate::models::Severity;

/// A single model with confidence above this surfaces a finding on its own
const HIGH_CONFIDENCE: f64 = 0.8;

/// Runs every configured model on a contract and combines their answers
pub struct AiEnsembleAnalyzer {
    client: Arc<dyn CompletionClient>,
    config: AiConfig,
}

impl AiEnsembleAnalyzer {
    pub fn new(client: Arc<dyn CompletionClient>, config: AiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Analyze one contract with all models concurrently.
    ///
    /// Succeeds when at least one model answers; models that fail at the
    /// transport level are left out of the combination.
    pub async fn analyze_contract(
        &self,
        source_code: &str,
        name: &str,
        options: &AnalysisOptions,
    ) -> Result<ModelResponse, AiError> {
        let prompt = build_analysis_prompt(source_code, name, options);

        debug!(
            "Running {} models on {} ({} bytes)",
            self.config.models.len(),
            name,
            source_code.len()
        );

        let outcomes = join_all(
            self.config
                .models
                .iter()
                .map(|model| self.query_model(model, &prompt)),
        )
        .await;

        let mut responses = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(response) => responses.push(response),
                Err(err) => {
                    warn!("AI model failed on {}: {}", name, err);
                    failures.push(err.to_string());
                }
            }
        }

        if responses.is_empty() {
            return Err(AiError::AllModelsFailed { failures });
        }

        info!(
            "{} of {} models answered for {}",
            responses.len(),
            self.config.models.len(),
            name
        );

        Ok(combine_responses(responses, self.config.ensemble_threshold))
    }

    async fn query_model(&self, model: &str, prompt: &str) -> Result<ModelResponse, AiError> {
        let request = CompletionRequest {
            model: model.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt: prompt.to_string(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let start = Instant::now();
        let timeout = self.config.timeout();
        let text = match tokio::time::timeout(timeout, self.client.complete(request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(AiError::Timeout {
                    model: model.to_string(),
                    timeout,
                })
            }
        };

        let mut response = parse_model_output(model, &text);
        response.execution_time = start.elapsed();
        Ok(response)
    }
}

/// Number of models that must report a finding for it to be kept
pub fn consensus_threshold(model_count: usize, fraction: f64) -> usize {
    ((model_count as f64) * fraction).ceil().max(1.0) as usize
}

/// Reduce several model responses to one.
///
/// Findings are grouped by (type, line, severity). A group survives when
/// enough distinct models report it, or when any member is highly confident; the
/// most confident member represents it. Recommendations are deduplicated,
/// quality metrics and confidence averaged.
pub fn combine_responses(mut responses: Vec<ModelResponse>, threshold: f64) -> ModelResponse {
    if responses.len() == 1 {
        return responses.remove(0);
    }
    if responses.is_empty() {
        return ModelResponse {
            model: "ensemble()".to_string(),
            vulnerabilities: Vec::new(),
            recommendations: Vec::new(),
            quality_metrics: QualityMetrics::default(),
            confidence: 0.0,
            execution_time: Duration::ZERO,
        };
    }

    let count = responses.len();
    let required = consensus_threshold(count, threshold);

    type GroupKey = (AiVulnerabilityType, usize, Severity);
    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: HashMap<GroupKey, Vec<(usize, &AiVulnerability)>> = HashMap::new();
    let tagged = responses
        .iter()
        .enumerate()
        .flat_map(|(index, r)| r.vulnerabilities.iter().map(move |v| (index, v)));
    for (index, vulnerability) in tagged {
        let key = (
            vulnerability.vuln_type,
            vulnerability.location.line,
            vulnerability.severity,
        );
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push((index, vulnerability));
    }

    let vulnerabilities: Vec<AiVulnerability> = order
        .iter()
        .filter_map(|key| {
            let members = groups.get(key)?;
            // A model repeating a finding still casts one vote
            let voters = members.iter().map(|(i, _)| *i).collect::<HashSet<_>>().len();
            let confident = members.iter().any(|(_, v)| v.confidence > HIGH_CONFIDENCE);
            if voters < required && !confident {
                debug!(
                    "Dropping {:?} at line {}: {} of {} models, none confident",
                    key.0, key.1, voters, required
                );
                return None;
            }
            members
                .iter()
                .map(|(_, v)| *v)
                .fold(None::<&AiVulnerability>, |best, v| match best {
                    Some(b) if b.confidence >= v.confidence => Some(b),
                    _ => Some(v),
                })
                .cloned()
        })
        .collect();

    let mut seen = HashSet::new();
    let recommendations = responses
        .iter()
        .flat_map(|r| r.recommendations.iter())
        .filter(|r| seen.insert((r.category, r.description.clone())))
        .cloned()
        .collect();

    let n = count as f64;
    let mean = |f: fn(&ModelResponse) -> f64| responses.iter().map(f).sum::<f64>() / n;
    let quality_metrics = QualityMetrics {
        code_quality_score: mean(|r| r.quality_metrics.code_quality_score),
        maintainability_index: mean(|r| r.quality_metrics.maintainability_index),
        test_coverage_estimate: mean(|r| r.quality_metrics.test_coverage_estimate),
    };
    let confidence = mean(|r| r.confidence);

    let models: Vec<&str> = responses.iter().map(|r| r.model.as_str()).collect();
    let execution_time = responses
        .iter()
        .map(|r| r.execution_time)
        .max()
        .unwrap_or_default();

    ModelResponse {
        model: format!("ensemble({})", models.join(",")),
        vulnerabilities,
        recommendations,
        quality_metrics,
        confidence,
        execution_time,
    }
}
