//! Hand-written mocks shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use argus::ai::{AiEnsembleAnalyzer, CompletionClient, CompletionRequest};
use argus::analyzers::AnalyzerContext;
use argus::config::{AiConfig, ArgusConfig};
use argus::errors::{AiError, ToolError};
use argus::invoker::{ToolInvocation, ToolInvoker, ToolOutput};

/// What the mock invoker does for one call
#[derive(Debug, Clone)]
pub enum MockResponse {
    Output(ToolOutput),
    NotFound,
    Failed(String),
}

impl MockResponse {
    pub fn stdout(stdout: &str, exit_code: i32) -> Self {
        Self::Output(ToolOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(exit_code),
        })
    }

    pub fn stderr(stderr: &str, exit_code: i32) -> Self {
        Self::Output(ToolOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(exit_code),
        })
    }
}

/// Tool invoker that replays scripted responses and counts calls
pub struct MockInvoker {
    queue: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    installed: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ToolInvocation>>,
}

impl MockInvoker {
    /// Every call succeeds with empty output
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: MockResponse::stdout("", 0),
            installed: true,
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Response used once the queue is empty
    pub fn always(mut self, response: MockResponse) -> Self {
        self.fallback = response;
        self
    }

    /// Queue a response for the next call
    pub fn then(self, response: MockResponse) -> Self {
        self.queue.lock().unwrap().push_back(response);
        self
    }

    /// Tool missing from PATH and failing to spawn
    pub fn missing(mut self) -> Self {
        self.installed = false;
        self.fallback = MockResponse::NotFound;
        self
    }

    /// Sleep before answering
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolInvoker for MockInvoker {
    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let program = invocation.program.clone();
        self.seen.lock().unwrap().push(invocation);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match response {
            MockResponse::Output(output) => Ok(output),
            MockResponse::NotFound => Err(ToolError::NotFound(program)),
            MockResponse::Failed(message) => Err(ToolError::ExecutionFailed {
                name: program,
                message,
            }),
        }
    }

    fn is_installed(&self, _program: &str) -> bool {
        self.installed
    }
}

/// Completion client answering per model from a script
pub struct MockCompletionClient {
    answers: HashMap<String, Result<String, String>>,
    calls: AtomicUsize,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            calls: AtomicUsize::new(0),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Model answers with this text
    pub fn answer(mut self, model: &str, text: impl Into<String>) -> Self {
        self.answers.insert(model.to_string(), Ok(text.into()));
        self
    }

    /// Model fails at the transport level
    pub fn fail(mut self, model: &str) -> Self {
        self.answers
            .insert(model.to_string(), Err("connection refused".to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Handle on every prompt received, usable after the client is moved
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match self.answers.get(&request.model) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(AiError::Transport {
                model: request.model,
                message: message.clone(),
            }),
            None => Err(AiError::Transport {
                model: request.model,
                message: "no scripted answer".to_string(),
            }),
        }
    }
}

/// A finding in a scripted model answer: (type, line, severity, confidence)
pub type Finding<'a> = (&'a str, usize, &'a str, f64);

/// Model output in the requested schema
pub fn model_answer(findings: &[Finding], confidence: f64) -> String {
    let vulnerabilities: Vec<_> = findings
        .iter()
        .map(|(vuln_type, line, severity, confidence)| {
            json!({
                "type": vuln_type,
                "severity": severity,
                "title": format!("{} issue", vuln_type),
                "description": format!("{} at line {}", vuln_type, line),
                "location": { "line": line, "column": 5 },
                "recommendation": "Fix it",
                "confidence": confidence,
            })
        })
        .collect();

    json!({
        "vulnerabilities": vulnerabilities,
        "recommendations": [],
        "quality_metrics": {
            "code_quality_score": 70,
            "maintainability_index": 60,
            "test_coverage_estimate": 10
        },
        "confidence": confidence,
    })
    .to_string()
}

/// AI config with the given models and threshold
pub fn ai_config(models: &[&str], threshold: f64) -> AiConfig {
    AiConfig {
        models: models.iter().map(|m| m.to_string()).collect(),
        ensemble_threshold: threshold,
        timeout_secs: 5,
        ..AiConfig::default()
    }
}

pub fn ensemble(
    client: MockCompletionClient,
    models: &[&str],
    threshold: f64,
) -> Arc<AiEnsembleAnalyzer> {
    Arc::new(AiEnsembleAnalyzer::new(
        Arc::new(client),
        ai_config(models, threshold),
    ))
}

/// Configuration without retry delays
pub fn fast_config() -> ArgusConfig {
    let mut config = ArgusConfig::default();
    config.fallback.retry_delay_ms = 0;
    config
}

pub fn context(
    config: ArgusConfig,
    invoker: Arc<MockInvoker>,
    ai: Option<Arc<AiEnsembleAnalyzer>>,
) -> AnalyzerContext {
    AnalyzerContext::new(Arc::new(config), invoker, ai)
}
