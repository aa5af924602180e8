//! External tool invocation

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ToolError;

mod process;

pub use process::ProcessInvoker;

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?(?:[-+][0-9A-Za-z.\-]+)?").expect("valid regex"));

/// A request to run an external program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program name or path
    pub program: String,

    pub args: Vec<String>,

    /// Working directory (inherited when unset)
    pub working_dir: Option<PathBuf>,

    /// Budget for the whole run
    pub timeout: Duration,

    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// One-line rendering for logs
    pub fn display(&self) -> String {
        let working_dir = self
            .working_dir
            .as_ref()
            .map(|p| format!(" (in {})", p.display()))
            .unwrap_or_default();
        format!("{} {}{}", self.program, self.args.join(" "), working_dir)
    }
}

/// Captured output of a finished program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,

    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr joined, for parsers that read both
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs external programs on behalf of analyzers
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run the program and capture its output.
    ///
    /// Implementations must honour `invocation.timeout` and return
    /// [`ToolError::Timeout`] when it expires, and [`ToolError::NotFound`]
    /// when the program cannot be spawned because it does not exist.
    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError>;

    /// Check if the program can be found
    fn is_installed(&self, program: &str) -> bool;
}

/// Race a future against a timer.
///
/// On expiry the future is dropped, which abandons the work it was doing.
pub async fn run_with_timeout<F, T>(
    name: &str,
    timeout: Duration,
    future: F,
) -> Result<T, ToolError>
where
    F: Future<Output = Result<T, ToolError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ToolError::Timeout {
            name: name.to_string(),
            timeout,
        }),
    }
}

/// Pull a version number out of `--version` style output
pub fn extract_version(output: &str) -> Option<String> {
    VERSION_REGEX
        .find(output)
        .map(|m| m.as_str().to_string())
}
