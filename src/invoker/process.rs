use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, log_enabled, Level};
use tokio::process::Command;

use crate::errors::ToolError;
use crate::invoker::{run_with_timeout, ToolInvocation, ToolInvoker, ToolOutput};

/// Invoker backed by real OS processes
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        Self
    }

    fn build_command(invocation: &ToolInvocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the child on timeout must not leave it running
            .kill_on_drop(true);

        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        command
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
        if log_enabled!(Level::Debug) {
            debug!("Executing: {}", invocation.display());
        }

        let mut command = Self::build_command(&invocation);
        let name = invocation.program.clone();

        let run = async {
            let output = command.output().await.map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ToolError::NotFound(name.clone())
                } else {
                    ToolError::ExecutionFailed {
                        name: name.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

            Ok(ToolOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code(),
            })
        };

        let output = run_with_timeout(&invocation.program, invocation.timeout, run).await?;

        debug!(
            "{} exited with {:?} ({} bytes stdout, {} bytes stderr)",
            invocation.program,
            output.exit_code,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(output)
    }

    fn is_installed(&self, program: &str) -> bool {
        let result = which::which(program).is_ok();
        debug!("Command {:?} exists: {}", program, result);
        result
    }
}
