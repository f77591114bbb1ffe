//! Remote executor and callback traits
//!
//! These traits keep the reconciler independent of how statements reach the
//! server and of how progress and confirmation are presented.

use crate::types::{ApplyResult, CommandOutput};

/// Runs statements against the managed server
///
/// Implementations own connection details and timeouts. A hung statement
/// blocks the pass; nothing here cancels it.
pub trait RemoteExecutor: Send + Sync {
    /// Run one statement and return its raw output
    ///
    /// An `Err` means the statement could not be started at all. A statement
    /// that ran and failed is reported through `CommandOutput::success`.
    fn run(&self, statement: &str) -> std::io::Result<CommandOutput>;

    /// Run a statement and capture stdout
    ///
    /// Failures are folded into their diagnostic text.
    fn run_capture(&self, statement: &str) -> Result<String, String> {
        let output = self.run(statement).map_err(|e| e.to_string())?;
        if output.success {
            return Ok(output.stdout_str());
        }
        let stderr = output.stderr_str();
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err("exited with a failure status".to_string())
        } else {
            Err(stderr.to_string())
        }
    }
}

/// Progress callback for a reconciliation pass
pub trait ProgressCallback: Send {
    /// Called before any declaration is applied
    fn on_pass_start(&mut self, changes: usize);

    /// Called when a declaration has been applied
    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult);

    /// Called after the last declaration
    fn on_pass_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise (including when the
    /// prompt could not be shown)
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_pass_start(&mut self, _changes: usize) {}
    fn on_resource_complete(&mut self, _name: &str, _result: &ApplyResult) {}
    fn on_pass_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}
