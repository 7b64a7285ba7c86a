//! Post-deploy actions.
//!
//! After a successful registration or removal, a job's post-deploy commands
//! run for their side effects (typically telling a consumer to reload). They
//! run verbatim, with no placeholder substitution.

use std::time::Duration;

use thiserror::Error;

use crate::config::PostDeployAction;
use crate::exec;

/// Errors from running a post-deploy action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The command ran but exited non-zero
    #[error("exited with status {code:?}: {output}")]
    Failed {
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// The command's combined output
        output: String,
    },

    /// The command could not be executed at all
    #[error(transparent)]
    Exec(#[from] exec::ExecError),
}

/// Runs a job's post-deploy commands.
#[derive(Debug)]
pub struct ActionRunner {
    timeout: Option<Duration>,
}

impl ActionRunner {
    /// Creates a runner; `timeout` bounds each individual command.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Executes one action and returns its combined trimmed output.
    pub async fn run(&self, action: &PostDeployAction) -> Result<String, ActionError> {
        let result = exec::run(&action.cmd, self.timeout).await?;

        if result.success {
            Ok(result.output)
        } else {
            Err(ActionError::Failed {
                code: result.code,
                output: result.output,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::post_deploy_action;

    #[tokio::test]
    async fn test_returns_trimmed_output() {
        let runner = ActionRunner::new(None);
        let action = post_deploy_action("greet", &["echo", "reloaded"]);

        let output = runner.run(&action).await.expect("Action failed");
        assert_eq!(output, "reloaded");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let runner = ActionRunner::new(None);
        let action = post_deploy_action("broken", &["false"]);

        let result = runner.run(&action).await;
        assert!(matches!(result, Err(ActionError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let runner = ActionRunner::new(None);
        let action = post_deploy_action("empty", &[]);

        let result = runner.run(&action).await;
        assert!(matches!(
            result,
            Err(ActionError::Exec(exec::ExecError::EmptyCommand))
        ));
    }
}
