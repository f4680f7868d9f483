use crate::types::CoercionPhase;
use async_trait::async_trait;
use dialoguer::Confirm;
use tracing::warn;

/// Decides whether the migration goes on after a coercion phase reported
/// columns missing from the destination schema
#[async_trait]
pub trait ContinuePolicy: Send + Sync {
    async fn should_continue(&self, phase: CoercionPhase, error_count: usize) -> bool;
}

#[async_trait]
impl<F> ContinuePolicy for F
where
    F: Fn(CoercionPhase, usize) -> bool + Send + Sync,
{
    async fn should_continue(&self, phase: CoercionPhase, error_count: usize) -> bool {
        self(phase, error_count)
    }
}

/// Policies selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ErrorPolicy {
    /// Ask on the console and wait for an answer
    #[default]
    Prompt,
    /// Always go on
    Continue,
    /// Always stop
    Abort,
}

#[async_trait]
impl ContinuePolicy for ErrorPolicy {
    async fn should_continue(&self, phase: CoercionPhase, error_count: usize) -> bool {
        match self {
            // The console read blocks; keep it off the runtime's worker threads
            ErrorPolicy::Prompt => {
                match tokio::task::spawn_blocking(move || console_prompt(phase, error_count)).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!("Console prompt failed, stopping: {}", e);
                        false
                    }
                }
            }
            ErrorPolicy::Continue => true,
            ErrorPolicy::Abort => false,
        }
    }
}

fn console_prompt(phase: CoercionPhase, error_count: usize) -> bool {
    let prompt = format!(
        "The {phase} phase hit {error_count} missing tables/columns. Would you still like to continue?"
    );
    match Confirm::new().with_prompt(prompt).default(true).interact() {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Could not read an answer from the console, stopping: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_policies() {
        assert!(ErrorPolicy::Continue.should_continue(CoercionPhase::Widen, 3).await);
        assert!(!ErrorPolicy::Abort.should_continue(CoercionPhase::Narrow, 1).await);
    }

    #[tokio::test]
    async fn test_closure_policy() {
        let tolerate_two = |_: CoercionPhase, count: usize| count <= 2;
        assert!(tolerate_two.should_continue(CoercionPhase::Widen, 2).await);
        assert!(!tolerate_two.should_continue(CoercionPhase::Widen, 3).await);
    }

    // #[tokio::test] runs on a current-thread runtime. Without a terminal the
    // prompt cannot get an answer and must decline instead of panicking.
    #[tokio::test]
    async fn test_prompt_on_current_thread_runtime() {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() || std::io::stderr().is_terminal() {
            return;
        }
        assert!(!ErrorPolicy::Prompt.should_continue(CoercionPhase::Widen, 1).await);
    }
}
