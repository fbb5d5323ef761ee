//! Operator confirmation before touching production data.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

/// Decides whether a migration may proceed
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, tag: &str) -> bool;
}

/// Approves every run
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationGate for AutoConfirm {
    async fn confirm(&self, _tag: &str) -> bool {
        true
    }
}

/// Declines every run
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

#[async_trait]
impl ConfirmationGate for DenyAll {
    async fn confirm(&self, _tag: &str) -> bool {
        false
    }
}

/// Asks the operator on stdin to type the migration tag back
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmationGate;

#[async_trait]
impl ConfirmationGate for StdinConfirmationGate {
    async fn confirm(&self, tag: &str) -> bool {
        let mut stdout = tokio::io::stdout();
        let prompt = format!("⚠️  About to run '{tag}' against PRODUCTION. Type the tag to continue: ");
        if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        let mut answer = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut answer).await {
            Ok(_) => answer.trim() == tag,
            Err(error) => {
                warn!(error = %error, "Failed to read confirmation");
                false
            }
        }
    }
}
