use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::dispatch::ConfirmationGate;

/// A confirmation waiting for the user's answer.
pub struct PendingPrompt {
    pub description: String,
    reply: oneshot::Sender<bool>,
}

impl PendingPrompt {
    pub fn answer(self, confirmed: bool) {
        let _ = self.reply.send(confirmed);
    }

    /// True once the asking side has given up (timed out or dropped).
    pub fn is_expired(&self) -> bool {
        self.reply.is_closed()
    }
}

/// Confirmation gate answered from the terminal's key handler.
pub struct PromptGate {
    prompts: mpsc::UnboundedSender<PendingPrompt>,
    timeout: Duration,
}

impl PromptGate {
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<PendingPrompt>) {
        let (prompts, rx) = mpsc::unbounded_channel();
        (Self { prompts, timeout }, rx)
    }
}

#[async_trait]
impl ConfirmationGate for PromptGate {
    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let pending = PendingPrompt { description: prompt.to_string(), reply };
        if self.prompts.send(pending).is_err() {
            return false;
        }
        match tokio::time::timeout(self.timeout, answer).await {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(_)) => false,
            Err(_) => {
                debug!(prompt, "confirmation timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn answer_is_forwarded() {
        let (gate, mut rx) = PromptGate::new(Duration::from_secs(10));
        let asking = tokio::spawn(async move { gate.confirm("Stop abc123?").await });
        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.description, "Stop abc123?");
        pending.answer(true);
        assert!(asking.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_prompt_times_out_as_declined() {
        let (gate, mut rx) = PromptGate::new(Duration::from_secs(10));
        let asking = tokio::spawn(async move { gate.confirm("Delete user?").await });
        let pending = rx.recv().await.unwrap();
        assert!(!pending.is_expired());
        assert!(!asking.await.unwrap());
        assert!(pending.is_expired());
    }

    #[tokio::test]
    async fn closed_terminal_declines() {
        let (gate, rx) = PromptGate::new(Duration::from_secs(10));
        drop(rx);
        assert!(!gate.confirm("Stop?").await);
    }
}
