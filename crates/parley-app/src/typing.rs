use parley_store::{ChatService, Result};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Keeps a user's "is typing" flag in one chat in step with local input.
///
/// Every input change cancels the pending clear. Non-empty input marks the
/// user as typing and schedules a clear after `idle`; empty input clears at once.
pub struct TypingDebouncer {
    service: ChatService,
    chat_id: String,
    user_id: String,
    idle: Duration,
    pending: Option<JoinHandle<()>>,
}

impl TypingDebouncer {
    pub fn new(
        service: ChatService,
        chat_id: impl Into<String>,
        user_id: impl Into<String>,
        idle: Duration,
    ) -> Self {
        Self {
            service,
            chat_id: chat_id.into(),
            user_id: user_id.into(),
            idle,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn input_changed(&mut self, text: &str) -> Result<()> {
        self.cancel_pending();

        if text.trim().is_empty() {
            self.service
                .update_typing_status(&self.chat_id, &self.user_id, false)
                .await?;
            return Ok(());
        }

        self.service
            .update_typing_status(&self.chat_id, &self.user_id, true)
            .await?;

        let service = self.service.clone();
        let chat_id = self.chat_id.clone();
        let user_id = self.user_id.clone();
        let idle = self.idle;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            if let Err(e) = service.update_typing_status(&chat_id, &user_id, false).await {
                tracing::warn!("Failed to clear typing status: {}", e);
            }
        }));
        Ok(())
    }

    /// Cancel the timer and clear the flag now (on send)
    pub async fn flush(&mut self) -> Result<()> {
        self.cancel_pending();
        self.service
            .update_typing_status(&self.chat_id, &self.user_id, false)
            .await?;
        Ok(())
    }

    /// Same as `flush`, for leaving the chat
    pub async fn shutdown(mut self) -> Result<()> {
        self.flush().await
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingDebouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
