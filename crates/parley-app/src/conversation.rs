use anyhow::{Context, Result};
use parley_ai::AiBridge;
use parley_store::{ChatService, StoreError};
use parley_types::{Message, MessageDraft, User};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::typing::TypingDebouncer;

/// An AI reply being generated in the background.
///
/// Dropping the handle detaches the task; `cancel` stops it.
pub struct ReplyTask {
    handle: JoinHandle<parley_store::Result<Message>>,
    service: ChatService,
    chat_id: String,
    peer_id: String,
}

impl ReplyTask {
    fn spawn(
        service: ChatService,
        bridge: AiBridge,
        chat_id: String,
        peer_id: String,
        user_id: String,
        history: Vec<Message>,
        text: String,
    ) -> Self {
        let task_service = service.clone();
        let task_chat = chat_id.clone();
        let task_peer = peer_id.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = task_service.update_typing_status(&task_chat, &task_peer, true).await {
                tracing::warn!("Failed to show AI typing status: {}", e);
            }

            let reply = bridge.generate_reply(&history, &text, &user_id).await;

            if let Err(e) = task_service.update_typing_status(&task_chat, &task_peer, false).await {
                tracing::warn!("Failed to clear AI typing status: {}", e);
            }
            task_service
                .send_message(&task_chat, MessageDraft::now(task_peer.as_str(), reply))
                .await
        });

        Self {
            handle,
            service,
            chat_id,
            peer_id,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the reply to be posted and return it
    pub async fn wait(self) -> Result<Message> {
        let message = self.handle.await.context("AI reply task did not complete")??;
        Ok(message)
    }

    /// Abort generation; the peer's typing flag is cleared and nothing is posted
    pub async fn cancel(self) {
        self.handle.abort();
        if let Err(e) = self
            .service
            .update_typing_status(&self.chat_id, &self.peer_id, false)
            .await
        {
            tracing::warn!("Failed to clear AI typing status: {}", e);
        }
    }
}

/// The chat a user currently has open
pub struct Conversation {
    service: ChatService,
    bridge: AiBridge,
    chat_id: String,
    current_user: User,
    peer: User,
    typing: TypingDebouncer,
}

impl Conversation {
    /// Open `chat_id` as `current_user_id` and mark the peer's messages read
    pub async fn open(
        service: ChatService,
        bridge: AiBridge,
        chat_id: &str,
        current_user_id: &str,
        idle: Duration,
    ) -> Result<Self> {
        let chat = service.get_chat(chat_id).await?;
        let current_user = service.get_user(current_user_id).await?;
        if !chat.has_participant(current_user_id) {
            return Err(StoreError::NotParticipant {
                chat_id: chat_id.to_string(),
                user_id: current_user_id.to_string(),
            }
            .into());
        }
        let peer = chat
            .other_participant(current_user_id)
            .cloned()
            .with_context(|| format!("Chat {} has no other participant", chat_id))?;

        let typing = TypingDebouncer::new(service.clone(), chat_id, current_user_id, idle);
        let conversation = Self {
            service,
            bridge,
            chat_id: chat_id.to_string(),
            current_user,
            peer,
            typing,
        };
        conversation.mark_read().await?;
        Ok(conversation)
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn peer(&self) -> &User {
        &self.peer
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    pub async fn messages(&self) -> Result<Vec<Message>> {
        Ok(self.service.get_chat(&self.chat_id).await?.messages)
    }

    pub async fn mark_read(&self) -> Result<usize> {
        let changed = self
            .service
            .mark_messages_as_read(&self.chat_id, &self.current_user.id)
            .await?;
        Ok(changed)
    }

    pub async fn input_changed(&mut self, text: &str) -> Result<()> {
        self.typing.input_changed(text).await?;
        Ok(())
    }

    /// Post `text` from the current user.
    ///
    /// Blank input is ignored and yields `None`; anything else is posted as
    /// typed. When the peer is an AI participant the returned `Sent` carries
    /// the pending reply.
    pub async fn send(&mut self, text: &str) -> Result<Option<Sent>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        self.typing.flush().await?;
        let history = self.messages().await?;

        let message = self
            .service
            .send_message(&self.chat_id, MessageDraft::now(self.current_user.id.as_str(), text))
            .await?;

        let reply = self.peer.is_ai.then(|| {
            tracing::debug!(chat_id = %self.chat_id, peer = %self.peer.id, "Requesting AI reply");
            ReplyTask::spawn(
                self.service.clone(),
                self.bridge.clone(),
                self.chat_id.clone(),
                self.peer.id.clone(),
                self.current_user.id.clone(),
                history,
                text.to_string(),
            )
        });

        Ok(Some(Sent { message, reply }))
    }

    pub async fn summarize(&self) -> Result<String> {
        let chat = self.service.get_chat(&self.chat_id).await?;
        Ok(self.bridge.summarize(&chat.messages, &chat.participants).await)
    }

    /// Leave the chat, clearing the current user's typing status
    pub async fn close(self) -> Result<()> {
        self.typing.shutdown().await?;
        Ok(())
    }
}

pub struct Sent {
    pub message: Message,
    pub reply: Option<ReplyTask>,
}
