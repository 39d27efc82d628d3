use anyhow::{bail, Context, Result};
use parley_ai::AiBridge;
use parley_store::{ChatService, Subscription};
use parley_types::{filter_by_peer_name, login_candidates, search_contacts, Chat, User};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::command::{Command, HELP};
use crate::conversation::{Conversation, ReplyTask};
use crate::session::{self, SessionStore};
use crate::view;

/// Logged-in state: the user and the live feed of their chat list
struct Session {
    user: User,
    updates: mpsc::UnboundedReceiver<Vec<Chat>>,
    _subscription: Subscription,
}

/// Terminal client state, driven one command at a time
pub struct App {
    service: ChatService,
    bridge: AiBridge,
    sessions: Arc<dyn SessionStore>,
    idle: Duration,
    session: Option<Session>,
    snapshot: Vec<Chat>,
    conversation: Option<Conversation>,
    replies: Vec<ReplyTask>,
}

impl App {
    pub fn new(service: ChatService, bridge: AiBridge, sessions: Arc<dyn SessionStore>, idle: Duration) -> Self {
        Self {
            service,
            bridge,
            sessions,
            idle,
            session: None,
            snapshot: Vec::new(),
            conversation: None,
            replies: Vec::new(),
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Latest chat list delivered to the logged-in user
    pub fn snapshot(&self) -> &[Chat] {
        &self.snapshot
    }

    /// Log back in as the remembered user, if there is one and it still exists
    pub async fn restore(&mut self) -> Option<String> {
        let user = session::load_current_user(self.sessions.as_ref())?;
        match self.service.get_user(&user.id).await {
            Ok(user) => {
                self.start_session(user.clone());
                Some(format!("Welcome back, {}", user.name))
            }
            Err(e) => {
                tracing::warn!("Stored user is no longer known: {}", e);
                if let Err(e) = session::clear_current_user(self.sessions.as_ref()) {
                    tracing::error!("Error removing session: {:#}", e);
                }
                None
            }
        }
    }

    /// Next chat list update, pending forever while logged out
    pub async fn next_update(&mut self) -> Option<Vec<Chat>> {
        match self.session.as_mut() {
            Some(session) => session.updates.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Absorb a delivered snapshot and return notices for the terminal.
    ///
    /// Messages arriving in the open chat are marked read.
    pub async fn apply_update(&mut self, chats: Vec<Chat>) -> Result<Vec<String>> {
        let Some(user) = self.current_user() else {
            return Ok(Vec::new());
        };
        let user_id = user.id.clone();
        let notices = view::describe_changes(&self.snapshot, &chats, &user_id);
        self.snapshot = chats;

        if let Some(conversation) = &self.conversation {
            let unread = self
                .snapshot
                .iter()
                .find(|c| c.id == conversation.chat_id())
                .is_some_and(|c| c.unread_count(&user_id) > 0);
            if unread {
                conversation.mark_read().await?;
            }
        }
        Ok(notices)
    }

    pub async fn execute(&mut self, command: Command) -> Result<String> {
        self.replies.retain(|r| !r.is_finished());

        match command {
            Command::Help => Ok(HELP.to_string()),
            Command::Users(query) => self.users(query.as_deref()).await,
            Command::Login(user_id) => self.login(&user_id).await,
            Command::Logout => self.logout().await,
            Command::Chats(query) => self.chats(query.as_deref()),
            Command::New(user_id) => self.new_chat(&user_id).await,
            Command::Open(chat_id) => self.open(&chat_id).await,
            Command::Draft(text) => {
                self.conversation_mut()?.input_changed(&text).await?;
                Ok(String::new())
            }
            Command::Summary => self.conversation_ref()?.summarize().await,
            Command::History => self.history().await,
            Command::Say(text) => self.say(&text).await,
            Command::Quit => {
                self.shutdown().await;
                Ok("Bye".to_string())
            }
            Command::Invalid(reason) => Ok(reason),
        }
    }

    /// Close the open chat and cancel replies still being generated
    pub async fn shutdown(&mut self) {
        if let Some(conversation) = self.conversation.take() {
            if let Err(e) = conversation.close().await {
                tracing::warn!("Error closing conversation: {:#}", e);
            }
        }
        for reply in self.replies.drain(..) {
            reply.cancel().await;
        }
    }

    /// Wait for every pending AI reply to be posted
    pub async fn wait_for_replies(&mut self) -> Result<()> {
        for reply in self.replies.drain(..) {
            reply.wait().await?;
        }
        Ok(())
    }

    async fn users(&self, query: Option<&str>) -> Result<String> {
        let users = self.service.get_users().await;
        let listed = match self.current_user() {
            Some(me) => search_contacts(&users, &me.id, query.unwrap_or("")),
            None => login_candidates(&users),
        };
        Ok(view::render_users(&listed))
    }

    async fn login(&mut self, user_id: &str) -> Result<String> {
        let user = self.service.get_user(user_id).await?;
        if user.is_ai {
            bail!("Cannot log in as {}", user.name);
        }
        self.end_session().await;

        if let Err(e) = session::save_current_user(self.sessions.as_ref(), &user) {
            tracing::error!("Error saving session: {:#}", e);
        }
        let name = user.name.clone();
        self.start_session(user);
        Ok(format!("Logged in as {}", name))
    }

    async fn logout(&mut self) -> Result<String> {
        if self.session.is_none() {
            return Ok("Not logged in".to_string());
        }
        self.end_session().await;
        session::clear_current_user(self.sessions.as_ref()).context("Failed to clear session")?;
        Ok("Logged out".to_string())
    }

    fn chats(&self, query: Option<&str>) -> Result<String> {
        let me = self.require_user()?;
        let chats = match query {
            Some(q) => filter_by_peer_name(&self.snapshot, &me.id, q),
            None => self.snapshot.clone(),
        };
        Ok(view::render_chat_list(&chats, &me.id))
    }

    async fn new_chat(&mut self, other_id: &str) -> Result<String> {
        let me = self.require_user()?.id.clone();
        let chat_id = self.service.find_or_create_chat(&me, other_id).await?;
        self.open(&chat_id).await
    }

    async fn open(&mut self, chat_id: &str) -> Result<String> {
        let me = self.require_user()?.id.clone();
        let conversation =
            Conversation::open(self.service.clone(), self.bridge.clone(), chat_id, &me, self.idle).await?;

        if let Some(previous) = self.conversation.replace(conversation) {
            previous.close().await?;
        }
        self.history().await
    }

    async fn history(&self) -> Result<String> {
        let conversation = self.conversation_ref()?;
        let chat = self.service.get_chat(conversation.chat_id()).await?;
        let header = format!("== {} ({}) ==", conversation.peer().name, chat.id);
        Ok(format!("{}\n{}", header, view::render_messages(&chat, &conversation.current_user().id)))
    }

    async fn say(&mut self, text: &str) -> Result<String> {
        let Some(sent) = self.conversation_mut()?.send(text).await? else {
            return Ok(String::new());
        };
        if let Some(reply) = sent.reply {
            self.replies.push(reply);
        }
        Ok(String::new())
    }

    fn start_session(&mut self, user: User) {
        let (tx, mut updates) = mpsc::unbounded_channel();
        let subscription = self.service.subscribe(&user.id, move |chats| {
            // The receiver only goes away on logout
            let _ = tx.send(chats);
        });
        tracing::info!(user_id = %user.id, "Session started");
        // subscribe() delivers the current list synchronously
        self.snapshot = updates.try_recv().unwrap_or_default();
        self.session = Some(Session {
            user,
            updates,
            _subscription: subscription,
        });
    }

    async fn end_session(&mut self) {
        self.shutdown().await;
        if let Some(session) = self.session.take() {
            tracing::info!(user_id = %session.user.id, "Session ended");
        }
        self.snapshot.clear();
    }

    fn require_user(&self) -> Result<&User> {
        self.current_user().context("Log in first with /login <user-id>")
    }

    fn conversation_ref(&self) -> Result<&Conversation> {
        self.conversation
            .as_ref()
            .context("No chat open. Use /open <chat-id> or /new <user-id>")
    }

    fn conversation_mut(&mut self) -> Result<&mut Conversation> {
        self.conversation
            .as_mut()
            .context("No chat open. Use /open <chat-id> or /new <user-id>")
    }
}
