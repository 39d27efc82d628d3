use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parley_ai::{AiBridge, DISABLED_MESSAGE};
use parley_app::Conversation;
use parley_llm::{ChatClient, ChatRequest, ChatResponse, Message as LlmMessage};
use parley_store::ChatService;
use parley_types::AiConfig;
use tokio::sync::Notify;

const IDLE: Duration = Duration::from_millis(1500);

/// Answers once `release` is notified, recording the prompt it was given
struct GatedClient {
    reply: &'static str,
    release: Notify,
    prompts: Mutex<Vec<Vec<LlmMessage>>>,
}

impl GatedClient {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            release: Notify::new(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatClient for GatedClient {
    async fn chat(&self, request: ChatRequest) -> anyhow::Result<ChatResponse> {
        self.prompts.lock().unwrap().push(request.messages);
        self.release.notified().await;
        Ok(ChatResponse::text(self.reply))
    }
}

async fn seeded() -> ChatService {
    let service = ChatService::new();
    service.seed().await;
    service
}

#[tokio::test]
async fn test_open_marks_peer_messages_read() {
    let service = seeded().await;
    assert_eq!(service.get_chat("chat-2").await.unwrap().unread_count("user-1"), 1);

    let conversation = Conversation::open(service.clone(), AiBridge::disabled(), "chat-2", "user-1", IDLE)
        .await
        .unwrap();
    assert_eq!(conversation.peer().name, "Palak");
    assert_eq!(service.get_chat("chat-2").await.unwrap().unread_count("user-1"), 0);
}

#[tokio::test]
async fn test_open_rejects_outsider_and_unknown_chat() {
    let service = seeded().await;
    assert!(Conversation::open(service.clone(), AiBridge::disabled(), "chat-1", "user-3", IDLE)
        .await
        .is_err());
    assert!(Conversation::open(service, AiBridge::disabled(), "chat-nope", "user-1", IDLE)
        .await
        .is_err());
}

#[tokio::test]
async fn test_blank_input_is_not_sent() {
    let service = seeded().await;
    let mut conversation = Conversation::open(service.clone(), AiBridge::disabled(), "chat-4", "user-1", IDLE)
        .await
        .unwrap();

    assert!(conversation.send("   ").await.unwrap().is_none());
    assert!(service.get_chat("chat-4").await.unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_send_to_human_clears_typing_and_has_no_reply() {
    let service = seeded().await;
    let mut conversation = Conversation::open(service.clone(), AiBridge::disabled(), "chat-4", "user-1", IDLE)
        .await
        .unwrap();

    conversation.input_changed("hello").await.unwrap();
    assert!(service.get_chat("chat-4").await.unwrap().is_typing("user-1"));

    let sent = conversation.send("  hello\n").await.unwrap().unwrap();
    assert_eq!(sent.message.text, "  hello\n");
    assert!(sent.reply.is_none());

    let chat = service.get_chat("chat-4").await.unwrap();
    assert!(!chat.is_typing("user-1"));
    assert_eq!(chat.messages.len(), 1);
}

#[tokio::test]
async fn test_ai_peer_replies_with_typing_indicator() {
    let service = seeded().await;
    let chat_id = service.find_or_create_chat("user-1", "user-ai").await.unwrap();
    service
        .send_message(&chat_id, parley_types::MessageDraft::now("user-1", "earlier"))
        .await
        .unwrap();

    let client = GatedClient::new("Hi! I'm Gemini.");
    let bridge = AiBridge::new(Some(client.clone()), AiConfig::default());
    let mut conversation = Conversation::open(service.clone(), bridge, &chat_id, "user-1", IDLE)
        .await
        .unwrap();

    let sent = conversation.send("Who are you?").await.unwrap().unwrap();
    let reply = sent.reply.expect("AI peer should reply");

    // The AI shows as typing while the backend works
    loop {
        if service.get_chat(&chat_id).await.unwrap().is_typing("user-ai") {
            break;
        }
        tokio::task::yield_now().await;
    }

    client.release.notify_one();
    let posted = reply.wait().await.unwrap();
    assert_eq!(posted.sender_id, "user-ai");
    assert_eq!(posted.text, "Hi! I'm Gemini.");

    let chat = service.get_chat(&chat_id).await.unwrap();
    assert!(!chat.is_typing("user-ai"));
    let texts: Vec<_> = chat.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["earlier", "Who are you?", "Hi! I'm Gemini."]);

    // History excludes the message being answered; it arrives as the final user turn
    let prompts = client.prompts.lock().unwrap();
    let prompt = &prompts[0];
    assert_eq!(prompt.len(), 3);
    assert_eq!(prompt[1], LlmMessage::human("earlier"));
    assert_eq!(prompt[2], LlmMessage::human("Who are you?"));
}

#[tokio::test]
async fn test_cancelled_reply_posts_nothing() {
    let service = seeded().await;
    let chat_id = service.find_or_create_chat("user-1", "user-ai").await.unwrap();

    let client = GatedClient::new("never");
    let bridge = AiBridge::new(Some(client), AiConfig::default());
    let mut conversation = Conversation::open(service.clone(), bridge, &chat_id, "user-1", IDLE)
        .await
        .unwrap();

    let reply = conversation.send("hello?").await.unwrap().unwrap().reply.unwrap();
    reply.cancel().await;

    let chat = service.get_chat(&chat_id).await.unwrap();
    assert_eq!(chat.messages.len(), 1);
    assert!(!chat.is_typing("user-ai"));
}

#[tokio::test]
async fn test_disabled_bridge_posts_disabled_notice_and_summary() {
    let service = seeded().await;
    let chat_id = service.find_or_create_chat("user-1", "user-ai").await.unwrap();
    let mut conversation = Conversation::open(service.clone(), AiBridge::disabled(), &chat_id, "user-1", IDLE)
        .await
        .unwrap();

    let reply = conversation.send("hi").await.unwrap().unwrap().reply.unwrap();
    assert_eq!(reply.wait().await.unwrap().text, DISABLED_MESSAGE);
    assert_eq!(conversation.summarize().await.unwrap(), DISABLED_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn test_close_clears_pending_typing() {
    let service = seeded().await;
    let mut conversation = Conversation::open(service.clone(), AiBridge::disabled(), "chat-1", "user-1", IDLE)
        .await
        .unwrap();

    conversation.input_changed("half a thought").await.unwrap();
    conversation.close().await.unwrap();
    assert!(!service.get_chat("chat-1").await.unwrap().is_typing("user-1"));
}
