use parley_llm::{ChatOptions, ChatRequest, Content, Message, TextPart};

#[test]
fn test_content_text_creation() {
    let content = Content::text("Hello, world!");
    assert_eq!(content.as_text(), Some("Hello, world!"));
}

#[test]
fn test_content_parts_flatten() {
    let content = Content::Parts(vec![
        TextPart { text: "a".into() },
        TextPart { text: "b".into() },
    ]);
    assert_eq!(content.as_text(), None);
    assert_eq!(content.to_plain_text(), "ab");

    let single = Content::Parts(vec![TextPart { text: "only".into() }]);
    assert_eq!(single.as_text(), Some("only"));
}

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("Be nice").role(), "system");
    assert_eq!(Message::human("Hello").role(), "user");
    assert_eq!(Message::ai("Hi there!").role(), "model");
}

#[test]
fn test_message_serialization_human() {
    let msg = Message::human("Hello");
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("Hello"));
}

#[test]
fn test_message_deserialization_model() {
    let msg: Message = serde_json::from_str(r#"{"role":"model","content":"Sure"}"#).unwrap();
    assert_eq!(msg, Message::ai("Sure"));
}

#[test]
fn test_chat_request_with_options() {
    let request = ChatRequest::new("gemini-2.5-flash", vec![Message::human("Hello")])
        .with_options(ChatOptions::new().temperature(0.7).max_tokens(100));

    assert_eq!(request.model, "gemini-2.5-flash");
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.options.temperature, Some(0.7));
    assert_eq!(request.options.max_tokens, Some(100));
}

#[test]
fn test_chat_options_default() {
    let options = ChatOptions::default();
    assert_eq!(options.temperature, None);
    assert_eq!(options.max_tokens, None);
}
