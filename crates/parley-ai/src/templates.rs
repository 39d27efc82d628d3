/// System instruction for the AI chat participant
pub const REPLY_SYSTEM_INSTRUCTION: &str =
    "You are a friendly and helpful messaging assistant. Keep your responses concise and conversational.";

/// Wraps the formatted transcript; `<history>` is replaced with `Name: text` lines
pub const SUMMARIZATION_PROMPT: &str =
    "Please provide a concise summary of the following chat conversation:\n\n---\n<history>\n---";

/// Label for messages whose sender is not among the participants
pub const UNKNOWN_SENDER: &str = "Unknown User";

/// Returned when no API key is configured
pub const DISABLED_MESSAGE: &str = "AI service is not available. Please configure the API key.";

/// Returned when the backend fails for any reason
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble connecting right now. Please try again later.";
