/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Users(Option<String>),
    Login(String),
    Logout,
    Chats(Option<String>),
    New(String),
    Open(String),
    Draft(String),
    Summary,
    History,
    Quit,
    /// Plain text, sent to the open chat
    Say(String),
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /users [query]     list users (contacts when logged in)
  /login <user-id>   log in as a user
  /logout            log out
  /chats [query]     list your chats, optionally filtered by name
  /new <user-id>     start (or reopen) a chat with a user
  /open <chat-id>    open a chat
  /draft <text>      type without sending (updates typing status)
  /summary           summarize the open chat
  /history           show the open chat
  /quit              exit
Anything else is sent to the open chat.";

impl Command {
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.trim().strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let optional = || (!arg.is_empty()).then(|| arg.to_string());
        let required = |build: fn(String) -> Command| {
            if arg.is_empty() {
                Self::Invalid(format!("/{} needs an argument", name))
            } else {
                build(arg.to_string())
            }
        };

        match name {
            "help" | "?" => Self::Help,
            "users" => Self::Users(optional()),
            "login" => required(Self::Login),
            "logout" => Self::Logout,
            "chats" => Self::Chats(optional()),
            "new" => required(Self::New),
            "open" => required(Self::Open),
            "draft" => Self::Draft(arg.to_string()),
            "summary" => Self::Summary,
            "history" => Self::History,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("Unknown command /{}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/login user-3"), Command::Login("user-3".into()));
        assert_eq!(Command::parse("  /chats  pal "), Command::Chats(Some("pal".into())));
        assert_eq!(Command::parse("/chats"), Command::Chats(None));
        assert_eq!(Command::parse("/draft"), Command::Draft(String::new()));
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn test_plain_text_is_said() {
        assert_eq!(Command::parse("hello there"), Command::Say("hello there".into()));
        assert_eq!(Command::parse("  indented"), Command::Say("  indented".into()));
        assert_eq!(Command::parse("   "), Command::Say("   ".into()));
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(Command::parse("/open"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/dance"), Command::Invalid(_)));
    }
}
