//! Slash commands for interactive mode

mod conversation;

pub use conversation::{ConversationCommand, list_text, resolve_id};

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Start a new chat
    NewChat,
    /// Show stored conversations
    List,
    /// Open a stored conversation by id or id prefix
    Open(String),
    /// Delete a stored conversation by id or id prefix
    Delete(String),
    /// Rename the current conversation
    Rename(String),
    /// Show a message to the user (not sent to the endpoint)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command. Returns `None` when the input is a chat message.
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };
    let command = command.to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" | "clear" => CommandResult::NewChat,

        "list" | "l" | "ls" => CommandResult::List,

        "open" | "o" => ConversationCommand::open(args),

        "delete" | "rm" => ConversationCommand::delete(args),

        "rename" | "r" => ConversationCommand::rename(args),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /n             Start a new chat
  /list, /l            List saved conversations
  /open, /o <id>       Open a saved conversation
  /delete, /rm <id>    Delete a saved conversation
  /rename, /r <title>  Rename the current conversation
  /quit, /exit, /q     Exit chatify

Ids may be shortened to any unique prefix.
Press Ctrl-C while a reply is streaming to stop it."#
        .to_string()
}
