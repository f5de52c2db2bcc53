//! /open, /delete, /rename and conversation listing

use chatify_agent::{ConversationRecord, truncate_chars};
use chrono::{DateTime, Utc};

use super::CommandResult;
use crate::utils::relative_date;

pub struct ConversationCommand;

impl ConversationCommand {
    pub fn open(args: &str) -> CommandResult {
        match first_word(args) {
            Some(id) => CommandResult::Open(id.to_string()),
            None => CommandResult::Message("Usage: /open <id>".to_string()),
        }
    }

    pub fn delete(args: &str) -> CommandResult {
        match first_word(args) {
            Some(id) => CommandResult::Delete(id.to_string()),
            None => CommandResult::Message("Usage: /delete <id>".to_string()),
        }
    }

    pub fn rename(args: &str) -> CommandResult {
        if args.is_empty() {
            CommandResult::Message("Usage: /rename <title>".to_string())
        } else {
            CommandResult::Rename(args.to_string())
        }
    }
}

fn first_word(args: &str) -> Option<&str> {
    args.split_whitespace().next()
}

/// Find the conversation an id or unique id prefix refers to
pub fn resolve_id(records: &[ConversationRecord], query: &str) -> Result<String, String> {
    if let Some(exact) = records.iter().find(|r| r.id == query) {
        return Ok(exact.id.clone());
    }

    let matches: Vec<&ConversationRecord> =
        records.iter().filter(|r| r.id.starts_with(query)).collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => Err(format!("No conversation matching '{}'", query)),
        _ => Err(format!(
            "'{}' matches {} conversations, use a longer prefix",
            query,
            matches.len()
        )),
    }
}

/// Conversation list as text, newest first, marking the open one
pub fn list_text(
    records: &[ConversationRecord],
    current: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    if records.is_empty() {
        return "No saved conversations".to_string();
    }

    let mut output = String::from("Conversations:\n");
    for record in records {
        let marker = if Some(record.id.as_str()) == current {
            "*"
        } else {
            " "
        };
        output.push_str(&format!(
            "{} {}  {:<12} {}\n",
            marker,
            record.id.chars().take(8).collect::<String>(),
            relative_date(record.updated_at, now),
            truncate_chars(&record.title, 60)
        ));
    }
    output.push_str("\nUse /open <id> to continue a conversation.");
    output
}
