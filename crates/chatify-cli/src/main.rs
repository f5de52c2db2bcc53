//! chatify - streaming chat client

mod commands;
mod config;
mod store;
mod utils;

use anyhow::Context;
use chatify_agent::{
    ChatEvent, ChatSession, ConversationStore, HttpTransport, Outcome, SessionConfig,
    SessionHandle,
};
use chatify_ai::{CompletionsClient, Role};
use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::commands::CommandResult;
use crate::store::JsonlStore;

/// chatify - chat with a streaming completions endpoint
#[derive(Parser, Debug)]
#[command(name = "chatify")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chat completions endpoint URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Bearer token for the endpoint
    #[arg(long)]
    api_key: Option<String>,

    /// Model name to include in requests
    #[arg(short, long)]
    model: Option<String>,

    /// User id for saved conversations (omit for an ephemeral chat)
    #[arg(short, long)]
    user: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Resume a saved conversation by id or id prefix
    #[arg(long)]
    resume: Option<String>,

    /// List saved conversations
    #[arg(long)]
    conversations: bool,

    /// Delete a saved conversation by id or id prefix
    #[arg(long)]
    delete: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("chatify=debug,chatify_ai=debug,chatify_agent=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let store: Arc<dyn ConversationStore> = Arc::new(JsonlStore::new(JsonlStore::default_dir()));

    // Conversation management does not need an endpoint
    if args.conversations || args.delete.is_some() {
        let Some(user) = cfg.resolve_user(args.user.clone()) else {
            anyhow::bail!("Saved conversations need a user. Pass --user or set `user` in the config");
        };
        if let Some(ref query) = args.delete {
            return delete_conversation(store.as_ref(), &user, query).await;
        }
        return list_conversations(store.as_ref(), &user).await;
    }

    let settings = cfg.resolve(
        config::Overrides {
            endpoint: args.endpoint,
            api_key: args.api_key,
            model: args.model,
            user: args.user,
        },
        |name| std::env::var(name).ok(),
    )?;

    let mut client = CompletionsClient::new(&settings.endpoint);
    if let Some(ref key) = settings.api_key {
        client = client.with_api_key(key);
    }
    if let Some(ref model) = settings.model {
        client = client.with_model(model);
    }
    if let Some(timeout) = settings.timeout {
        client = client
            .with_timeout(timeout)
            .context("Failed to build HTTP client")?;
    }

    let session_config = SessionConfig {
        title_max_chars: settings.title_max_chars,
    };
    let mut session = ChatSession::new(session_config, Arc::new(HttpTransport::new(client)))
        .with_store(store)
        .with_user(settings.user.clone());

    // Resume conversation if specified
    if let Some(ref query) = args.resume {
        open_conversation(&mut session, query).await?;
        println!(
            "Resuming conversation {} ({} messages)",
            session.conversation_id().unwrap_or(query),
            session.messages().len()
        );
    }

    let exit = CancellationToken::new();
    let signals = spawn_signal_handler(session.handle(), exit.clone());

    // Non-interactive mode
    let result = match args.command {
        Some(command) => run_command(&mut session, &command).await,
        None => run_interactive(&mut session, &settings, &exit).await,
    };
    signals.abort();

    // A pending stdin read would hold runtime shutdown until the next newline
    if exit.is_cancelled() {
        std::process::exit(130);
    }
    result
}

/// What a Ctrl-C does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop the reply being streamed
    AbortSend,
    /// Leave the program
    Exit,
}

impl Interrupt {
    fn for_state(sending: bool) -> Self {
        if sending {
            Interrupt::AbortSend
        } else {
            Interrupt::Exit
        }
    }
}

/// Listen for Ctrl-C for the whole run.
///
/// Once a listener is installed the default SIGINT exit is gone, so this task
/// owns both meanings: abort a running send, otherwise cancel `exit`.
fn spawn_signal_handler(handle: SessionHandle, exit: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match Interrupt::for_state(handle.is_sending()) {
                Interrupt::AbortSend => handle.abort(),
                Interrupt::Exit => {
                    exit.cancel();
                    break;
                }
            }
        }
    })
}

async fn list_conversations(store: &dyn ConversationStore, user: &str) -> anyhow::Result<()> {
    let records = store.list_conversations(user).await?;
    println!("{}", commands::list_text(&records, None, chrono::Utc::now()));
    Ok(())
}

async fn delete_conversation(
    store: &dyn ConversationStore,
    user: &str,
    query: &str,
) -> anyhow::Result<()> {
    let records = store.list_conversations(user).await?;
    let id = commands::resolve_id(&records, query).map_err(anyhow::Error::msg)?;
    store.delete_conversation(&id).await?;
    println!("Deleted conversation {}", id);
    Ok(())
}

async fn open_conversation(session: &mut ChatSession, query: &str) -> anyhow::Result<()> {
    let records = session.conversations().await?;
    let id = commands::resolve_id(&records, query).map_err(anyhow::Error::msg)?;
    session.open_conversation(&id).await?;
    Ok(())
}

async fn run_command(session: &mut ChatSession, command: &str) -> anyhow::Result<()> {
    let outcome = send_and_print(session, command).await?;
    session.flush().await;

    // The error itself was already printed from the event stream
    if outcome == Outcome::Failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive(
    session: &mut ChatSession,
    settings: &config::Settings,
    exit: &CancellationToken,
) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if io::IsTerminal::is_terminal(&io::stderr()) {
        match settings.user {
            Some(ref user) => eprintln!("chatify ({}) saving as {}", settings.endpoint, user),
            None => eprintln!("chatify ({}) not saving", settings.endpoint),
        }
        eprintln!("Type /help for commands, /exit, Ctrl-D or Ctrl-C to quit.");
        eprintln!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = exit.cancelled() => {
                println!();
                break;
            }
        };
        let Some(input) = line else {
            // EOF
            break;
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input) {
            if !handle_command(session, result).await {
                break;
            }
            println!();
            continue;
        }

        println!();
        if let Err(e) = send_and_print(session, input).await {
            eprintln!("Error: {}", e);
        }
        println!();
    }

    session.flush().await;
    Ok(())
}

/// Run a slash command. Returns `false` when the loop should exit.
async fn handle_command(session: &mut ChatSession, result: CommandResult) -> bool {
    match result {
        CommandResult::NewChat => {
            session.new_chat();
            println!("Started a new chat.");
        }
        CommandResult::List => match session.conversations().await {
            Ok(records) if records.is_empty() && session.user_id().is_none() => {
                println!("Conversations are not saved without a user.");
            }
            Ok(records) => println!(
                "{}",
                commands::list_text(&records, session.conversation_id(), chrono::Utc::now())
            ),
            Err(e) => println!("Failed to list conversations: {}", e),
        },
        CommandResult::Open(query) => match open_conversation(session, &query).await {
            Ok(()) => print_transcript(session),
            Err(e) => println!("{}", e),
        },
        CommandResult::Delete(query) => {
            let deleted = match session.conversations().await {
                Ok(records) => match commands::resolve_id(&records, &query) {
                    Ok(id) => session.delete_conversation(&id).await.map(|()| id),
                    Err(msg) => {
                        println!("{}", msg);
                        return true;
                    }
                },
                Err(e) => Err(e),
            };
            match deleted {
                Ok(id) => println!("Deleted conversation {}", id),
                Err(e) => println!("Failed to delete conversation: {}", e),
            }
        }
        CommandResult::Rename(title) => match session.conversation_id().map(str::to_string) {
            Some(id) => match session.rename_conversation(&id, &title).await {
                Ok(()) => println!("Renamed to: {}", title),
                Err(e) => println!("Failed to rename conversation: {}", e),
            },
            None => println!("Nothing to rename yet. Send a message first."),
        },
        CommandResult::Message(msg) => println!("{}", msg),
        CommandResult::Exit => return false,
        CommandResult::Unknown(cmd) => {
            println!("Unknown command: /{}", cmd);
            println!("Type /help for available commands.");
        }
    }
    true
}

fn print_transcript(session: &ChatSession) {
    println!(
        "Opened conversation {}",
        session.conversation_id().unwrap_or_default()
    );
    for message in session.messages() {
        println!();
        match message.role {
            Role::User => println!("> {}", message.content),
            Role::Assistant => println!("{}", message.content),
        }
    }
}

/// Send one message, printing the reply as it streams.
async fn send_and_print(session: &mut ChatSession, input: &str) -> anyhow::Result<Outcome> {
    let printer = tokio::spawn(print_events(session.subscribe()));

    match session.send(input).await {
        Ok(outcome) => {
            let _ = printer.await;
            Ok(outcome)
        }
        Err(e) => {
            printer.abort();
            Err(e.into())
        }
    }
}

async fn print_events(mut receiver: broadcast::Receiver<ChatEvent>) {
    let mut printed = 0;
    let mut errored = false;

    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                tracing::debug!("Event printer lagged by {} events", n);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match &event {
            ChatEvent::MessageUpdate { message, .. } => {
                // Use chars().count() for proper Unicode handling
                let text_chars: Vec<char> = message.content.chars().collect();
                if text_chars.len() > printed {
                    let new_text: String = text_chars[printed..].iter().collect();
                    print!("{}", new_text);
                    io::stdout().flush().ok();
                    printed = text_chars.len();
                }
            }
            ChatEvent::Error { message } => {
                if printed > 0 {
                    println!();
                }
                eprintln!("Error: {}", message);
                errored = true;
                printed = 0;
            }
            ChatEvent::SendEnd { outcome } => {
                if printed > 0 {
                    println!();
                }
                if *outcome == Outcome::Failed && !errored {
                    println!("[stopped]");
                }
            }
            _ => {}
        }

        if event.is_terminal() {
            break;
        }
    }
}
