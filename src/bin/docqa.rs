//! DocQA CLI
//!
//! Terminal front-end for the document Q&A service:
//! - Sign in and out
//! - Browse groups and conversations
//! - Ask questions, one-shot or in an interactive shell

use clap::{Parser, Subcommand};
use docqa_client::config::generate_default_config;
use docqa_client::router::{HOME_PATH, LOGIN_PATH};
use docqa_client::{
    init_logging, AppContext, ChatSnapshot, Config, ConversationId, GroupId, Message,
    MessageRole, RegisterRequest, Theme,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const SESSION_EXPIRED: &str = "Session expired. Run `docqa login <username>` to sign in again.";

#[derive(Parser)]
#[command(name = "docqa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ask questions about your team's documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/docqa/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Print diagnostic logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(short, long)]
        password: Option<String>,
        /// Display name
        #[arg(long)]
        full_name: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List groups
    Groups,

    /// List conversations in a group
    Conversations {
        /// Group id (default: first group)
        #[arg(short, long)]
        group: Option<GroupId>,
    },

    /// Print the messages of a conversation
    Show {
        conversation: ConversationId,
        #[arg(short, long)]
        group: Option<GroupId>,
    },

    /// Ask a question
    Ask {
        question: String,
        #[arg(short, long)]
        group: Option<GroupId>,
        /// Continue this conversation instead of starting a new one
        #[arg(long)]
        conversation: Option<ConversationId>,
        /// LLM provider (see `providers`)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Rename a conversation
    Rename {
        conversation: ConversationId,
        title: String,
        #[arg(short, long)]
        group: Option<GroupId>,
    },

    /// Delete a conversation
    Delete {
        conversation: ConversationId,
        #[arg(short, long)]
        group: Option<GroupId>,
    },

    /// List available LLM providers
    Providers,

    /// Show or change the theme (light, dark, toggle)
    Theme { mode: Option<String> },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive chat session
    Shell {
        #[arg(short, long)]
        group: Option<GroupId>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if cli.verbose {
        config.logging.dev_mode = true;
    }
    init_logging(&config.logging);

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Wrote {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let app = AppContext::from_config(config)?;
    app.start().await?;

    let ok = run(&app, cli.command, &cli.format).await?;
    app.shutdown().await;

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(app: &AppContext, command: Commands, format: &str) -> anyhow::Result<bool> {
    match command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password: ")?,
            };
            let outcome = app.auth.login(&username, &password).await;
            if !outcome.success {
                eprintln!("{}", outcome.message.unwrap_or_default());
                return Ok(false);
            }
            match app.auth.user().await {
                Some(user) => println!("Signed in as {}", user.display_name()),
                None => println!("Signed in"),
            }
        }

        Commands::Register {
            username,
            email,
            password,
            full_name,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password: ")?,
            };
            let mut request = RegisterRequest::new(username, email, password);
            request.full_name = full_name;

            let outcome = app.auth.register(&request).await;
            if !outcome.success {
                eprintln!("{}", outcome.message.unwrap_or_default());
                return Ok(false);
            }
            println!("Account created. Run `docqa login {}` to sign in.", request.username);
        }

        Commands::Logout => {
            app.sign_out().await;
            println!("Signed out");
        }

        Commands::Theme { mode } => {
            let theme = match mode.as_deref() {
                None => app.theme.theme(),
                Some("toggle") => app.theme.toggle(),
                Some(other) => {
                    let theme: Theme = other.parse().map_err(anyhow::Error::msg)?;
                    app.theme.set(theme);
                    theme
                }
            };
            println!("Theme: {}", theme);
        }

        Commands::Config { .. } => {}

        command => {
            if !require_session(app, route_for(&command)) {
                return Ok(false);
            }
            let ok = run_authenticated(app, command, format).await?;
            if app.reload_after_redirect().await {
                eprintln!("{}", SESSION_EXPIRED);
                return Ok(false);
            }
            return Ok(ok);
        }
    }
    Ok(true)
}

fn route_for(command: &Commands) -> &'static str {
    match command {
        Commands::Groups => "/groups",
        _ => HOME_PATH,
    }
}

/// Run the route guard; false when it sent us to the login page
fn require_session(app: &AppContext, path: &str) -> bool {
    match app.router.navigate(path) {
        Ok(route) if route.path == LOGIN_PATH => {
            eprintln!("Not signed in. Run `docqa login <username>` first.");
            false
        }
        Ok(_) => true,
        Err(e) => {
            eprintln!("{}", e);
            false
        }
    }
}

async fn run_authenticated(
    app: &AppContext,
    command: Commands,
    format: &str,
) -> anyhow::Result<bool> {
    let palette = Palette::for_theme(app.theme.theme());

    match command {
        Commands::Whoami => match app.auth.user().await {
            Some(user) => print_output(format, &user, || {
                println!("{} <{}>", user.display_name(), user.email);
                println!("Username: {}", user.username);
                println!("Role:     {}", user.role);
            })?,
            None => {
                eprintln!("Session expired. Please sign in again.");
                return Ok(false);
            }
        },

        Commands::Groups => {
            app.chat.fetch_groups().await;
            let snap = app.chat.snapshot().await;
            print_output(format, &snap.groups, || {
                println!("{:<6} {:<30} {:>8} {:>10}", "ID", "Name", "Members", "Documents");
                println!("{}", "-".repeat(58));
                for group in &snap.groups {
                    println!(
                        "{:<6} {:<30} {:>8} {:>10}",
                        group.id, group.name, group.member_count, group.document_count
                    );
                }
            })?;
        }

        Commands::Conversations { group } => {
            open_group(app, group).await;
            let snap = app.chat.snapshot().await;
            print_output(format, &snap.conversations, || print_conversations(&snap))?;
        }

        Commands::Show {
            conversation,
            group,
        } => {
            open_group(app, group).await;
            app.chat.select_conversation(conversation).await;
            let messages = app.chat.messages().await;
            print_output(format, &messages, || {
                for message in &messages {
                    print_message(message, &palette);
                }
            })?;
        }

        Commands::Ask {
            question,
            group,
            conversation,
            provider,
        } => {
            open_group(app, group).await;
            if let Some(id) = conversation {
                app.chat.select_conversation(id).await;
            }
            if provider.is_some() {
                app.chat.set_provider(provider).await;
            }

            let ok = app.chat.send_message(&question).await;
            let messages = app.chat.messages().await;
            if let Some(reply) = messages.last() {
                print_output(format, reply, || print_message(reply, &palette))?;
            }
            if let Some(id) = app.chat.current_conversation_id().await {
                eprintln!("(conversation {})", id);
            }
            return Ok(ok);
        }

        Commands::Rename {
            conversation,
            title,
            group,
        } => {
            open_group(app, group).await;
            if !app.chat.rename_conversation(conversation, &title).await {
                eprintln!("Could not rename conversation {}", conversation);
                return Ok(false);
            }
            println!("Renamed conversation {}", conversation);
        }

        Commands::Delete {
            conversation,
            group,
        } => {
            open_group(app, group).await;
            if !app.chat.delete_conversation(conversation).await {
                eprintln!("Could not delete conversation {}", conversation);
                return Ok(false);
            }
            println!("Deleted conversation {}", conversation);
        }

        Commands::Providers => {
            app.chat.fetch_providers().await;
            let snap = app.chat.snapshot().await;
            print_output(format, &snap.providers, || {
                for provider in &snap.providers {
                    let marker = if snap.provider.as_deref() == Some(provider) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {}", marker, provider);
                }
            })?;
        }

        Commands::Shell { group } => {
            open_group(app, group).await;
            return shell(app).await;
        }

        _ => {}
    }
    Ok(true)
}

/// Load groups and switch to `group` if one was requested
async fn open_group(app: &AppContext, group: Option<GroupId>) {
    app.chat.fetch_groups().await;
    if let Some(id) = group {
        if app.chat.current_group_id().await != Some(id) {
            app.chat.select_group(id).await;
        }
    }
}

/// Interactive loop; returns `false` when the session ended underneath it
async fn shell(app: &AppContext) -> anyhow::Result<bool> {
    let mut palette = Palette::for_theme(app.theme.theme());
    print_shell_header(&app.chat.snapshot().await);
    println!("Type a question, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if app.reload_after_redirect().await {
            eprintln!("{}", SESSION_EXPIRED);
            return Ok(false);
        }

        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !line.starts_with('/') {
            if !app.chat.send_message(line).await && app.chat.is_sending().await {
                println!("Still waiting for the previous answer.");
            }
            if let Some(reply) = app.chat.messages().await.last() {
                print_message(reply, &palette);
            }
            continue;
        }

        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();
        match command {
            "/quit" | "/exit" => break,
            "/help" => print_shell_help(),
            "/groups" => {
                let snap = app.chat.snapshot().await;
                for group in &snap.groups {
                    let marker = if snap.current_group_id == Some(group.id) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {:<6} {}", marker, group.id, group.name);
                }
            }
            "/group" => match arg.parse::<GroupId>() {
                Ok(id) => {
                    app.chat.select_group(id).await;
                    print_shell_header(&app.chat.snapshot().await);
                }
                Err(_) => println!("Usage: /group <id>"),
            },
            "/list" => {
                app.chat.fetch_conversations().await;
                print_conversations(&app.chat.snapshot().await);
            }
            "/open" => match arg.parse::<ConversationId>() {
                Ok(id) => {
                    app.chat.select_conversation(id).await;
                    for message in app.chat.messages().await {
                        print_message(&message, &palette);
                    }
                }
                Err(_) => println!("Usage: /open <conversation id>"),
            },
            "/new" => {
                app.chat.create_new_conversation().await;
                println!("Started a new conversation.");
            }
            "/delete" => match arg.parse::<ConversationId>() {
                Ok(id) => {
                    if app.chat.delete_conversation(id).await {
                        println!("Deleted conversation {}", id);
                    } else {
                        println!("Could not delete conversation {}", id);
                    }
                }
                Err(_) => println!("Usage: /delete <conversation id>"),
            },
            "/rename" => {
                let parsed = arg
                    .split_once(' ')
                    .and_then(|(id, title)| {
                        id.parse::<ConversationId>().ok().map(|id| (id, title))
                    });
                match parsed {
                    Some((id, title)) if app.chat.rename_conversation(id, title).await => {
                        println!("Renamed conversation {}", id);
                    }
                    Some((id, _)) => println!("Could not rename conversation {}", id),
                    None => println!("Usage: /rename <conversation id> <title>"),
                }
            }
            "/provider" => {
                if arg.is_empty() {
                    app.chat.fetch_providers().await;
                    let snap = app.chat.snapshot().await;
                    println!(
                        "Providers: {} (using {})",
                        snap.providers.join(", "),
                        snap.provider.as_deref().unwrap_or("backend default")
                    );
                } else {
                    app.chat.set_provider(Some(arg.to_string())).await;
                    println!("Using provider {}", arg);
                }
            }
            "/theme" => {
                let theme = match arg {
                    "" => app.theme.toggle(),
                    other => match other.parse::<Theme>() {
                        Ok(theme) => {
                            app.theme.set(theme);
                            theme
                        }
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    },
                };
                palette = Palette::for_theme(theme);
                println!("Theme: {}", theme);
            }
            other => println!("Unknown command {}. Try /help.", other),
        }
    }

    Ok(true)
}

fn print_shell_help() {
    println!("/groups              list groups");
    println!("/group <id>          switch group");
    println!("/list                list conversations");
    println!("/open <id>           open a conversation");
    println!("/new                 start a new conversation");
    println!("/rename <id> <title> rename a conversation");
    println!("/delete <id>         delete a conversation");
    println!("/provider [name]     show or choose the LLM provider");
    println!("/theme [light|dark]  toggle or set the theme");
    println!("/quit                leave the shell");
}

fn print_shell_header(snap: &ChatSnapshot) {
    match snap.current_group() {
        Some(group) => println!(
            "Group: {} ({} documents, {} conversations)",
            group.name,
            group.document_count,
            snap.conversations.len()
        ),
        None => println!("No group available."),
    }
}

fn print_conversations(snap: &ChatSnapshot) {
    println!("{:<6} {:<40} {:>8} {:<20}", "ID", "Title", "Messages", "Updated");
    println!("{}", "-".repeat(78));
    for conversation in &snap.conversations {
        let marker = if snap.current_conversation_id == Some(conversation.id) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<6} {:<40} {:>8} {:<20}",
            format!("{}{}", conversation.id, marker),
            conversation.display_title(),
            conversation.message_count,
            short_time(&conversation.updated_at)
        );
    }
}

/// ANSI colours for role labels
struct Palette {
    user: &'static str,
    assistant: &'static str,
    dim: &'static str,
}

const RESET: &str = "\x1b[0m";

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                user: "\x1b[96m",
                assistant: "\x1b[92m",
                dim: "\x1b[90m",
            },
            Theme::Light => Self {
                user: "\x1b[34m",
                assistant: "\x1b[32m",
                dim: "\x1b[2m",
            },
        }
    }
}

fn print_message(message: &Message, palette: &Palette) {
    let colour = match message.role {
        MessageRole::User => palette.user,
        MessageRole::Assistant => palette.assistant,
    };
    println!("{}{}{}: {}", colour, message.role, RESET, message.content);

    if let Some(sources) = &message.sources {
        for source in sources {
            println!(
                "{}  [{:.2}] {}: {}{}",
                palette.dim,
                source.score,
                source.document_name,
                excerpt(&source.content, 80),
                RESET
            );
        }
    }
}

/// Backend timestamps may or may not carry an offset
fn short_time(s: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    s.to_string()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    }
}

fn print_output<T: Serialize + ?Sized>(
    format: &str,
    value: &T,
    table: impl FnOnce(),
) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        table();
    }
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
