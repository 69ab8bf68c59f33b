//! `coach` - relay server and terminal chat for the fitness coach workflow.
//!
//! ```bash
//! # Run the relay in front of the workflow webhook
//! N8N_CHAT_WEBHOOK_URL=https://n8n.example/webhook/chat coach serve
//!
//! # Chat against a running relay
//! coach chat --relay-url http://127.0.0.1:3000
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use coachrelay::api::RelayClient;
use coachrelay::config::{
    Config, BIND_ADDR_ENV, GAME_STATE_PATH_ENV, RELAY_URL_ENV, TURN_TIMEOUT_ENV, WEBHOOK_URL_ENV,
};
use coachrelay::gamification::{badge, GameEvent, GameState, JsonFileStore};
use coachrelay::server;
use coachrelay::state::{ConversationManager, ConversationStreamUpdate, TurnOutcome};
use crossterm::style::Stylize;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "coachrelay=info,tower_http=info";
const EMPTY_REPLY_FALLBACK: &str = "(The coach sent an empty reply.)";
const QUICK_STARTS: [&str; 4] = [
    "I want to build muscle 💪",
    "Help me lose fat 🔥",
    "Boost my endurance 🏃",
    "I'm a complete beginner 🌱",
];

#[derive(Parser, Debug)]
#[command(name = "coach", about = "Chat relay and terminal client for the fitness coach")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP relay in front of the workflow webhook.
    Serve(ServeArgs),
    /// Chat with the coach through a running relay.
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = BIND_ADDR_ENV)]
    bind: Option<SocketAddr>,

    /// Workflow webhook URL.
    #[arg(long, env = WEBHOOK_URL_ENV)]
    webhook_url: Option<String>,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Relay base URL.
    #[arg(long, env = RELAY_URL_ENV)]
    relay_url: Option<String>,

    /// Seconds before a turn is abandoned.
    #[arg(long, env = TURN_TIMEOUT_ENV)]
    timeout: Option<u64>,

    /// Game progress file.
    #[arg(long, env = GAME_STATE_PATH_ENV)]
    state: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    match cli.command {
        Command::Serve(args) => {
            if let Some(bind) = args.bind {
                config.bind_addr = bind;
            }
            if args.webhook_url.is_some() {
                config.webhook_url = args.webhook_url;
            }
            config.validate()?;
            server::serve(&config).await
        }
        Command::Chat(args) => {
            if let Some(relay_url) = args.relay_url {
                config.relay_url = relay_url;
            }
            if let Some(secs) = args.timeout {
                config.turn_timeout = Duration::from_secs(secs);
            }
            if let Some(path) = args.state {
                config.game_state_path = path;
            }
            config.validate()?;
            run_chat(&config).await
        }
    }
}

async fn run_chat(config: &Config) -> Result<()> {
    let client = RelayClient::new(config)?;
    let store = JsonFileStore::new(config.game_state_path.clone());
    let mut manager = ConversationManager::new(client, Box::new(store), config.turn_timeout);

    for event in manager.start_session(Utc::now().date_naive()) {
        print_game_event(&event);
    }
    print_banner(manager.game());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await.context("cannot read from stdin")? else {
            break;
        };
        let input = match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/stats" => {
                print_stats(manager.game());
                continue;
            }
            choice => quick_start(choice).unwrap_or(choice).to_string(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(print_updates(rx));
        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

        let outcome = manager.send_message(input, Some(&tx), &cancel).await;
        interrupt.abort();
        drop(tx);
        if let Err(error) = printer.await {
            tracing::warn!(%error, "reply printer stopped unexpectedly");
        }

        match outcome? {
            TurnOutcome::Interrupted { error, .. } => {
                let note = if error.is_abort() {
                    format!("[reply cut short: {error}]")
                } else {
                    format!("[connection lost mid-reply: {error}]")
                };
                println!("{}", note.dark_grey());
            }
            TurnOutcome::Completed { .. } | TurnOutcome::Failed { .. } => {}
        }
    }

    print_stats(manager.game());
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        cancel.cancel();
    }
}

/// Stream deltas to stdout as they arrive.
async fn print_updates(mut rx: mpsc::UnboundedReceiver<ConversationStreamUpdate>) {
    let mut shown = String::new();
    let mut stdout = std::io::stdout();
    while let Some(update) = rx.recv().await {
        match update {
            ConversationStreamUpdate::Delta { delta, .. } => {
                if shown.is_empty() {
                    print!("{} ", "coach>".cyan().bold());
                }
                shown.push_str(&delta);
                print!("{delta}");
                let _ = stdout.flush();
            }
            ConversationStreamUpdate::Final { text } => {
                if shown.is_empty() {
                    let body = if text.is_empty() {
                        EMPTY_REPLY_FALLBACK
                    } else {
                        text.as_str()
                    };
                    println!("{} {body}", "coach>".cyan().bold());
                } else if text != shown {
                    println!();
                    println!("{} {text}", "coach>".cyan().bold());
                } else {
                    println!();
                }
            }
            ConversationStreamUpdate::Failed { message } => {
                if !shown.is_empty() {
                    println!();
                }
                println!("{} {}", "coach>".cyan().bold(), message.red());
            }
            ConversationStreamUpdate::Game(event) => print_game_event(&event),
        }
    }
}

fn print_game_event(event: &GameEvent) {
    match event {
        GameEvent::LevelUp { level, title } => {
            println!("{}", format!("⬆ Level {level}: {title}").yellow().bold());
        }
        GameEvent::BadgeUnlocked { id } => match badge(id) {
            Some(badge) => println!(
                "{} {}",
                format!("{} {}", badge.icon, badge.name).green().bold(),
                badge.description.dark_grey()
            ),
            None => println!("{}", format!("badge unlocked: {id}").green()),
        },
        GameEvent::StreakExtended { days } => {
            println!("{}", format!("🔥 {days}-day streak").magenta());
        }
    }
}

fn print_banner(game: &GameState) {
    println!("{}", "Fitness coach".bold());
    print_stats(game);
    println!("{}", "Try one of these, or type your own (/stats, /quit):".dark_grey());
    for (index, text) in QUICK_STARTS.iter().enumerate() {
        println!("  {} {text}", format!("{}.", index + 1).dark_grey());
    }
}

fn print_stats(game: &GameState) {
    let next = match game.xp_to_next_level() {
        Some(missing) => format!("{missing} XP to next level"),
        None => "max level".to_string(),
    };
    println!(
        "{}",
        format!(
            "Level {} {} | {} XP ({next}) | 🔥 {}d | {} badges",
            game.level,
            game.level_title(),
            game.xp,
            game.streak.count,
            game.achievements.len()
        )
        .dark_grey()
    );
}

fn quick_start(choice: &str) -> Option<&'static str> {
    let index = choice.parse::<usize>().ok()?.checked_sub(1)?;
    QUICK_STARTS.get(index).copied()
}

fn prompt() -> Result<()> {
    print!("{} ", "you>".bold());
    std::io::stdout().flush().context("cannot flush stdout")
}
