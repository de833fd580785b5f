// Ocarina - headless music for the kiosk
// Thin driver around PlayerController: owns the one instance, feeds it commands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ocarina::{deps, Config, PlayerController, PlayerEvent};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocarina")]
#[command(about = "Headless stream player: search, play, queue and keep the music going")]
struct Args {
    /// Config file (defaults to <config dir>/ocarina/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read player commands from stdin (default)
    Repl,
    /// Play a query and keep auto-advancing until Ctrl-C
    Play { query: Vec<String> },
    /// Check that the search and renderer tools are installed
    Check,
    /// Print the effective configuration
    Config,
}

fn init_logging(config: &Config, dev: bool) -> Result<WorkerGuard> {
    let log_dir = &config.logging.directory;
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, "ocarina.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if dev { "debug" } else { "info,ocarina=debug" };
    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(base_filter);

    if dev {
        let subscriber = builder.with_writer(file_writer.and(std::io::stderr)).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = builder.with_writer(file_writer).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config - falls back to defaults if missing
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _guard = init_logging(&config, args.dev)?;

    match args.command.unwrap_or(Command::Repl) {
        Command::Check => {
            let report = deps::check_dependencies(&config).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.all_present() {
                std::process::exit(1);
            }
        }
        Command::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Command::Play { query } => {
            deps::check_dependencies(&config).await;
            let player = PlayerController::from_config(&config);
            play_until_interrupted(&player, &query.join(" ")).await?;
            player.shutdown().await;
        }
        Command::Repl => {
            deps::check_dependencies(&config).await;
            let player = PlayerController::from_config(&config);
            repl(&player).await?;
            player.shutdown().await;
        }
    }

    Ok(())
}

async fn play_until_interrupted(player: &PlayerController, query: &str) -> Result<()> {
    let mut events = player.subscribe();
    if !player.search_and_play(query).await {
        anyhow::bail!("could not play {:?}", query);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(PlayerEvent::TrackStarted { track, .. }) => println!("▶ {}", track),
                Ok(PlayerEvent::Stopped { .. }) => {
                    println!("■ nothing left to play");
                    return Ok(());
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

const HELP: &str = "commands: play <query> | queue <query> | pause | resume | next | prev | stop | volume <0-100> | status | history | help | quit";

async fn repl(player: &PlayerController) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let ok = match verb {
            "" => continue,
            "play" => player.search_and_play(rest).await,
            "queue" | "add" => player.add_to_queue(rest).await,
            "pause" => player.pause().await,
            "resume" => player.resume().await,
            "next" | "skip" => player.next_track().await,
            "prev" | "previous" | "back" => player.previous_track().await,
            "stop" => player.stop().await,
            "volume" => match rest.parse::<u8>() {
                Ok(volume) => player.set_volume(volume).await,
                Err(_) => {
                    println!("volume takes a number from 0 to 100");
                    false
                }
            },
            "status" => {
                let status = player.get_status().await;
                println!("{}", serde_json::to_string_pretty(&status)?);
                continue;
            }
            "history" => {
                for (i, track) in player.history().await.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, track);
                }
                continue;
            }
            "help" => {
                println!("{}", HELP);
                continue;
            }
            "quit" | "exit" => break,
            other => {
                println!("unknown command {:?}", other);
                continue;
            }
        };

        if ok {
            println!("ok");
        } else {
            error!(command = verb, "command failed");
            println!("failed");
        }
    }

    Ok(())
}
