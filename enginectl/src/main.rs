//! enginectl - drive a UCI engine from the command line.
//!
//! Spawns the engine, runs the `uci` handshake and then either prints what
//! the engine advertised (`info`) or searches one position (`go`). Logs go to
//! stderr, or to a daily rolling file under `--log-dir`.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uci_engine::{
    BestMove, EngineInfo, EngineSession, EventKind, GoParams, OptionDescriptor, PositionSpec,
};

mod config;

#[derive(Parser)]
#[command(name = "enginectl", about = "Drive a UCI chess engine from the command line")]
struct Cli {
    /// Engine binary. Defaults to `UCI_ENGINE_PATH` or a Stockfish install.
    #[arg(short, long)]
    engine: Option<PathBuf>,

    /// Extra arguments passed to the engine.
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// Write logs to a daily rolling file in this directory instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Echo every line the engine sends to stderr.
    #[arg(long)]
    trace_lines: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the handshake and print the engine's id and options.
    Info,
    /// Search a position and print the best move.
    Go {
        /// Start position as FEN; the standard start position when omitted.
        #[arg(long)]
        fen: Option<String>,

        /// Space-separated moves played from the start position.
        #[arg(long)]
        moves: Option<String>,

        /// Search time in milliseconds.
        #[arg(long, conflicts_with = "depth")]
        movetime: Option<u64>,

        /// Search depth in plies.
        #[arg(long)]
        depth: Option<u32>,

        /// Engine option as NAME=VALUE, repeatable.
        #[arg(short, long = "option")]
        options: Vec<String>,
    },
}

#[derive(Serialize)]
struct InfoReport<'a> {
    name: Option<&'a str>,
    author: Option<&'a str>,
    options: Vec<(&'a str, &'a OptionDescriptor)>,
}

#[derive(Serialize)]
struct GoReport {
    bestmove: Option<BestMove>,
    info: Option<EngineInfo>,
}

/// Keep the returned guard alive for as long as logs should be flushed.
fn init_logging(log_dir: Option<&PathBuf>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "enginectl");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn print_info(session: &EngineSession, json: bool) -> anyhow::Result<()> {
    let state = session.state();
    let report = InfoReport {
        name: state.id_name.as_deref(),
        author: state.id_author.as_deref(),
        options: state
            .options
            .iter()
            .map(|(name, descriptor)| (name.as_str(), descriptor))
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("name:   {}", report.name.unwrap_or("<unknown>"));
    println!("author: {}", report.author.unwrap_or("<unknown>"));
    for (name, descriptor) in &report.options {
        let mut line = format!("option  {} ({})", name, descriptor.kind);
        if let Some(default) = &descriptor.default {
            line.push_str(&format!(" default {}", default));
        }
        if let (Some(min), Some(max)) = (&descriptor.min, &descriptor.max) {
            line.push_str(&format!(" range {}..{}", min, max));
        }
        if !descriptor.vars.is_empty() {
            line.push_str(&format!(" [{}]", descriptor.vars.join(", ")));
        }
        println!("{}", line);
    }
    Ok(())
}

fn print_go(report: &GoReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match &report.bestmove {
        Some(best) => match &best.ponder {
            Some(ponder) => println!("bestmove {} ponder {}", best.mv, ponder),
            None => println!("bestmove {}", best.mv),
        },
        None => println!("no best move"),
    }
    if let Some(info) = &report.info {
        if let Some(depth) = info.depth {
            println!("depth   {}", depth);
        }
        if let Some(score) = info.score {
            println!("score   {:?}", score);
        }
        if !info.pv.is_empty() {
            println!("pv      {}", info.pv.join(" "));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_ref());

    let engine_path = config::get_engine_path(cli.engine.as_deref());
    tracing::info!("Using engine at {:?}", engine_path);

    let mut session = EngineSession::spawn(&engine_path, &cli.engine_args)
        .with_context(|| format!("no engine available at {}", engine_path.display()))?;

    if cli.trace_lines {
        session.on(EventKind::Line, |event| {
            eprintln!("<< {:?}", event);
            Ok(())
        });
    }
    session.on(EventKind::Eof, |_| {
        tracing::error!("Engine terminated unexpectedly");
        Ok(())
    });

    if !session.uci().await {
        session.shutdown().await;
        bail!("engine did not complete the UCI handshake");
    }

    match cli.command {
        Commands::Info => print_info(&session, cli.json)?,
        Commands::Go {
            fen,
            moves,
            movetime,
            depth,
            options,
        } => {
            for option in &options {
                let (name, value) = config::parse_option_arg(option);
                session.set_option(&name, value.as_deref());
            }
            if !session.wait_ready().await {
                tracing::warn!("Engine did not answer isready");
            }

            session.newgame();
            session.position(&PositionSpec { fen, moves });

            let params = match (movetime, depth) {
                (_, Some(depth)) => GoParams::new().depth(depth),
                (Some(ms), None) => GoParams::new().movetime(ms),
                (None, None) => GoParams::new().movetime(1000),
            };
            let bestmove = session.go(&params).await?;
            let info = session.state().last_info().and_then(EngineInfo::parse);
            print_go(&GoReport { bestmove, info }, cli.json)?;
        }
    }

    session.shutdown().await;
    Ok(())
}
