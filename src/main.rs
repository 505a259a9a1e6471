//! Arbor - Chess Engine
//!
//! Command-line front end for the engine.
//!
//! Usage:
//!     arbor_chess [--fen FEN] [--depth N] analyse
//!     arbor_chess self-play --plies 40 --seed 7
//!     arbor_chess perft --depth 4
//!     arbor_chess moves e2

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use arbor_chess::types::parse_square;
use arbor_chess::{
    logging, new_game, EngineConfig, GameSession, MoveGenerator, ParseError, STARTING_FEN,
};

#[derive(Parser)]
#[command(name = "arbor_chess", version, about = "Square-array chess engine")]
struct Cli {
    /// Starting position
    #[arg(long, default_value = STARTING_FEN)]
    fen: String,

    /// Search depth in plies
    #[arg(short, long, default_value_t = arbor_chess::config::DEFAULT_DEPTH)]
    depth: u32,

    /// Precomputation threads (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Do not analyse the opponent's replies in the background
    #[arg(long)]
    no_precompute: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the best move and principal line
    Analyse,
    /// Engine plays the side to move against a random opponent
    SelfPlay {
        #[arg(long, default_value_t = 40)]
        plies: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Count legal move paths
    Perft {
        #[arg(long)]
        depth: u32,
    },
    /// List legal moves of a square, or of the side to move
    Moves { square: Option<String> },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_file.as_deref())?;

    let config = EngineConfig::new(cli.depth)
        .with_threads(cli.threads)
        .with_precompute(!cli.no_precompute);

    match cli.command {
        Command::Analyse => analyse(&cli.fen, config),
        Command::SelfPlay { plies, seed } => self_play(&cli.fen, config, plies, seed),
        Command::Perft { depth } => perft(&cli.fen, depth),
        Command::Moves { square } => list_moves(&cli.fen, square.as_deref()),
    }
}

fn analyse(fen: &str, config: EngineConfig) -> anyhow::Result<()> {
    let mut game = GameSession::new(fen, config).context("invalid starting position")?;
    println!("{}", game.board());

    let start = Instant::now();
    let best = game.best_move();
    if best.is_null() {
        println!("no legal moves");
        return Ok(());
    }
    let line: Vec<String> = game.principal_line().iter().map(ToString::to_string).collect();

    println!("bestmove {best}");
    println!("line {}", line.join(" "));
    println!("time {} ms", start.elapsed().as_millis());
    Ok(())
}

fn self_play(fen: &str, config: EngineConfig, plies: usize, seed: u64) -> anyhow::Result<()> {
    let mut game = GameSession::new(fen, config).context("invalid starting position")?;
    let engine_side = game.board().side_to_move();
    let generator = MoveGenerator::new();
    let mut rng = StdRng::seed_from_u64(seed);

    for ply in 0..plies {
        let side = game.board().side_to_move();
        if game.is_in_checkmate(side) {
            println!("{side} is checkmated");
            break;
        }
        if game.is_in_stalemate(side) {
            println!("stalemate");
            break;
        }

        let mv = if side == engine_side {
            game.play_engine_move()?
        } else {
            let Some(mv) = generator.random_move(game.board(), &mut rng) else {
                bail!("no move available for {side}");
            };
            game.make_move(mv)?;
            mv
        };
        println!("{:>3}. {side} {mv}", ply + 1);
    }

    println!("{}", game.board());
    println!("{}", game.fen());
    Ok(())
}

fn perft(fen: &str, depth: u32) -> anyhow::Result<()> {
    let board = new_game(fen)?;
    let generator = MoveGenerator::new();
    for d in 1..=depth {
        let start = Instant::now();
        let nodes = generator.perft(&board, d);
        println!("perft {d}: {nodes} ({} ms)", start.elapsed().as_millis());
    }
    Ok(())
}

fn list_moves(fen: &str, square: Option<&str>) -> anyhow::Result<()> {
    let board = new_game(fen)?;
    let generator = MoveGenerator::new();

    let moves = match square {
        Some(name) => {
            let sq = parse_square(name).ok_or_else(|| ParseError::Square(name.to_string()))?;
            generator.legal_moves(&board, sq, true)
        }
        None => generator.generate_legal_moves(&board),
    };

    let side = board.side_to_move();
    println!("{}", board.to_text());
    let moves: Vec<String> = moves.iter().map(ToString::to_string).collect();
    println!("{} moves: {}", moves.len(), moves.join(" "));
    if generator.is_in_check(&board, side) {
        let checker = generator
            .checking_square(&board, side)
            .map(arbor_chess::types::square_name)
            .unwrap_or_default();
        println!("{side} is in check from {checker}");
    }
    Ok(())
}
