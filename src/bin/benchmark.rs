use clap::Parser;
use mcts::games::skirmish::Skirmish;
use mcts::{logging, Board, MctsAgent, Player, SearchBudget, SearchConfig};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of self-play games (default: 1)
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Search rounds per move (default: 500)
    #[arg(long, default_value_t = 500)]
    rounds: u32,

    /// Exploration constant (default: sqrt(2))
    #[arg(long, default_value_t = std::f64::consts::SQRT_2)]
    exploration: f64,

    /// Base RNG seed; omit to seed each agent from entropy
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    let args = Args::parse();
    let _logger = logging::init().ok();

    println!("Three-Player Skirmish - MCTS Benchmark");
    println!("======================================");
    println!("Games: {}", args.games);
    println!("Rounds per move: {}", args.rounds);
    println!("Exploration: {:.3}", args.exploration);
    match args.seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!("--------------------------------------");

    #[cfg(debug_assertions)]
    println!("WARNING: Running in debug mode. Performance will be significantly lower.\nUse --release for accurate benchmarks.\n");

    let mut wins = [0u32; 3];
    let mut draws = 0u32;
    let mut totals = Totals::default();

    for game_no in 0..args.games {
        match play_game(&args, game_no, &mut totals) {
            Some(winner) => wins[winner.index()] += 1,
            None => draws += 1,
        }
    }

    println!("\nResults:");
    for color in Player::ALL {
        println!("  {} wins: {}", color, wins[color.index()]);
    }
    println!("  Draws: {}", draws);
    print_totals(&totals);
}

/// Plays one full game between three independent agents and returns the
/// winner, or `None` on a draw.
fn play_game(args: &Args, game_no: u32, totals: &mut Totals) -> Option<Player> {
    let mut game = Skirmish::new();
    let mut agents: Vec<MctsAgent> = Player::ALL
        .iter()
        .map(|color| {
            let mut config = SearchConfig::new().with_exploration(args.exploration);
            if let Some(seed) = args.seed {
                config = config.with_seed(seed + (game_no as u64) * 3 + color.index() as u64);
            }
            MctsAgent::new(config).with_name(color.to_string())
        })
        .collect();

    let start = Instant::now();
    while !game.is_over() {
        let agent = &mut agents[game.turn().index()];
        let mv = agent
            .choose_move(&game, SearchBudget::rounds(args.rounds))
            .expect("search failed");
        game.apply(mv).expect("agent chose an illegal move");

        let stats = agent.search_stats();
        totals.moves += 1;
        totals.rounds += stats.rounds as u64;
        totals.peak_nodes = totals.peak_nodes.max(stats.nodes);
    }
    let elapsed = start.elapsed();
    totals.elapsed += elapsed;

    match game.winner() {
        Some(winner) => {
            println!(
                "Game {}: {} wins after {} plies ({:.2}s)",
                game_no + 1,
                winner,
                game.plies(),
                elapsed.as_secs_f64()
            );
            Some(winner)
        }
        None => {
            println!(
                "Game {}: draw after {} plies ({:.2}s)",
                game_no + 1,
                game.plies(),
                elapsed.as_secs_f64()
            );
            None
        }
    }
}

#[derive(Default)]
struct Totals {
    moves: u64,
    rounds: u64,
    peak_nodes: usize,
    elapsed: Duration,
}

fn print_totals(totals: &Totals) {
    let secs = totals.elapsed.as_secs_f64();
    let rps = totals.rounds as f64 / secs;

    println!("  Moves played: {}", totals.moves);
    println!("  Search rounds: {}", totals.rounds);
    println!("  Peak tree size: {} nodes", totals.peak_nodes);
    println!("  Time: {:.3}s", secs);
    println!("  RPS: {:.0} rounds/sec", rps);
}
