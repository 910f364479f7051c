//! # Chain 2048 CLI
//!
//! Play 2048 in the terminal, run headless simulations with configurable
//! policies, and audit the move logs those games would commit on chain.

use chain_2048_core::{
    replay, Direction, EngineConfig, GameEngine, GameStatus, MoveLog, SessionId, SpawnMode, START_BATCH_LEN,
};
use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chain-2048")]
#[command(author, version, about = "Play, simulate and audit committed 2048 games")]
struct Args {
    /// Run in interactive mode (the default; overrides --episodes)
    #[arg(short, long)]
    interactive: bool,

    /// Number of episodes to run in headless mode
    #[arg(short, long)]
    episodes: Option<u32>,

    /// Seed for policy choices and for local spawns
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Maximum steps per episode (0 = unlimited)
    #[arg(short, long, default_value = "10000")]
    max_steps: u32,

    /// Policy for headless mode
    #[arg(short, long, value_enum, default_value = "random")]
    policy: Policy,

    /// Show board and encoded commitment after each move in headless mode
    #[arg(long)]
    verbose: bool,

    /// YAML engine configuration
    #[arg(short, long, env = "CHAIN_2048_CONFIG")]
    config: Option<String>,

    /// Override the configured spawn strategy
    #[arg(long, value_enum)]
    spawn: Option<SpawnArg>,

    /// Session id as 32-byte hex (episode N uses it for N = 0 only)
    #[arg(long, conflicts_with = "player")]
    session: Option<String>,

    /// Derive session ids from this player address
    #[arg(long)]
    player: Option<String>,

    /// Replay each finished episode's move log and check every board
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Random valid moves
    Random,
    /// Cycle through actions: Left, Down, Right, Up
    Cycle,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SpawnArg {
    /// Spawns derived from session id and move index
    Seeded,
    /// Local PRNG seeded from --seed
    Local,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chain_2048=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(2);
        }
    };
    if args.verify && config.spawn != SpawnMode::Seeded {
        error!("--verify needs seeded spawns");
        return ExitCode::from(2);
    }

    let mut sessions = match SessionSource::new(&args) {
        Ok(sessions) => sessions,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(2);
        }
    };

    match headless_episodes(&args) {
        Some(episodes) => run_headless(&args, config, &mut sessions, episodes),
        None => {
            run_interactive(config, &mut sessions);
            ExitCode::SUCCESS
        }
    }
}

/// Episode count for a headless run, or `None` to play at the keyboard.
/// `--interactive` wins over `--episodes`.
fn headless_episodes(args: &Args) -> Option<u32> {
    if args.interactive {
        None
    } else {
        args.episodes
    }
}

fn load_config(args: &Args) -> Result<EngineConfig, chain_2048_core::ConfigError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    match args.spawn {
        Some(SpawnArg::Seeded) => config.spawn = SpawnMode::Seeded,
        Some(SpawnArg::Local) => config.spawn = SpawnMode::Local { seed: Some(args.seed) },
        None => {}
    }
    Ok(config)
}

/// Hands out one session id per game.
struct SessionSource {
    fixed: Option<SessionId>,
    player: Option<String>,
    rng: SmallRng,
}

impl SessionSource {
    fn new(args: &Args) -> Result<Self, chain_2048_core::InputError> {
        let fixed = args.session.as_deref().map(str::parse::<SessionId>).transpose()?;
        let mut rng = SmallRng::seed_from_u64(args.seed);
        if let Some(player) = &args.player {
            // Reject a bad address before the first game starts.
            SessionId::for_player(player, &mut rng)?;
        }
        Ok(SessionSource {
            fixed,
            player: args.player.clone(),
            rng,
        })
    }

    fn next(&mut self) -> SessionId {
        if let Some(session) = self.fixed.take() {
            return session;
        }
        match &self.player {
            Some(player) => {
                SessionId::for_player(player, &mut self.rng).unwrap_or_else(|_| SessionId::random(&mut self.rng))
            }
            None => SessionId::random(&mut self.rng),
        }
    }
}

fn print_header(engine: &GameEngine) {
    println!("\x1b[2J\x1b[H"); // Clear screen
    println!("=== 2048 ===");
    if let Some(session) = engine.session() {
        println!("Session: {}", session);
    }
    println!("Controls: WASD or Arrow Keys | Q to quit | R to restart\n");
}

/// Run interactive mode where user plays with keyboard.
fn run_interactive(config: EngineConfig, sessions: &mut SessionSource) {
    enable_raw_mode();

    let mut engine = GameEngine::new(config);
    start_game(&mut engine, sessions);
    let mut stdin = io::stdin();
    let mut buffer = [0u8; 3];

    print_header(&engine);
    print_game(&engine);

    loop {
        let bytes_read = stdin.read(&mut buffer).unwrap_or(0);
        if bytes_read == 0 {
            continue;
        }

        match parse_input(&buffer[..bytes_read]) {
            InputAction::Move(dir) => {
                if engine.status() != GameStatus::InProgress {
                    continue;
                }
                let outcome = match engine.play(dir) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!("{}", err);
                        continue;
                    }
                };
                print_header(&engine);
                print_game(&engine);

                if outcome.gained > 0 {
                    println!("  +{} points!", outcome.gained);
                }
                if let Some(encoded) = outcome.encoded {
                    println!("  Commitment: {:#066x}", encoded);
                }
                if outcome.reached_win {
                    println!("\n  *** {} reached! Keep going ***", engine.config().win_tile);
                }
                if outcome.status == GameStatus::Over {
                    println!("\n  *** GAME OVER ***");
                    println!("  Final Score: {}", engine.score());
                    println!("  Max Tile: {}", engine.max_tile());
                    println!("\n  Press R to restart or Q to quit");
                }
            }
            InputAction::Restart => {
                start_game(&mut engine, sessions);
                print_header(&engine);
                print_game(&engine);
            }
            InputAction::Quit => {
                disable_raw_mode();
                println!("\nGoodbye!");
                break;
            }
            InputAction::None => {}
        }
    }
}

fn start_game(engine: &mut GameEngine, sessions: &mut SessionSource) {
    if let Err(err) = engine.initialize(sessions.next()) {
        error!("failed to start game: {}", err);
    }
}

/// Run headless simulation mode.
fn run_headless(args: &Args, config: EngineConfig, sessions: &mut SessionSource, episodes: u32) -> ExitCode {
    let mut total_score: u64 = 0;
    let mut max_tile_overall: u32 = 0;
    let mut scores: Vec<u64> = Vec::with_capacity(episodes as usize);
    let mut max_tiles: Vec<u32> = Vec::with_capacity(episodes as usize);
    let mut verified = 0u32;
    let mut failed = 0u32;

    let mut action_rng = SmallRng::seed_from_u64(args.seed.wrapping_add(1000));

    for episode in 0..episodes {
        let mut episode_config = config.clone();
        if let SpawnMode::Local { seed: Some(seed) } = &mut episode_config.spawn {
            *seed = seed.wrapping_add(episode as u64);
        }
        let mut engine = GameEngine::new(episode_config);
        let session = sessions.next();
        if let Err(err) = engine.initialize(session) {
            error!(episode, "failed to start game: {}", err);
            return ExitCode::FAILURE;
        }
        let mut steps = 0;
        let mut action_cycle = 0;

        while engine.status() == GameStatus::InProgress && (args.max_steps == 0 || steps < args.max_steps) {
            let action = match args.policy {
                Policy::Random => select_random_action(&engine, &mut action_rng),
                Policy::Cycle => select_cycle_action(&engine, &mut action_cycle),
            };
            let Some(act) = action else {
                break;
            };
            let outcome = match engine.play(act) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(episode, "move failed: {}", err);
                    return ExitCode::FAILURE;
                }
            };
            steps += 1;

            if args.verbose {
                println!("Episode {} Step {}: {:?}", episode + 1, steps, act);
                print_game(&engine);
                if let Some(encoded) = outcome.encoded {
                    println!("commitment={:#066x}", encoded);
                }
            }
        }

        if args.verify {
            match engine.log().map(|log| verify_episode(session, log)) {
                Some(true) => verified += 1,
                _ => failed += 1,
            }
        }

        let score = engine.score();
        let max_tile = engine.max_tile();

        scores.push(score);
        max_tiles.push(max_tile);
        total_score += score;
        max_tile_overall = max_tile_overall.max(max_tile);

        if args.verbose {
            println!(
                "Episode {}: Score={}, MaxTile={}, Steps={}, Session={}",
                episode + 1,
                score,
                max_tile,
                steps,
                session
            );
        }
    }

    let avg_score = total_score as f64 / episodes.max(1) as f64;
    scores.sort();
    let median_score = if scores.is_empty() {
        0.0
    } else if scores.len() % 2 == 0 {
        (scores[scores.len() / 2 - 1] + scores[scores.len() / 2]) as f64 / 2.0
    } else {
        scores[scores.len() / 2] as f64
    };

    let mut tile_counts = std::collections::BTreeMap::new();
    for tile in &max_tiles {
        *tile_counts.entry(*tile).or_insert(0u32) += 1;
    }

    // Output results in parseable format
    println!("=== Simulation Results ===");
    println!("episodes={}", episodes);
    println!("policy={:?}", args.policy);
    println!("spawn={:?}", config.spawn);
    println!("seed={}", args.seed);
    println!("max_steps={}", args.max_steps);
    println!("avg_score={:.2}", avg_score);
    println!("median_score={:.2}", median_score);
    println!("min_score={}", scores.first().unwrap_or(&0));
    println!("max_score={}", scores.last().unwrap_or(&0));
    println!("max_tile_overall={}", max_tile_overall);
    let distribution: Vec<String> = tile_counts.iter().map(|(tile, count)| format!("{}:{}", tile, count)).collect();
    println!("tile_distribution={}", distribution.join(","));
    if args.verify {
        println!("verified={}", verified);
        println!("verify_failed={}", failed);
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Replay `log` from the session id and report whether every board matches.
fn verify_episode(session: SessionId, log: &MoveLog) -> bool {
    if let Ok(batch) = log.start_batch() {
        info!(%session, boards = START_BATCH_LEN, first = %format!("{:#x}", batch.boards[0]), "start batch ready");
    }
    match replay::verify_log(session, log.entries()) {
        Ok(report) => {
            info!(%session, moves = report.moves, "episode verified");
            true
        }
        Err(err) => {
            error!(%session, "episode failed verification: {}", err);
            false
        }
    }
}

fn legal_actions(engine: &GameEngine) -> Vec<Direction> {
    let legal = engine.legal_directions();
    Direction::all()
        .into_iter()
        .enumerate()
        .filter(|(i, _)| legal[*i])
        .map(|(_, a)| a)
        .collect()
}

/// Select a random valid action.
fn select_random_action(engine: &GameEngine, rng: &mut SmallRng) -> Option<Direction> {
    legal_actions(engine).choose(rng).copied()
}

/// Select action in a cycle: Left, Down, Right, Up.
fn select_cycle_action(engine: &GameEngine, cycle: &mut usize) -> Option<Direction> {
    let order = [Direction::Left, Direction::Down, Direction::Right, Direction::Up];
    let legal = engine.legal_directions();

    for _ in 0..4 {
        let action = order[*cycle % 4];
        *cycle += 1;
        if legal[action as usize] {
            return Some(action);
        }
    }

    None
}

enum InputAction {
    Move(Direction),
    Restart,
    Quit,
    None,
}

fn parse_input(bytes: &[u8]) -> InputAction {
    match bytes {
        // Arrow keys (escape sequences)
        [27, 91, 65] => InputAction::Move(Direction::Up),
        [27, 91, 66] => InputAction::Move(Direction::Down),
        [27, 91, 67] => InputAction::Move(Direction::Right),
        [27, 91, 68] => InputAction::Move(Direction::Left),

        [b'w'] | [b'W'] => InputAction::Move(Direction::Up),
        [b's'] | [b'S'] => InputAction::Move(Direction::Down),
        [b'a'] | [b'A'] => InputAction::Move(Direction::Left),
        [b'd'] | [b'D'] => InputAction::Move(Direction::Right),

        [b'q'] | [b'Q'] | [3] | [27] => InputAction::Quit, // q, Q, Ctrl+C, Esc
        [b'r'] | [b'R'] => InputAction::Restart,

        _ => InputAction::None,
    }
}

fn print_game(engine: &GameEngine) {
    if let Some(board) = engine.board() {
        print!("{}", board);
    }
    let _ = io::stdout().flush();
}

// Platform-specific terminal raw mode handling
#[cfg(unix)]
fn enable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag &= !(libc::ICANON | libc::ECHO);
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(unix)]
fn disable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag |= libc::ICANON | libc::ECHO;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

// Without raw mode each key needs Enter.
#[cfg(not(unix))]
fn enable_raw_mode() {}

#[cfg(not(unix))]
fn disable_raw_mode() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_keys() {
        assert!(matches!(parse_input(&[27, 91, 65]), InputAction::Move(Direction::Up)));
        assert!(matches!(parse_input(b"a"), InputAction::Move(Direction::Left)));
        assert!(matches!(parse_input(b"R"), InputAction::Restart));
        assert!(matches!(parse_input(&[3]), InputAction::Quit));
        assert!(matches!(parse_input(b"x"), InputAction::None));
    }

    #[test]
    fn test_cycle_policy_skips_illegal() {
        let mut engine = GameEngine::new(EngineConfig::default());
        engine.initialize(SessionId::from_bytes([3; 32])).unwrap();
        let mut cycle = 0;
        let action = select_cycle_action(&engine, &mut cycle).unwrap();
        assert!(engine.legal_directions()[action as usize]);
    }

    #[test]
    fn test_seeded_episode_verifies() {
        let mut engine = GameEngine::new(EngineConfig::default());
        let session = SessionId::from_bytes([9; 32]);
        engine.initialize(session).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..50 {
            match select_random_action(&engine, &mut rng) {
                Some(action) => {
                    engine.play(action).unwrap();
                }
                None => break,
            }
        }
        assert!(verify_episode(session, engine.log().unwrap()));
    }

    #[test]
    fn test_cli_args_parse() {
        let args = Args::try_parse_from(["chain-2048", "-e", "3", "--spawn", "local", "--verify"]).unwrap();
        assert_eq!(args.episodes, Some(3));
        assert!(args.verify);
        let config = load_config(&args).unwrap();
        assert_eq!(config.spawn, SpawnMode::Local { seed: Some(42) });
        assert_eq!(headless_episodes(&args), Some(3));
    }

    #[test]
    fn test_interactive_flag_selects_mode() {
        let args = Args::try_parse_from(["chain-2048", "-i", "-e", "3"]).unwrap();
        assert!(args.interactive);
        assert_eq!(headless_episodes(&args), None);

        let args = Args::try_parse_from(["chain-2048"]).unwrap();
        assert_eq!(headless_episodes(&args), None);
    }
}
