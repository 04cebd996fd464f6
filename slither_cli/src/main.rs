use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use slither_core::{
    Board, Policy, QAgent, RandomAgent, SavedModel, State, TrainConfig, load_model,
    play_episode, save_model, train, train_independent,
};

#[derive(Parser, Debug)]
#[command(version, about = "Snake board engine and tabular Q-learning trainer", long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a Q-table and optionally save it
    Train {
        /// TOML file with training hyper-parameters
        #[arg(short, long, value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,
        #[arg(short, long)]
        episodes: Option<usize>,
        /// Board edge length
        #[arg(short, long)]
        grid: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
        /// Independent runs trained in parallel; the best one is kept
        #[arg(short, long, default_value_t = 1)]
        runs: usize,
        /// Where to write the trained model
        #[arg(short, long, value_name = "MODEL_FILE")]
        output: Option<PathBuf>,
    },
    /// Play one greedy episode with a saved model
    Play {
        #[arg(short, long, value_name = "MODEL_FILE")]
        model: PathBuf,
        /// Board edge length, defaults to the one the model was trained on
        #[arg(short, long)]
        grid: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 10_000)]
        max_steps: usize,
        /// Print the board after every step
        #[arg(long)]
        show: bool,
    },
    /// Baseline episodes with a uniformly random policy
    Random {
        #[arg(short, long, default_value_t = 10)]
        grid: usize,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long, default_value_t = 10)]
        episodes: usize,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match args.command {
        Command::Train {
            config,
            episodes,
            grid,
            seed,
            runs,
            output,
        } => run_train(config, episodes, grid, seed, runs, output),
        Command::Play {
            model,
            grid,
            seed,
            max_steps,
            show,
        } => run_play(model, grid, seed, max_steps, show),
        Command::Random {
            grid,
            seed,
            episodes,
        } => run_random(grid, seed, episodes),
    }
}

fn run_train(
    config_file: Option<PathBuf>,
    episodes: Option<usize>,
    grid: Option<usize>,
    seed: Option<u64>,
    runs: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = match &config_file {
        Some(path) => TrainConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}"))?,
        None => TrainConfig::default(),
    };
    if let Some(episodes) = episodes {
        config.episodes = episodes;
    }
    if let Some(grid) = grid {
        config.grid_size = grid;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate().context("Invalid training configuration")?;

    let (table, summary) = if runs > 1 {
        let mut results = train_independent(&config, runs).context("Training failed")?;
        let best = results.remove(0);
        info!("Keeping run seeded {}", best.seed);
        (best.table, best.summary)
    } else {
        train(&config).context("Training failed")?
    };

    println!("Episodes trained:   {}", summary.episodes);
    println!("Best length:        {}", summary.best_length);
    println!("States visited:     {}", summary.states_visited);
    println!("Final epsilon:      {:.4}", summary.final_epsilon);
    for (run, length) in summary.evaluation_lengths.iter().enumerate() {
        println!("Evaluation run {}:   length {length}", run + 1);
    }

    if let Some(path) = output {
        let model = SavedModel::from_training(&config, &summary, table);
        save_model(&model, &path).with_context(|| format!("Failed to save model to {path:?}"))?;
        info!("Model saved to {path:?}");
    }
    Ok(())
}

fn run_play(
    model_path: PathBuf,
    grid: Option<usize>,
    seed: Option<u64>,
    max_steps: usize,
    show: bool,
) -> Result<()> {
    let model = load_model(&model_path)
        .with_context(|| format!("Failed to load model from {model_path:?}"))?;
    let grid = grid.unwrap_or(model.metadata.grid_size);
    if grid != model.metadata.grid_size {
        warn!(
            "Model was trained on a {0}x{0} board, playing on {1}x{1}",
            model.metadata.grid_size, grid
        );
    }

    let seed = seed.unwrap_or_else(rand::random);
    let mut board = Board::seeded(grid, seed).context("Failed to create board")?;
    let mut agent = QAgent::greedy(model.table, seed);

    if !show {
        let report = play_episode(&mut board, &mut agent, max_steps, true);
        println!(
            "Final length {} after {} steps ({:?})",
            report.length, report.steps, report.last_outcome
        );
        return Ok(());
    }

    println!("{board}");
    let mut steps = 0;
    while steps < max_steps && !board.is_terminal() {
        let state = State::from_vision(&board.vision());
        board.turn(agent.select_action(&state));
        let outcome = board.step(true);
        steps += 1;
        println!("Step {steps}: {outcome:?}, heading {}", board.heading());
        println!("{board}");
    }
    println!("Final length {} after {steps} steps", board.snake_len());
    Ok(())
}

fn run_random(grid: usize, seed: Option<u64>, episodes: usize) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut board = Board::seeded(grid, seed).context("Failed to create board")?;
    let mut agent = RandomAgent::new(seed);

    let mut total = 0;
    for episode in 0..episodes {
        board.reset(grid).context("Failed to reset board")?;
        let report = play_episode(&mut board, &mut agent, TrainConfig::default().max_steps, false);
        println!(
            "Episode {}: length {} after {} steps",
            episode + 1,
            report.length,
            report.steps
        );
        total += report.length;
    }
    if episodes > 0 {
        println!("Mean length: {:.2}", total as f64 / episodes as f64);
    }
    Ok(())
}
