use anyhow::Context as _;
use clap::{Parser, Subcommand};
use cubestack_game::{Autopilot, Game, GameConfig, GameEvent};
use cubestack_render::{DebugTextRenderer, RenderView, Renderer};
use cubestack_tools::SceneInspector;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubestack-cli", about = "Headless tools for the cube stacking game")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the shipped tunables at a glance
    Info,
    /// Run the game headless with a scripted player
    Simulate {
        /// Number of fixed ticks to run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
        /// Override the config seed
        #[arg(short, long)]
        seed: Option<u64>,
        /// YAML config overriding the built-in tunables
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Cubes the autopilot carries before delivering
        #[arg(long, default_value = "10")]
        capacity: usize,
        /// Replay the recorded events and run a second time, checking both agree
        #[arg(long)]
        verify: bool,
        /// Print the scene after the run
        #[arg(long)]
        dump: bool,
    },
    /// Print the effective config as YAML
    DumpConfig {
        /// YAML config overriding the built-in tunables
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

struct RunSummary {
    game: Game,
    celebrated_at: Option<u64>,
    popup_at: Option<u64>,
    threshold_at: Option<u64>,
}

fn run(
    config: GameConfig,
    ticks: u64,
    capacity: usize,
    record: bool,
) -> anyhow::Result<RunSummary> {
    let mut game = if record {
        Game::recording(config)?
    } else {
        Game::new(config)?
    };
    let mut pilot = Autopilot::new(capacity);
    let mut celebrated_at = None;
    let mut popup_at = None;
    let mut threshold_at = None;

    for _ in 0..ticks {
        let intent = pilot.steer(&game);
        let report = game.tick(intent)?;
        for event in &report.events {
            match event {
                GameEvent::ThresholdCrossed { .. } => threshold_at = Some(report.tick),
                GameEvent::Celebration => celebrated_at = Some(report.tick),
                GameEvent::PopupShown => popup_at = Some(report.tick),
                GameEvent::Collected { .. } | GameEvent::Scored { .. } => {}
            }
        }
    }

    Ok(RunSummary {
        game,
        celebrated_at,
        popup_at,
        threshold_at,
    })
}

fn tick_label(tick: Option<u64>) -> String {
    tick.map_or_else(|| "never".to_string(), |t| format!("tick {t}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let config = GameConfig::default();
            println!("cubestack-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "grid: {}x{} cubes, spacing {}",
                config.grid.rows, config.grid.columns, config.grid.spacing
            );
            println!("tick rate: {} Hz", config.tick_hz);
            println!("house threshold: {}", config.score.house_threshold);
            println!("seed: {}", config.seed);
        }
        Commands::Simulate {
            ticks,
            seed,
            config,
            capacity,
            verify,
            dump,
        } => {
            let mut config = GameConfig::load(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            println!(
                "Simulating: seed={}, ticks={ticks}, capacity={capacity}",
                config.seed
            );

            let first = run(config.clone(), ticks, capacity, verify).context("simulation failed")?;
            let game = &first.game;
            println!(
                "Score: {}  carried: {}  collectibles left: {}",
                game.score(),
                game.stack_len(),
                game.collectibles_remaining()
            );
            println!(
                "Threshold: {}  celebration: {}  popup: {}",
                tick_label(first.threshold_at),
                tick_label(first.celebrated_at),
                tick_label(first.popup_at)
            );
            println!("House scale: {:.3}", game.house_scale());
            println!(
                "Scene: tick={} entities={} state={:016x} layout={:016x}",
                game.scene().tick(),
                game.scene().entity_count(),
                game.scene().state_hash(),
                game.scene().layout_hash()
            );

            if let Some(journal) = game.journal().filter(|_| verify) {
                let (replayed, components) = journal.replay();
                println!(
                    "Replay: tick={} entities={} state={:016x} ({} events)",
                    replayed.tick(),
                    replayed.entity_count(),
                    replayed.state_hash(),
                    journal.len()
                );
                let replay_ok = replayed.state_hash() == game.scene().state_hash()
                    && components.content_eq(game.components());
                println!("Replay match: {}", if replay_ok { "OK" } else { "MISMATCH" });

                let second =
                    run(config, ticks, capacity, false).context("verification run failed")?;
                let rerun_ok = second.game.scene().layout_hash() == game.scene().layout_hash()
                    && second.game.score() == game.score();
                println!("Rerun match: {}", if rerun_ok { "OK" } else { "MISMATCH" });

                if !replay_ok {
                    anyhow::bail!("replaying the recorded events diverged from the run");
                }
                if !rerun_ok {
                    anyhow::bail!("runs with the same seed diverged");
                }
            }

            if dump {
                println!(
                    "{}",
                    SceneInspector::summary(game.scene(), game.components())
                );
                println!("Props:");
                for info in SceneInspector::list_entities(game.scene())
                    .into_iter()
                    .filter_map(|id| {
                        SceneInspector::inspect_entity(game.scene(), game.components(), id)
                    })
                    .filter(|info| info.name.as_deref() != Some("collectible"))
                {
                    println!("  {info}");
                }
                let view = RenderView {
                    target: game.character_position(),
                    ..RenderView::default()
                };
                print!(
                    "{}",
                    DebugTextRenderer::with_limit(32).render(game.scene(), &view)
                );
            }
        }
        Commands::DumpConfig { config } => {
            let config = GameConfig::load(config.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}
