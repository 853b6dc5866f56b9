// vorcast command-line entry point.
//
// Startup sequence:
// 1. Parse arguments, initialize tracing (stderr, so stdout stays JSON)
// 2. Load config, seeding config/ from defaults/ when needed
// 3. Load projections CSV into a fresh store
// 4. Run the requested query and print the result as JSON

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use vorcast_core::config::{self, Config};
use vorcast_core::ingest;
use vorcast_core::player::{PlayerId, Position};
use vorcast_core::scoring;
use vorcast_core::store::{ProjectionFilter, ProjectionStore};
use vorcast_core::valuation::{self, RankingRequest};

#[derive(Parser)]
#[command(name = "vorcast")]
#[command(about = "Rank fantasy football players by value over replacement", long_about = None)]
struct Cli {
    /// Directory holding config/ (and defaults/ to seed it from)
    #[arg(long, env = "VORCAST_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Projections CSV, overriding `data_paths.projections`
    #[arg(long, env = "VORCAST_PROJECTIONS")]
    projections: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Overall VOR rankings
    Rank {
        /// Only this position (QB, RB, WR, TE, K, DST)
        #[arg(short, long)]
        position: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        /// League size, if different from the configured one
        #[arg(long)]
        num_teams: Option<usize>,

        /// Ignore the FLEX slot
        #[arg(long, default_value_t = false)]
        no_flex: bool,
    },

    /// Likely targets for a snake-draft pick
    Targets {
        #[arg(long)]
        round: usize,

        #[arg(long)]
        slot: usize,

        #[arg(long)]
        num_teams: Option<usize>,
    },

    /// One player's projection
    Player { id: PlayerId },

    /// Players whose name contains the query
    Search {
        query: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Compare players by id
    Compare {
        #[arg(required = true)]
        ids: Vec<PlayerId>,
    },

    /// Players grouped by value tier
    Tiers,

    /// Store statistics and sources
    Stats,

    /// Point breakdown for a player under the league rules and each preset
    Score { id: PlayerId },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;

    let base_dir = resolve_base_dir(cli.config_dir.as_deref())?;
    config::ensure_config_files(&base_dir).context("failed to initialize config files")?;
    let config = config::load_config_from(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, {} scoring",
        config.league.name,
        config.league.num_teams,
        config.league.scoring_preset.name()
    );
    for warning in scoring::validate_rules(&config.league.scoring) {
        warn!("scoring rules: {}", warning);
    }

    let projections_path = cli
        .projections
        .clone()
        .unwrap_or_else(|| base_dir.join(&config.data_paths.projections));
    let store = load_store(&projections_path, &config)?;

    run(cli.command, &store, &config)
}

fn run(command: Command, store: &ProjectionStore, config: &Config) -> anyhow::Result<()> {
    let league = &config.league;
    let valuation_config = &config.valuation;

    match command {
        Command::Rank {
            position,
            limit,
            num_teams,
            no_flex,
        } => {
            let request = RankingRequest {
                num_teams: num_teams.unwrap_or(league.num_teams),
                include_flex: valuation_config.include_flex && !no_flex,
            };
            let report =
                valuation::calculate_vor_rankings(store, league, valuation_config, request)
                    .context("ranking failed")?;
            match position {
                Some(raw) => {
                    let pos = parse_position(&raw)?;
                    print_json(&report.get_position_rankings(pos, limit))
                }
                None => {
                    let mut report = report;
                    if let Some(limit) = limit {
                        report.rankings.truncate(limit);
                    }
                    print_json(&report)
                }
            }
        }
        Command::Targets {
            round,
            slot,
            num_teams,
        } => {
            let targets = valuation::get_draft_targets(
                store,
                league,
                valuation_config,
                round,
                slot,
                num_teams.unwrap_or(league.num_teams),
            )
            .context("draft targets failed")?;
            print_json(&targets)
        }
        Command::Player { id } => match store.get_player_projection(id) {
            Some(projection) => print_json(&projection),
            None => bail!("player {id} not found"),
        },
        Command::Search { query, limit } => print_json(&store.search_players(&query, limit)),
        Command::Compare { ids } => {
            let report = rank_default(store, config)?;
            print_json(&report.compare_players(&ids))
        }
        Command::Tiers => {
            let report = rank_default(store, config)?;
            print_json(&report.value_tiers())
        }
        Command::Stats => {
            #[derive(Serialize)]
            struct StatsOutput {
                statistics: vorcast_core::store::StoreStatistics,
                sources: Vec<vorcast_core::store::ProjectionSource>,
                top_projections: Vec<vorcast_core::store::PlayerProjection>,
            }
            print_json(&StatsOutput {
                statistics: store.statistics(),
                sources: store.sources(),
                top_projections: store.get_projections(&ProjectionFilter {
                    limit: Some(10),
                    ..Default::default()
                }),
            })
        }
        Command::Score { id } => {
            let Some(entry) = store.get_player_projection(id) else {
                bail!("player {id} not found");
            };

            #[derive(Serialize)]
            struct ScoreOutput {
                player: vorcast_core::player::Player,
                league: scoring::FantasyPoints,
                presets: std::collections::BTreeMap<&'static str, f64>,
            }
            let league_points = scoring::score(&entry.projection, &league.scoring)
                .with_context(|| format!("cannot score {}", entry.player.name))?;
            let presets = scoring::compare_presets(&entry.projection)
                .with_context(|| format!("cannot score {}", entry.player.name))?;
            print_json(&ScoreOutput {
                player: entry.player,
                league: league_points,
                presets,
            })
        }
    }
}

fn rank_default(store: &ProjectionStore, config: &Config) -> anyhow::Result<valuation::VorReport> {
    let request = RankingRequest::for_league(&config.league, &config.valuation);
    valuation::calculate_vor_rankings(store, &config.league, &config.valuation, request)
        .context("ranking failed")
}

fn load_store(path: &Path, config: &Config) -> anyhow::Result<ProjectionStore> {
    let records = ingest::load_records(path)
        .with_context(|| format!("failed to load projections from {}", path.display()))?;
    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("projections")
        .to_string();

    let store = ProjectionStore::with_policy(config.valuation.unknown_position);
    let report = store.ingest(&source, &records);
    for error in &report.errors {
        warn!("{}", error);
    }
    info!(
        "Loaded {} players from {}",
        report.projections_written,
        path.display()
    );
    Ok(store)
}

fn parse_position(raw: &str) -> anyhow::Result<Position> {
    match Position::from_str_pos(raw) {
        Some(pos) => Ok(pos),
        None => bail!("unknown position `{raw}`"),
    }
}

/// Pick the directory that holds config/: the explicit flag, else the
/// working directory when it has config/ or defaults/, else the per-user
/// config directory.
fn resolve_base_dir(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return Ok(cwd);
    }

    match directories::ProjectDirs::from("", "", "vorcast") {
        Some(dirs) => Ok(dirs.config_dir().to_path_buf()),
        None => Ok(cwd),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Initialize tracing to stderr; stdout carries the JSON output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vorcast=info,vorcast_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
