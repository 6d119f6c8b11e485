use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "learnpace", version, about = "Paced study planner for video playlists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Playlist import, schedules and progress
    Playlist {
        #[command(subcommand)]
        action: commands::playlist::PlaylistAction,
    },
    /// Mark videos watched
    Video {
        #[command(subcommand)]
        action: commands::video::VideoAction,
    },
    /// Consecutive-day streaks
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Daily goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Learning sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Today's goal, streak and due videos
    Dashboard(commands::stats::DashboardArgs),
    /// Lifetime totals and recent goal history
    Stats(commands::stats::StatsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LEARNPACE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Playlist { action } => commands::playlist::run(action),
        Commands::Video { action } => commands::video::run(action),
        Commands::Streak { action } => commands::streak::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Dashboard(args) => commands::stats::dashboard(args),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
