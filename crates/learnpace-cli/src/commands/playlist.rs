use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use learnpace_core::{
    PlaylistImport, PlaylistStore, ProgressReport, SchedulePlanner, WatchTime,
};
use serde::Serialize;

use super::{print_json, today, CmdResult, Context};

#[derive(Subcommand)]
pub enum PlaylistAction {
    /// Import a playlist from a JSON export
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Days to finish in (defaults to schedule.default_target_days)
        #[arg(long)]
        target_days: Option<u32>,
        /// First day of the schedule (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
    /// List imported playlists
    List,
    /// Show progress for a playlist
    Show {
        /// Playlist ID
        id: String,
    },
    /// Show the full day-by-day schedule
    Schedule {
        /// Playlist ID
        id: String,
    },
    /// Show the videos due on a date
    Today {
        /// Playlist ID
        id: String,
        /// Date to plan (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Change the target completion window
    Edit {
        /// Playlist ID
        id: String,
        #[arg(long)]
        target_days: u32,
    },
    /// Delete a playlist and its completion history
    Delete {
        /// Playlist ID
        id: String,
    },
}

#[derive(Serialize)]
struct ImportSummary {
    id: String,
    title: String,
    video_count: usize,
    skipped: usize,
    total_duration: WatchTime,
    total_duration_human: String,
    /// Extrapolated over skipped entries too
    estimated_total_human: Option<String>,
    target_completion_days: u32,
    daily_target: WatchTime,
}

#[derive(Serialize)]
struct PlaylistRow {
    id: String,
    title: String,
    start_date: NaiveDate,
    target_completion_days: u32,
    video_count: usize,
    completed_count: usize,
    total_duration_human: String,
}

pub fn run(action: PlaylistAction) -> CmdResult {
    let ctx = Context::open()?;

    match action {
        PlaylistAction::Import {
            file,
            target_days,
            start_date,
        } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
            let import = PlaylistImport::from_json(&content)?;
            let skipped = import.skipped;
            let estimated = import.estimated_total_duration();
            let target_days = target_days.unwrap_or(ctx.config.schedule.default_target_days);
            let playlist =
                import.into_playlist(ctx.user_id(), start_date.unwrap_or_else(today), target_days)?;
            ctx.db.insert_playlist(&playlist)?;

            print_json(&ImportSummary {
                id: playlist.id.clone(),
                title: playlist.title.clone(),
                video_count: playlist.video_count(),
                skipped,
                total_duration: playlist.total_duration(),
                total_duration_human: playlist.total_duration().human(),
                estimated_total_human: estimated.filter(|_| skipped > 0).map(WatchTime::human),
                target_completion_days: target_days,
                daily_target: SchedulePlanner::new(&playlist).daily_target(),
            })?;
        }
        PlaylistAction::List => {
            let rows: Vec<PlaylistRow> = ctx
                .db
                .list_playlists(ctx.user_id())?
                .iter()
                .map(|p| PlaylistRow {
                    id: p.id.clone(),
                    title: p.title.clone(),
                    start_date: p.start_date,
                    target_completion_days: p.target_completion_days().get(),
                    video_count: p.video_count(),
                    completed_count: p.completed_count(),
                    total_duration_human: p.total_duration().human(),
                })
                .collect();
            print_json(&rows)?;
        }
        PlaylistAction::Show { id } => {
            let playlist = ctx.db.load_playlist(&id)?;
            print_json(&ProgressReport::compute(&playlist, today()))?;
        }
        PlaylistAction::Schedule { id } => {
            let playlist = ctx.db.load_playlist(&id)?;
            print_json(&SchedulePlanner::new(&playlist).daily_schedule())?;
        }
        PlaylistAction::Today { id, date } => {
            let playlist = ctx.db.load_playlist(&id)?;
            let date = date.unwrap_or_else(today);
            print_json(&SchedulePlanner::new(&playlist).day_plan(date))?;
        }
        PlaylistAction::Edit { id, target_days } => {
            let mut playlist = ctx.db.load_playlist(&id)?;
            playlist.set_target_completion_days(target_days)?;
            ctx.db.save_playlist(&playlist)?;
            print_json(&ProgressReport::compute(&playlist, today()))?;
        }
        PlaylistAction::Delete { id } => {
            ctx.db.delete_playlist(&id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}
