use chrono::Utc;
use clap::Subcommand;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum VideoAction {
    /// Mark a video as watched now
    Complete {
        /// Playlist ID
        playlist_id: String,
        /// Video ID
        video_id: String,
    },
}

pub fn run(action: VideoAction) -> CmdResult {
    let ctx = Context::open()?;

    match action {
        VideoAction::Complete {
            playlist_id,
            video_id,
        } => {
            let outcome = ctx
                .tracker()
                .complete_video(&playlist_id, &video_id, Utc::now())?;
            if outcome.events.is_empty() {
                tracing::info!(%playlist_id, %video_id, "video was already completed");
            }
            print_json(&outcome)?;
        }
    }
    Ok(())
}
