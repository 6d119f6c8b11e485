use chrono::Utc;
use clap::Subcommand;
use learnpace_core::{LearningSession, PlaylistStore};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a learning session now
    Start,
    /// End a running session
    End {
        /// Session ID
        id: String,
        /// Videos completed (defaults to completions since the session started)
        #[arg(long)]
        videos: Option<u32>,
    },
    /// List recent sessions
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

pub fn run(action: SessionAction) -> CmdResult {
    let ctx = Context::open()?;

    match action {
        SessionAction::Start => {
            let session = LearningSession::start(ctx.user_id(), Utc::now());
            ctx.db.save_session(&session)?;
            print_json(&session)?;
        }
        SessionAction::End { id, videos } => {
            let mut session = ctx.db.load_session(&id)?;
            let videos = match videos {
                Some(n) => n,
                None => ctx
                    .db
                    .completions_since(&session.user_id, session.started_at)?
                    .len() as u32,
            };
            session.end(Utc::now(), videos)?;
            ctx.db.save_session(&session)?;
            print_json(&session)?;
        }
        SessionAction::List { limit } => {
            print_json(&ctx.db.list_sessions(ctx.user_id(), limit)?)?;
        }
    }
    Ok(())
}
