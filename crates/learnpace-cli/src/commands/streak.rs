use chrono::Utc;
use clap::Subcommand;
use learnpace_core::StreakStore;
use serde::Serialize;

use super::{print_json, today, CmdResult, Context};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Show the stored streak
    Show,
    /// Recompute streaks from completion history
    Recompute {
        /// Days of history to scan (defaults to streak.lookback_days)
        #[arg(long)]
        window_days: Option<u32>,
    },
}

#[derive(Serialize)]
struct StreakView {
    current_streak: u32,
    longest_streak: u32,
    last_activity_date: Option<chrono::NaiveDate>,
}

pub fn run(action: StreakAction) -> CmdResult {
    let ctx = Context::open()?;

    match action {
        StreakAction::Show => {
            let state = ctx.db.load_streak(ctx.user_id())?;
            print_json(&StreakView {
                current_streak: state.current_as_of(today()),
                longest_streak: state.longest_streak(),
                last_activity_date: state.last_activity_date(),
            })?;
        }
        StreakAction::Recompute { window_days } => {
            let window = window_days.unwrap_or(ctx.config.streak.lookback_days);
            let summary = ctx
                .tracker()
                .streak_summary(ctx.user_id(), Utc::now(), window)?;
            print_json(&summary)?;
        }
    }
    Ok(())
}
