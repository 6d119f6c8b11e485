use chrono::NaiveDate;
use clap::Subcommand;
use learnpace_core::goals::validate_count;

use super::{print_json, today, CmdResult, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show the goal for a day
    Show {
        /// Day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Set how many videos are planned for a day
    Set {
        /// Videos planned
        #[arg(allow_negative_numbers = true)]
        planned: i64,
        /// Day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Completion rate for recent days
    History {
        /// Days to include (defaults to goals.stats_window_days)
        #[arg(long)]
        days: Option<u32>,
    },
}

pub fn run(action: GoalAction) -> CmdResult {
    let ctx = Context::open()?;
    let tracker = ctx.tracker();

    match action {
        GoalAction::Show { date } => {
            let date = date.unwrap_or_else(today);
            print_json(&tracker.goal_status(ctx.user_id(), date, today())?)?;
        }
        GoalAction::Set { planned, date } => {
            let planned = validate_count("videos_planned", planned)?;
            let goal = tracker.set_goal(ctx.user_id(), date.unwrap_or_else(today), planned)?;
            print_json(&goal)?;
        }
        GoalAction::History { days } => {
            let days = days.unwrap_or(ctx.config.goals.stats_window_days);
            print_json(&tracker.goal_history(ctx.user_id(), today(), days)?)?;
        }
    }
    Ok(())
}
