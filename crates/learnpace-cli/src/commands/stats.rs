use chrono::{NaiveDate, Utc};
use clap::Args;

use super::{print_json, today, CmdResult, Context};

#[derive(Args)]
pub struct StatsArgs {
    /// Days of goal history to include (defaults to goals.stats_window_days)
    #[arg(long)]
    days: Option<u32>,
}

#[derive(Args)]
pub struct DashboardArgs {
    /// Day to show (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

pub fn run(args: StatsArgs) -> CmdResult {
    let ctx = Context::open()?;
    let days = args.days.unwrap_or(ctx.config.goals.stats_window_days);
    let stats = ctx.tracker().stats(ctx.user_id(), Utc::now(), days)?;
    print_json(&stats)
}

pub fn dashboard(args: DashboardArgs) -> CmdResult {
    let ctx = Context::open()?;
    let date = args.date.unwrap_or_else(today);
    print_json(&ctx.tracker().dashboard(ctx.user_id(), date, today())?)
}
