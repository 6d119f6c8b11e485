pub mod config;
pub mod goal;
pub mod playlist;
pub mod session;
pub mod stats;
pub mod streak;
pub mod video;

use learnpace_core::{Config, Database, ProgressTracker};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Loaded configuration plus an open database.
pub struct Context {
    pub config: Config,
    pub db: Database,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            config: Config::load()?,
            db: Database::open()?,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user.id
    }

    /// Tracker seeding new goals with `goals.default_videos_planned`.
    pub fn tracker(&self) -> ProgressTracker<'_, Database> {
        ProgressTracker::new(&self.db)
            .with_default_planned(self.config.goals.default_videos_planned)
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
