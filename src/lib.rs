pub mod analysis;
pub mod browse;
pub mod database;
pub mod error;
pub mod ingest;
pub mod maintenance;
pub mod station;
pub mod text;

use dotenvy::dotenv;
use std::env;

pub use error::{Error, Result};
pub use station::Station;

// Plant local time, stored without zone
pub type Timestamp = chrono::NaiveDateTime;

const DATABASE_URL: &str = "DATABASE_URL";

/// The command line value wins over DATABASE_URL from the environment or `.env`
pub fn get_database_url(cli_value: Option<String>) -> Result<String> {
    if let Some(url) = cli_value {
        return Ok(url);
    }
    dotenv().ok();
    env::var(DATABASE_URL).map_err(|_| Error::MissingDatabaseUrl)
}

pub fn now() -> Timestamp {
    chrono::Local::now().naive_local()
}
