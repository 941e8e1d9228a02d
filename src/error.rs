use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Cannot open database {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// DATABASE_URL missing from both the command line and the environment
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,

    #[error("Missing column {0} in CSV header")]
    MissingColumn(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unknown table {0}")]
    UnknownTable(String),

    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid filter '{0}', expected column:op:value")]
    InvalidFilter(String),

    #[error("Unknown station {0}")]
    UnknownStation(String),

    #[error("File {0} already exists")]
    FileExists(String),
}
