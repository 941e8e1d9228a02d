pub mod models;
pub mod schema;
pub mod views;

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};
use models::Config;

pub type Db = Sqlite;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

pub fn establish_connection(database_url: &str) -> Result<SqliteConnection> {
    SqliteConnection::establish(database_url).map_err(|source| Error::Connection {
        url: database_url.to_string(),
        source,
    })
}

pub fn get_config(connection: &mut SqliteConnection, sect: &str) -> Result<Vec<Config>> {
    use self::schema::config_t::dsl::*;

    let sql = config_t
        .filter(section.eq(sect))
        .select(Config::as_select());

    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    Ok(sql.load(connection)?)
}

pub fn get_database_version(connection: &mut SqliteConnection) -> Result<String> {
    use self::schema::config_t::dsl::*;

    let sql = config_t
        .filter(section.eq("database"))
        .filter(property.eq("version"))
        .select(value);

    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    // The version entry is written by the first migration
    Ok(sql.first(connection)?)
}

pub fn get_database_uuid(connection: &mut SqliteConnection) -> Result<String> {
    use self::schema::config_t::dsl::*;

    let sql = config_t
        .filter(section.eq("database"))
        .filter(property.eq("uuid"))
        .select(value);

    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    let results: Vec<String> = sql.load(connection)?;

    if let Some(my_uuid) = results.into_iter().next() {
        return Ok(my_uuid);
    }
    let my_uuid = uuid::Uuid::new_v4().hyphenated().to_string();
    let sql = diesel::insert_into(config_t).values((
        section.eq("database"),
        property.eq("uuid"),
        value.eq(&my_uuid),
    ));
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    sql.execute(connection)?;
    Ok(my_uuid)
}

pub fn run_migrations(connection: &mut impl MigrationHarness<Sqlite>) -> Result<()> {
    let pending = connection
        .has_pending_migration(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    if pending {
        info!("Applying pending migrations");
        connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Migration(e.to_string()))?;
    }
    Ok(())
}

/// Opens (creating if needed) the database and brings its schema up to date.
pub fn init(database_url: &str) -> Result<SqliteConnection> {
    if let Some(dir) = Path::new(database_url).parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut connection = establish_connection(database_url)?;
    run_migrations(&mut connection)?;
    let uuid = get_database_uuid(&mut connection)?;
    let version = get_database_version(&mut connection)?;
    info!(
        "Opened database {}, version {}, UUID = {}",
        database_url, version, uuid
    );
    Ok(connection)
}
