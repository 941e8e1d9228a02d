use diesel::prelude::*;
use tracing::debug;

use super::Window;
use crate::database::models::{History, Measurement, Spec};
use crate::database::schema::{history_t, measurement_t, spec_t};
use crate::database::Db;
use crate::error::Result;
use crate::station::Station;

pub fn load_specs(conn: &mut SqliteConnection, station: Station) -> Result<Vec<Spec>> {
    let sql = spec_t::table
        .filter(spec_t::station.eq(station.as_str()))
        .select(Spec::as_select());
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    Ok(sql.load(conn)?)
}

/// Measurements of the window joined with their history record,
/// in test order
pub fn load_measurements(
    conn: &mut SqliteConnection,
    window: &Window,
) -> Result<Vec<(Measurement, History)>> {
    let mut sql = measurement_t::table
        .inner_join(history_t::table)
        .select((Measurement::as_select(), History::as_select()))
        .filter(history_t::station.eq(window.station.as_str()))
        .into_boxed();
    if let Some(from) = window.from {
        sql = sql.filter(history_t::tested_at.ge(from));
    }
    if let Some(to) = window.to {
        sql = sql.filter(history_t::tested_at.lt(to));
    }
    if let Some(jig) = &window.jig {
        sql = sql.filter(history_t::jig.eq(jig.clone()));
    }
    if let Some(week) = &window.week {
        sql = sql.filter(history_t::test_week.eq(week.clone()));
    }
    let sql = sql.order((
        history_t::tested_at.asc(),
        history_t::history_id.asc(),
        measurement_t::item.asc(),
    ));
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    Ok(sql.load(conn)?)
}

/// History records of the window that carry a pass flag
pub fn load_flagged(conn: &mut SqliteConnection, window: &Window) -> Result<Vec<History>> {
    let mut sql = history_t::table
        .select(History::as_select())
        .filter(history_t::station.eq(window.station.as_str()))
        .filter(history_t::pass_flag.is_not_null())
        .into_boxed();
    if let Some(from) = window.from {
        sql = sql.filter(history_t::tested_at.ge(from));
    }
    if let Some(to) = window.to {
        sql = sql.filter(history_t::tested_at.lt(to));
    }
    if let Some(jig) = &window.jig {
        sql = sql.filter(history_t::jig.eq(jig.clone()));
    }
    if let Some(week) = &window.week {
        sql = sql.filter(history_t::test_week.eq(week.clone()));
    }
    let sql = sql.order((history_t::tested_at.asc(), history_t::history_id.asc()));
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    Ok(sql.load(conn)?)
}
