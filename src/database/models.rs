use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::database::schema::config_t)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Config {
    pub section: String,
    pub property: String,
    pub value: String,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::product_t)]
pub struct NewProduct {
    pub serial: String,
    pub model_name: String,
    pub model_suffix: String,
    pub first_seen: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::spec_t)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Spec {
    pub spec_key: String,
    pub station: String,
    pub item: String,
    pub min_limit: Option<f64>,
    pub max_limit: Option<f64>,
    pub source: Option<String>,
    pub created_at: NaiveDateTime,
}

// history_id is assigned by SQLite
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::history_t)]
pub struct NewHistory {
    pub serial: String,
    pub station: String,
    pub local_test_id: Option<String>,
    pub icount: Option<i32>,
    pub tested_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub stamp: Option<NaiveDateTime>,
    pub pass_flag: Option<String>,
    pub jig: Option<String>,
    pub test_week: String,
    pub source: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::database::schema::history_t)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct History {
    pub history_id: i32,
    pub serial: String,
    pub station: String,
    pub local_test_id: Option<String>,
    pub icount: Option<i32>,
    pub tested_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub stamp: Option<NaiveDateTime>,
    pub pass_flag: Option<String>,
    pub jig: Option<String>,
    pub test_week: String,
    pub source: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::measurement_t)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Measurement {
    pub history_id: i32,
    pub item: String,
    pub value: Option<f64>,
    pub spec_key: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::database::views::history_v)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HistoryView {
    pub history_id: i32,
    pub serial: String,
    pub station: String,
    pub tested_at: Option<NaiveDateTime>,
    pub pass_flag: Option<String>,
    pub jig: Option<String>,
    pub test_week: String,
    pub year: Option<String>,
    pub model_name: String,
    pub model_suffix: String,
}
