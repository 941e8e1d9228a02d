use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use tracing::debug;

use super::reshape::Batch;
use crate::database::models::Measurement;
use crate::database::schema::{history_t, measurement_t, product_t, spec_t};
use crate::database::Db;
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SavedCounts {
    pub products: usize,
    pub specs: usize,
    pub records: usize,
    pub measurements: usize,
}

/// Saves a whole batch in one transaction: either the file is stored or nothing is.
pub fn save(conn: &mut SqliteConnection, batch: &Batch) -> Result<SavedCounts> {
    conn.transaction::<_, Error, _>(|conn| {
        let mut counts = SavedCounts::default();

        // Serials already known keep their original model and first_seen
        for product in &batch.products {
            let stmt = diesel::insert_or_ignore_into(product_t::table).values(product);
            debug!("{:?}", diesel::debug_query::<Db, _>(&stmt).to_string());
            counts.products += stmt.execute(conn)?;
        }

        for spec in &batch.specs {
            counts.specs += diesel::insert_into(spec_t::table)
                .values(spec)
                .execute(conn)?;
        }

        for record in &batch.records {
            diesel::insert_into(history_t::table)
                .values(&record.history)
                .execute(conn)?;
            let history_id: i32 =
                diesel::select(sql::<Integer>("last_insert_rowid()")).get_result(conn)?;
            counts.records += 1;

            for v in &record.values {
                let row = Measurement {
                    history_id,
                    item: v.item.clone(),
                    value: v.value,
                    spec_key: v.spec_key.clone(),
                };
                counts.measurements += diesel::insert_into(measurement_t::table)
                    .values(&row)
                    .execute(conn)?;
            }
        }
        Ok(counts)
    })
}
