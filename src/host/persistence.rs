//! Relational store: three append-only tables addressed by
//! auto-increment id (spec §4.11, §6.4). Grounded on
//! `original_source/upper_computer/Database.cpp` for the schema shape
//! and on `CambrianTech-continuum`'s `storage/sqlite.rs` for the
//! `rusqlite::Connection` usage idiom this workspace otherwise lacks.

use rusqlite::Connection;

use crate::error::FatalInit;
use crate::host::predictor::PredictionResult;
use crate::host::threshold::AlarmEvent;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &std::path::Path) -> Result<Self, FatalInit> {
        let conn = Connection::open(path)
            .map_err(|e| FatalInit(format!("cannot open sqlite store {}: {e}", path.display())))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS spectra (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                wavelengths_json TEXT NOT NULL,
                raw_spectrum_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                results_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS prediction_status (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                property TEXT NOT NULL,
                value REAL NOT NULL,
                min REAL NOT NULL,
                max REAL NOT NULL,
                status TEXT NOT NULL
            );",
        )
        .map_err(|e| FatalInit(format!("cannot create schema: {e}")))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, FatalInit> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FatalInit(format!("cannot open in-memory sqlite store: {e}")))?;
        conn.execute_batch(
            "CREATE TABLE spectra (id INTEGER PRIMARY KEY AUTOINCREMENT, ts TEXT NOT NULL, wavelengths_json TEXT NOT NULL, raw_spectrum_json TEXT NOT NULL);
             CREATE TABLE predictions (id INTEGER PRIMARY KEY AUTOINCREMENT, ts TEXT NOT NULL, results_json TEXT NOT NULL);
             CREATE TABLE prediction_status (id INTEGER PRIMARY KEY AUTOINCREMENT, ts TEXT NOT NULL, property TEXT NOT NULL, value REAL NOT NULL, min REAL NOT NULL, max REAL NOT NULL, status TEXT NOT NULL);"
        ).map_err(|e| FatalInit(format!("cannot create schema: {e}")))?;
        Ok(Self { conn })
    }

    /// One logical "prediction commit": insert the spectrum, the
    /// prediction, and one `prediction_status` row per property, wrapped
    /// in a transaction (spec §4.11 allows but does not require atomicity
    /// across the three tables; this implementation takes the stronger
    /// option since readers never need to observe a partial commit).
    pub fn commit_prediction(
        &mut self,
        timestamp: &str,
        wavelengths: &[f32],
        raw_spectrum: &[f32],
        result: &PredictionResult,
        statuses: &[(String, f32, f32, f32, Option<AlarmEvent>)],
    ) -> Result<(), rusqlite::Error> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO spectra (ts, wavelengths_json, raw_spectrum_json) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                timestamp,
                serde_json::to_string(wavelengths).unwrap_or_default(),
                serde_json::to_string(raw_spectrum).unwrap_or_default(),
            ],
        )?;

        tx.execute(
            "INSERT INTO predictions (ts, results_json) VALUES (?1, ?2)",
            rusqlite::params![timestamp, serde_json::to_string(&result.values).unwrap_or_default()],
        )?;

        for (property, value, min, max, event) in statuses {
            let status = match event {
                Some(AlarmEvent::Raised) => "ALARM",
                Some(AlarmEvent::Cleared) => "NORMAL",
                None if *value < *min || *value > *max => "ALARM",
                None => "NORMAL",
            };
            tx.execute(
                "INSERT INTO prediction_status (ts, property, value, min, max, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![timestamp, property, value, min, max, status],
            )?;
        }

        tx.commit()
    }

    pub fn count_predictions(&self) -> Result<i64, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))
    }

    pub fn count_status_rows(&self) -> Result<i64, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM prediction_status", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn commit_writes_one_row_per_table_set() {
        let mut store = Store::open_in_memory().unwrap();
        let result = PredictionResult {
            timestamp: "2026-01-01 00:00:00".into(),
            values: HashMap::from([("A".to_string(), 0.5f32), ("B".to_string(), 1.2f32)]),
        };
        store
            .commit_prediction(
                "2026-01-01 00:00:00",
                &[500.0, 510.0],
                &[0.1, 0.2],
                &result,
                &[
                    ("A".to_string(), 0.5, 0.0, 1.0, None),
                    ("B".to_string(), 1.2, 0.0, 1.0, Some(AlarmEvent::Raised)),
                ],
            )
            .unwrap();

        assert_eq!(store.count_predictions().unwrap(), 1);
        assert_eq!(store.count_status_rows().unwrap(), 2);
    }
}
