use crate::db::Database;
use crate::error::Result;
use crate::models::IrrigationState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::warn;

const RAIN_DELAY_ACTIVE: &str = "rain_delay_active";
const RAIN_DELAY_CYCLES: &str = "rain_delay_cycles";
const WAKE_CYCLE_COUNT: &str = "wake_cycle_count";

// Irrigation State Queries

impl Database {
    /// Load the persisted counters; keys never written read as first-boot defaults.
    pub fn load_irrigation_state(&self) -> Result<IrrigationState> {
        self.with_conn(|conn| {
            let defaults = IrrigationState::default();
            Ok(IrrigationState {
                rain_delay_active: get_setting(conn, RAIN_DELAY_ACTIVE)?
                    .map(|v| v == "1")
                    .unwrap_or(defaults.rain_delay_active),
                rain_delay_cycles: get_counter(conn, RAIN_DELAY_CYCLES)?
                    .unwrap_or(defaults.rain_delay_cycles),
                wake_cycle_count: get_counter(conn, WAKE_CYCLE_COUNT)?
                    .unwrap_or(defaults.wake_cycle_count),
            })
        })
    }

    /// Write all three values in a single transaction
    pub fn save_irrigation_state(&self, state: &IrrigationState) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            set_setting(
                &tx,
                RAIN_DELAY_ACTIVE,
                if state.rain_delay_active { "1" } else { "0" },
            )?;
            set_setting(&tx, RAIN_DELAY_CYCLES, &state.rain_delay_cycles.to_string())?;
            set_setting(&tx, WAKE_CYCLE_COUNT, &state.wake_cycle_count.to_string())?;
            tx.commit()?;
            Ok(())
        })
    }

    /// When the counters were last written, if ever
    pub fn state_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            let updated_at: Option<String> = conn
                .query_row(
                    "SELECT updated_at FROM settings WHERE key = ?1",
                    [WAKE_CYCLE_COUNT],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(updated_at.and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            }))
        })
    }

    pub fn reset_irrigation_state(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM settings WHERE key IN (?1, ?2, ?3)",
                params![RAIN_DELAY_ACTIVE, RAIN_DELAY_CYCLES, WAKE_CYCLE_COUNT],
            )?;
            Ok(())
        })
    }
}

fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
    .map_err(Into::into)
}

fn get_counter(conn: &Connection, key: &str) -> Result<Option<u32>> {
    Ok(get_setting(conn, key)?.and_then(|v| {
        v.parse::<u32>().ok().or_else(|| {
            warn!(key = %key, value = %v, "Unreadable counter in database, resetting to 0");
            None
        })
    }))
}

fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
