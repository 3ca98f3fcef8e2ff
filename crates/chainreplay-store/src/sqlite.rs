use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use chainreplay_types::{
    canonical_parse, canonical_stringify, ReplayEventCursor, ReplayTimelineRecord,
};

use crate::error::{Error, Result};
use crate::store::{
    check_cursor_monotone, SaveOutcome, StoreStats, TimelineFilter, TimelineStore,
};

// NOTE: The database is the canonical timeline, not an index over raw logs:
// records are append-only, keyed on (slot, signature, source_event_type),
// and the payload column stores the canonical JSON form so a read-back
// reproduces byte-identical hashes.

/// SQLite-backed timeline store.
pub struct SqliteTimelineStore {
    conn: Connection,
}

impl SqliteTimelineStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS timeline_events (
                slot INTEGER NOT NULL,
                signature TEXT NOT NULL,
                source_event_type TEXT NOT NULL,
                seq INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                task_pda TEXT,
                dispute_pda TEXT,
                source_event_name TEXT NOT NULL,
                source_event_sequence INTEGER NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                payload TEXT NOT NULL,
                projection_hash TEXT NOT NULL,
                PRIMARY KEY (slot, signature, source_event_type)
            );

            CREATE TABLE IF NOT EXISTS replay_cursor (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                slot INTEGER NOT NULL,
                signature TEXT NOT NULL,
                event_name TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_timeline_task ON timeline_events(task_pda);
            CREATE INDEX IF NOT EXISTS idx_timeline_dispute ON timeline_events(dispute_pda);
            CREATE INDEX IF NOT EXISTS idx_timeline_slot ON timeline_events(slot);
            "#,
        )?;
        Ok(())
    }
}

impl TimelineStore for SqliteTimelineStore {
    fn save(&mut self, records: &[ReplayTimelineRecord]) -> Result<SaveOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = SaveOutcome::default();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO timeline_events (
                    slot, signature, source_event_type, seq, event_type,
                    task_pda, dispute_pda, source_event_name,
                    source_event_sequence, timestamp_ms, payload, projection_hash
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for record in records {
                let event = &record.event;
                let changed = stmt.execute(params![
                    event.slot as i64,
                    &event.signature,
                    &record.source_event_type,
                    event.seq as i64,
                    event.event_type.as_str(),
                    &event.task_pda,
                    &event.dispute_pda,
                    &event.source_event_name,
                    event.source_event_sequence as i64,
                    event.timestamp_ms,
                    canonical_stringify(&event.payload),
                    &event.projection_hash,
                ])?;
                if changed == 0 {
                    outcome.duplicates += 1;
                } else {
                    outcome.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    fn query(&self, filter: &TimelineFilter) -> Result<Vec<ReplayTimelineRecord>> {
        let mut sql = String::from(
            r#"
            SELECT slot, signature, source_event_type, seq, event_type,
                   task_pda, dispute_pda, source_event_name,
                   source_event_sequence, timestamp_ms, payload, projection_hash
            FROM timeline_events
            WHERE 1 = 1
            "#,
        );
        let mut args: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(task) = &filter.task_pda {
            sql.push_str(" AND task_pda = ?");
            args.push(task.clone().into());
        }
        if let Some(dispute) = &filter.dispute_pda {
            sql.push_str(" AND dispute_pda = ?");
            args.push(dispute.clone().into());
        }
        if let Some(from) = filter.from_slot {
            sql.push_str(" AND slot >= ?");
            args.push((from as i64).into());
        }
        if let Some(to) = filter.to_slot {
            sql.push_str(" AND slot <= ?");
            args.push((to as i64).into());
        }
        if let Some(name) = &filter.source_event_name {
            sql.push_str(" AND source_event_name = ?");
            args.push(name.clone().into());
        }
        if let Some(source_type) = &filter.source_event_type {
            sql.push_str(" AND source_event_type = ?");
            args.push(source_type.clone().into());
        }
        if let Some(cursor) = &filter.cursor {
            sql.push_str(" AND (slot > ? OR (slot = ? AND signature > ?))");
            args.push((cursor.slot as i64).into());
            args.push((cursor.slot as i64).into());
            args.push(cursor.signature.clone().into());
        }

        sql.push_str(" ORDER BY slot ASC, signature ASC, source_event_sequence ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push((limit as i64).into());
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), row_to_raw)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(raw_to_record(row?)?);
        }
        Ok(records)
    }

    fn get_cursor(&self) -> Result<Option<ReplayEventCursor>> {
        let cursor = self
            .conn
            .query_row(
                "SELECT slot, signature, event_name FROM replay_cursor WHERE id = 1",
                [],
                |row| {
                    Ok(ReplayEventCursor {
                        slot: row.get::<_, i64>(0)? as u64,
                        signature: row.get(1)?,
                        event_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(cursor)
    }

    fn save_cursor(&mut self, cursor: Option<ReplayEventCursor>) -> Result<()> {
        match cursor {
            Some(attempted) => {
                check_cursor_monotone(self.get_cursor()?.as_ref(), &attempted)?;
                self.conn.execute(
                    r#"
                    INSERT INTO replay_cursor (id, slot, signature, event_name)
                    VALUES (1, ?1, ?2, ?3)
                    ON CONFLICT(id) DO UPDATE SET
                        slot = ?1,
                        signature = ?2,
                        event_name = ?3
                    "#,
                    params![
                        attempted.slot as i64,
                        &attempted.signature,
                        &attempted.event_name
                    ],
                )?;
            }
            None => {
                self.conn.execute("DELETE FROM replay_cursor", [])?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM timeline_events", [])?;
        self.conn.execute("DELETE FROM replay_cursor", [])?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let (event_count, unique_task_count, unique_dispute_count) = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COUNT(DISTINCT task_pda),
                   COUNT(DISTINCT dispute_pda)
            FROM timeline_events
            "#,
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;
        Ok(StoreStats {
            event_count: event_count as usize,
            unique_task_count: unique_task_count as usize,
            unique_dispute_count: unique_dispute_count as usize,
        })
    }
}

type RawRow = (
    i64,
    String,
    String,
    i64,
    String,
    Option<String>,
    Option<String>,
    String,
    i64,
    i64,
    String,
    String,
);

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn raw_to_record(raw: RawRow) -> Result<ReplayTimelineRecord> {
    let (
        slot,
        signature,
        source_event_type,
        seq,
        event_type,
        task_pda,
        dispute_pda,
        source_event_name,
        source_event_sequence,
        timestamp_ms,
        payload,
        projection_hash,
    ) = raw;

    let event_type = event_type
        .parse()
        .map_err(|e: String| Error::Corrupt(format!("event_type: {}", e)))?;
    let payload = canonical_parse(&payload)
        .map_err(|e| Error::Corrupt(format!("payload for {}: {}", signature, e)))?;

    Ok(ReplayTimelineRecord {
        source_event_type,
        event: chainreplay_types::ProjectedTimelineEvent {
            seq: seq as u64,
            event_type,
            task_pda,
            dispute_pda,
            slot: slot as u64,
            signature,
            source_event_name,
            source_event_sequence: source_event_sequence as u64,
            timestamp_ms,
            payload,
            projection_hash,
        },
    })
}
