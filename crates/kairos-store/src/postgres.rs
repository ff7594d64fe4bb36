//! PostgreSQL document-database backend: one JSONB column per
//! document, mirroring the Mongo-flavored `standingsState` /
//! `baseSnapshots` / `deltaSnapshots` collections from the design as
//! three tables. Each table's natural key is enforced with a SQL
//! `PRIMARY KEY` and upserts go through `ON CONFLICT ... DO UPDATE`,
//! which gives the single-document atomicity the storage contract asks
//! for without any extra locking — Postgres already serializes
//! concurrent writers to the same row.
//!
//! Plain `sqlx::query`/`query_as` (not the `query!` macro) are used
//! throughout so this module compiles without a live database to check
//! query shapes against at build time.

use async_trait::async_trait;
use kairos_common::error::{EngineError, Result};
use kairos_common::types::{BaseSnapshot, DeltaSnapshot, ParticipantState};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::{BulkWriteSummary, Store};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| EngineError::storage(format!("failed to connect to postgres: {e}")))?;
        Ok(Self { pool })
    }

    /// Creates the three backing tables if absent. Idempotent; safe to
    /// call on every startup.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS standings_state (
                contest_id BIGINT NOT NULL,
                handle TEXT NOT NULL,
                data JSONB NOT NULL,
                PRIMARY KEY (contest_id, handle)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS base_snapshots (
                contest_id BIGINT NOT NULL,
                timestamp_seconds BIGINT NOT NULL,
                data JSONB NOT NULL,
                PRIMARY KEY (contest_id, timestamp_seconds)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS delta_snapshots (
                contest_id BIGINT NOT NULL,
                timestamp_seconds BIGINT NOT NULL,
                data JSONB NOT NULL,
                PRIMARY KEY (contest_id, timestamp_seconds)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS delta_snapshots_contest_ts_idx \
             ON delta_snapshots (contest_id, timestamp_seconds)",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }
}

fn map_sqlx(e: sqlx::Error) -> EngineError {
    EngineError::storage(e.to_string())
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_participant(
        &self,
        contest_id: i64,
        handle: &str,
    ) -> Result<Option<ParticipantState>> {
        let row = sqlx::query(
            "SELECT data FROM standings_state WHERE contest_id = $1 AND handle = $2",
        )
        .bind(contest_id)
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => {
                let Json(state): Json<ParticipantState> = row.try_get("data").map_err(map_sqlx)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn list_participants(&self, contest_id: i64) -> Result<Vec<ParticipantState>> {
        let rows = sqlx::query("SELECT data FROM standings_state WHERE contest_id = $1")
            .bind(contest_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter()
            .map(|row| {
                let Json(state): Json<ParticipantState> =
                    row.try_get("data").map_err(map_sqlx)?;
                Ok(state)
            })
            .collect()
    }

    async fn upsert_participant(&self, contest_id: i64, state: ParticipantState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO standings_state (contest_id, handle, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (contest_id, handle) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(contest_id)
        .bind(&state.handle)
        .bind(Json(state))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn upsert_participants_bulk(
        &self,
        contest_id: i64,
        states: Vec<ParticipantState>,
    ) -> Result<BulkWriteSummary> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut summary = BulkWriteSummary::default();
        for state in states {
            let result = sqlx::query(
                r#"
                INSERT INTO standings_state (contest_id, handle, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (contest_id, handle) DO UPDATE SET data = EXCLUDED.data
                RETURNING (xmax = 0) AS inserted
                "#,
            )
            .bind(contest_id)
            .bind(&state.handle)
            .bind(Json(state))
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx)?;

            let inserted: bool = result.try_get("inserted").map_err(map_sqlx)?;
            if inserted {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(summary)
    }

    async fn count_participants(&self, contest_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM standings_state WHERE contest_id = $1")
            .bind(contest_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.try_get("n").map_err(map_sqlx)
    }

    async fn find_base_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<BaseSnapshot>> {
        let row = sqlx::query(
            "SELECT data FROM base_snapshots WHERE contest_id = $1 AND timestamp_seconds = $2",
        )
        .bind(contest_id)
        .bind(timestamp_seconds)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => {
                let Json(snap): Json<BaseSnapshot> = row.try_get("data").map_err(map_sqlx)?;
                Ok(Some(snap))
            }
            None => Ok(None),
        }
    }

    async fn latest_base_snapshot_at_or_before(
        &self,
        contest_id: i64,
        t: i64,
    ) -> Result<Option<BaseSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT data FROM base_snapshots
            WHERE contest_id = $1 AND timestamp_seconds <= $2
            ORDER BY timestamp_seconds DESC
            LIMIT 1
            "#,
        )
        .bind(contest_id)
        .bind(t)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => {
                let Json(snap): Json<BaseSnapshot> = row.try_get("data").map_err(map_sqlx)?;
                Ok(Some(snap))
            }
            None => Ok(None),
        }
    }

    async fn insert_base_snapshot(&self, snapshot: BaseSnapshot) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO base_snapshots (contest_id, timestamp_seconds, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (contest_id, timestamp_seconds) DO NOTHING
            "#,
        )
        .bind(snapshot.contest_id)
        .bind(snapshot.timestamp_seconds)
        .bind(Json(&snapshot))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::storage(format!(
                "base snapshot already exists for contest {} at T={}",
                snapshot.contest_id, snapshot.timestamp_seconds
            )));
        }
        Ok(())
    }

    async fn delete_base_snapshot(&self, contest_id: i64, timestamp_seconds: i64) -> Result<()> {
        sqlx::query(
            "DELETE FROM base_snapshots WHERE contest_id = $1 AND timestamp_seconds = $2",
        )
        .bind(contest_id)
        .bind(timestamp_seconds)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_delta_snapshot(
        &self,
        contest_id: i64,
        timestamp_seconds: i64,
    ) -> Result<Option<DeltaSnapshot>> {
        let row = sqlx::query(
            "SELECT data FROM delta_snapshots WHERE contest_id = $1 AND timestamp_seconds = $2",
        )
        .bind(contest_id)
        .bind(timestamp_seconds)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => {
                let Json(snap): Json<DeltaSnapshot> = row.try_get("data").map_err(map_sqlx)?;
                Ok(Some(snap))
            }
            None => Ok(None),
        }
    }

    async fn list_delta_snapshots_in_range(
        &self,
        contest_id: i64,
        after_exclusive: i64,
        to_inclusive: i64,
    ) -> Result<Vec<DeltaSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM delta_snapshots
            WHERE contest_id = $1 AND timestamp_seconds > $2 AND timestamp_seconds <= $3
            ORDER BY timestamp_seconds ASC
            "#,
        )
        .bind(contest_id)
        .bind(after_exclusive)
        .bind(to_inclusive)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter()
            .map(|row| {
                let Json(snap): Json<DeltaSnapshot> = row.try_get("data").map_err(map_sqlx)?;
                Ok(snap)
            })
            .collect()
    }

    async fn insert_delta_snapshot(&self, snapshot: DeltaSnapshot) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO delta_snapshots (contest_id, timestamp_seconds, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (contest_id, timestamp_seconds) DO NOTHING
            "#,
        )
        .bind(snapshot.contest_id)
        .bind(snapshot.timestamp_seconds)
        .bind(Json(&snapshot))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::storage(format!(
                "delta snapshot already exists for contest {} at T={}",
                snapshot.contest_id, snapshot.timestamp_seconds
            )));
        }
        Ok(())
    }
}
