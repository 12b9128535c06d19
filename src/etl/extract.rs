// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Postgres change extraction.
//!
//! One query per entity type finds rows whose own `updated_at`, or a joined
//! dependent's, exceeds the checkpoint. Films are considered changed when a
//! linked person or genre changes, so a person rename reindexes every film
//! they appear in.
//!
//! Ids are selected `DISTINCT` and ordered by id so LIMIT/OFFSET paging is
//! stable within a pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::{ChangeExtractor, SyncError};
use crate::entity::EntityKind;
use crate::resilience::{retry, RetryConfig};

const CHANGED_FILMS: &str = r#"
    SELECT fm.id::text AS id
    FROM content.film_work AS fm
    LEFT OUTER JOIN content.person_film_work AS pfm ON fm.id = pfm.film_work_id
    LEFT OUTER JOIN content.person AS p ON pfm.person_id = p.id
    LEFT OUTER JOIN content.genre_film_work AS gfm ON fm.id = gfm.film_work_id
    LEFT OUTER JOIN content.genre AS g ON gfm.genre_id = g.id
    WHERE fm.updated_at > $1 OR p.updated_at > $1 OR g.updated_at > $1
    GROUP BY fm.id
    ORDER BY fm.id
    LIMIT $2 OFFSET $3
"#;

const CHANGED_GENRES: &str = r#"
    SELECT DISTINCT id::text AS id
    FROM content.genre
    WHERE updated_at > $1
    ORDER BY id
    LIMIT $2 OFFSET $3
"#;

const CHANGED_PERSONS: &str = r#"
    SELECT DISTINCT id::text AS id
    FROM content.person
    WHERE updated_at > $1
    ORDER BY id
    LIMIT $2 OFFSET $3
"#;

/// Relational source for both change extraction and document building.
pub struct PgChangeSource {
    pool: PgPool,
}

impl PgChangeSource {
    /// Connect a pool with startup-mode retry (fails fast if config is
    /// wrong).
    pub async fn connect(connection_string: &str) -> Result<Self, SyncError> {
        let pool = retry("postgres_connect", &RetryConfig::startup(), || async {
            PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(connection_string)
                .await
        })
        .await?;

        Ok(Self { pool })
    }

    /// Reuse an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ChangeExtractor for PgChangeSource {
    async fn changed_ids(
        &self,
        entity: EntityKind,
        since: DateTime<Utc>,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<String>, SyncError> {
        let query = match entity {
            EntityKind::Films => CHANGED_FILMS,
            EntityKind::Genres => CHANGED_GENRES,
            EntityKind::Persons => CHANGED_PERSONS,
        };

        let rows = retry("pg_changed_ids", &RetryConfig::pass(), || {
            let pool = self.pool.clone();
            async move {
                sqlx::query(query)
                    .bind(since)
                    .bind(limit as i64)
                    .bind(offset as i64)
                    .fetch_all(&pool)
                    .await
            }
        })
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(SyncError::from))
            .collect()
    }
}
