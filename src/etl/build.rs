// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document denormalization.
//!
//! One join query per entity type, restricted to a page of ids. Many-to-many
//! relations are collapsed with `DISTINCT` aggregation and coalesced to
//! empty arrays, so a film with no recorded cast still carries `actors: []`
//! rather than null.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;

use super::extract::PgChangeSource;
use super::{DocumentBuilder, SyncError};
use crate::entity::{Document, EntityKind, FilmDocument, GenreDocument, PersonDocument};
use crate::resilience::{retry, RetryConfig};

const BUILD_FILMS: &str = r#"
    SELECT
        fm.id::text AS id,
        fm.title,
        fm.description,
        COALESCE(fm.rating, 0)::double precision AS imdb_rating,
        COALESCE(ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL), '{}') AS genre,
        COALESCE(ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfm.role = 'director'), '{}') AS director,
        COALESCE(ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfm.role = 'actor'), '{}') AS actors_names,
        COALESCE(ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfm.role = 'writer'), '{}') AS writers_names,
        COALESCE(JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
                 FILTER (WHERE pfm.role = 'actor'), '[]') AS actors,
        COALESCE(JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
                 FILTER (WHERE pfm.role = 'writer'), '[]') AS writers
    FROM content.film_work AS fm
    LEFT OUTER JOIN content.person_film_work AS pfm ON fm.id = pfm.film_work_id
    LEFT OUTER JOIN content.person AS p ON pfm.person_id = p.id
    LEFT OUTER JOIN content.genre_film_work AS gfm ON fm.id = gfm.film_work_id
    LEFT OUTER JOIN content.genre AS g ON gfm.genre_id = g.id
    WHERE fm.id::text = ANY($1)
    GROUP BY fm.id
"#;

const BUILD_GENRES: &str = r#"
    SELECT id::text AS id, name, description
    FROM content.genre
    WHERE id::text = ANY($1)
"#;

const BUILD_PERSONS: &str = r#"
    SELECT id::text AS id, full_name
    FROM content.person
    WHERE id::text = ANY($1)
"#;

#[async_trait]
impl DocumentBuilder for PgChangeSource {
    async fn build(&self, entity: EntityKind, ids: &[String]) -> Result<Vec<Document>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = match entity {
            EntityKind::Films => BUILD_FILMS,
            EntityKind::Genres => BUILD_GENRES,
            EntityKind::Persons => BUILD_PERSONS,
        };

        let rows = retry("pg_build_documents", &RetryConfig::pass(), || {
            let pool = self.pool().clone();
            let ids = ids.to_vec();
            async move {
                sqlx::query(query).bind(&ids).fetch_all(&pool).await
            }
        })
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let body = match entity {
                    EntityKind::Films => {
                        let film = FilmDocument {
                            id: id.clone(),
                            title: row.try_get("title")?,
                            description: row.try_get("description")?,
                            imdb_rating: row.try_get("imdb_rating")?,
                            genre: row.try_get("genre")?,
                            director: row.try_get("director")?,
                            actors_names: row.try_get("actors_names")?,
                            writers_names: row.try_get("writers_names")?,
                            actors: serde_json::from_value(row.try_get::<Value, _>("actors")?)?,
                            writers: serde_json::from_value(row.try_get::<Value, _>("writers")?)?,
                        };
                        serde_json::to_value(&film)?
                    }
                    EntityKind::Genres => serde_json::to_value(GenreDocument {
                        id: id.clone(),
                        name: row.try_get("name")?,
                        description: row.try_get("description")?,
                    })?,
                    EntityKind::Persons => serde_json::to_value(PersonDocument {
                        id: id.clone(),
                        full_name: row.try_get("full_name")?,
                    })?,
                };
                Ok(Document::new(id, body))
            })
            .collect()
    }
}
