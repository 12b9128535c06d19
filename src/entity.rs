// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Entity types and their denormalized search documents.
//!
//! Each [`EntityKind`] maps a relational entity onto one search index. The
//! document structs are the exact wire shape written by the bulk loader and
//! read back by the API; field sets are fixed and nested lists are always
//! present (empty, never null).

use serde::{Deserialize, Serialize};

/// The entity types kept in sync, in the fixed order the orchestrator
/// processes them each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Films,
    Genres,
    Persons,
}

impl EntityKind {
    /// Fixed processing order for a sync pass.
    pub const ALL: [EntityKind; 3] = [EntityKind::Films, EntityKind::Genres, EntityKind::Persons];

    /// Name of the search index backing this entity.
    #[must_use]
    pub fn index_name(&self) -> &'static str {
        match self {
            EntityKind::Films => "movies",
            EntityKind::Genres => "genres",
            EntityKind::Persons => "persons",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.index_name())
    }
}

/// A person referenced from a film, as stored in the nested
/// `actors` / `writers` arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
}

/// Denormalized film document.
///
/// Aggregated from `film_work` and its many-to-many person/genre relations.
/// Missing relations deserialize to empty vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmDocument {
    pub id: String,
    #[serde(default)]
    pub imdb_rating: f64,
    #[serde(default)]
    pub genre: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub actors_names: Vec<String>,
    #[serde(default)]
    pub writers_names: Vec<String>,
    #[serde(default)]
    pub actors: Vec<PersonRef>,
    #[serde(default)]
    pub writers: Vec<PersonRef>,
}

/// Denormalized genre document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Denormalized person document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: String,
    pub full_name: String,
}

/// A document ready for indexing, paired with its stable identifier.
///
/// The builder owns documents until they are handed to the writer; after a
/// successful bulk upsert the search index is the sole durable owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self { id: id.into(), body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_names() {
        assert_eq!(EntityKind::Films.index_name(), "movies");
        assert_eq!(EntityKind::Genres.index_name(), "genres");
        assert_eq!(EntityKind::Persons.index_name(), "persons");
    }

    #[test]
    fn test_processing_order_is_fixed() {
        assert_eq!(
            EntityKind::ALL,
            [EntityKind::Films, EntityKind::Genres, EntityKind::Persons]
        );
    }

    #[test]
    fn test_film_missing_relations_deserialize_empty() {
        // A film with no recorded genres or cast must come back with empty
        // lists, never null.
        let film: FilmDocument = serde_json::from_value(json!({
            "id": "f-1",
            "title": "Silent",
            "imdb_rating": 6.1
        }))
        .unwrap();

        assert!(film.genre.is_empty());
        assert!(film.actors.is_empty());
        assert!(film.writers.is_empty());
        assert!(film.director.is_empty());
        assert!(film.description.is_none());
    }

    #[test]
    fn test_film_round_trips_full_field_set() {
        let film = FilmDocument {
            id: "f-2".into(),
            imdb_rating: 8.4,
            genre: vec!["Action".into(), "Drama".into()],
            title: "The Long Run".into(),
            description: Some("A film.".into()),
            director: vec!["P. Jones".into()],
            actors_names: vec!["A. Smith".into()],
            writers_names: vec!["W. Brown".into()],
            actors: vec![PersonRef { id: "p-1".into(), name: "A. Smith".into() }],
            writers: vec![PersonRef { id: "p-2".into(), name: "W. Brown".into() }],
        };

        let value = serde_json::to_value(&film).unwrap();
        let back: FilmDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, film);
    }
}
