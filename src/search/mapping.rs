//! Fixed index settings and mappings, one per entity type.
//!
//! The analyzer chain (lowercase, Russian stop words and stemming, `ё`/`э`
//! folding) is part of the index contract: documents are analyzed the same
//! way no matter which process created the index.

use serde_json::{json, Value};

use crate::entity::EntityKind;

fn analysis_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "russian_stop": {
                    "type": "stop",
                    "stopwords": "_russian_"
                },
                "russian_stemmer": {
                    "type": "stemmer",
                    "language": "russian"
                }
            },
            "char_filter": {
                "e_char_filter": {
                    "type": "mapping",
                    "mappings": ["Ё => Е", "ё => е", "Э => Е", "э => е"]
                }
            },
            "analyzer": {
                "ru": {
                    "tokenizer": "standard",
                    "filter": ["lowercase", "russian_stop", "russian_stemmer"],
                    "char_filter": ["e_char_filter"]
                }
            }
        }
    })
}

/// Full creation body (settings + mappings) for an entity's index.
#[must_use]
pub fn index_body(entity: EntityKind) -> Value {
    let properties = match entity {
        EntityKind::Films => json!({
            "id": {"type": "keyword"},
            "imdb_rating": {"type": "float"},
            "genre": {"type": "keyword"},
            "title": {
                "type": "text",
                "analyzer": "ru",
                "fields": {"raw": {"type": "keyword"}}
            },
            "description": {"type": "text", "analyzer": "ru"},
            "director": {"type": "text", "analyzer": "ru"},
            "actors_names": {"type": "text", "analyzer": "ru"},
            "writers_names": {"type": "text", "analyzer": "ru"},
            "actors": {
                "type": "nested",
                "dynamic": "strict",
                "properties": {
                    "id": {"type": "keyword"},
                    "name": {"type": "text", "analyzer": "ru"}
                }
            },
            "writers": {
                "type": "nested",
                "dynamic": "strict",
                "properties": {
                    "id": {"type": "keyword"},
                    "name": {"type": "text", "analyzer": "ru"}
                }
            }
        }),
        EntityKind::Genres => json!({
            "id": {"type": "keyword"},
            "name": {
                "type": "text",
                "analyzer": "ru",
                "fields": {"raw": {"type": "keyword"}}
            },
            "description": {"type": "text", "analyzer": "ru"}
        }),
        EntityKind::Persons => json!({
            "id": {"type": "keyword"},
            "full_name": {"type": "text", "analyzer": "ru"}
        }),
    };

    json!({
        "settings": analysis_settings(),
        "mappings": {"properties": properties}
    })
}
