// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Composite cache key derivation.
//!
//! A key is built from a namespace (the index name) and an ordered list of
//! named query dimensions:
//!
//! ```text
//! movies::filter::genre_Action,sort::imdb_rating,
//! ```
//!
//! Identical ordered input always yields an identical key. The function
//! performs no sorting or normalization: dimension order is a caller
//! contract, and producer and consumer call sites must agree on it for a
//! given logical query shape.

const SEPARATOR: &str = "::";

/// Derive the canonical cache key for a namespace and ordered dimensions.
#[must_use]
pub fn derive_key(namespace: &str, dimensions: &[(&str, &str)]) -> String {
    let mut key = String::with_capacity(namespace.len() + SEPARATOR.len() + dimensions.len() * 16);
    key.push_str(namespace);
    key.push_str(SEPARATOR);
    for (name, value) in dimensions {
        key.push_str(name);
        key.push_str(SEPARATOR);
        key.push_str(value);
        key.push(',');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_shape() {
        let key = derive_key(
            "movies",
            &[("filter", "genre_Action"), ("sort", "imdb_rating")],
        );
        assert_eq!(key, "movies::filter::genre_Action,sort::imdb_rating,");
    }

    #[test]
    fn test_deterministic() {
        let dims = [("filter", "genre_Action"), ("sort", "imdb_rating")];
        assert_eq!(derive_key("movies", &dims), derive_key("movies", &dims));
    }

    #[test]
    fn test_value_change_changes_key() {
        let a = derive_key("movies", &[("filter", "genre_Action"), ("sort", "imdb_rating")]);
        let b = derive_key("movies", &[("filter", "genre_Drama"), ("sort", "imdb_rating")]);
        let c = derive_key("movies", &[("filter", "genre_Action"), ("sort", "title")]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_order_sensitive() {
        // Order is deliberately not normalized
        let a = derive_key("movies", &[("filter", "x"), ("sort", "y")]);
        let b = derive_key("movies", &[("sort", "y"), ("filter", "x")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_namespace_isolates_keys() {
        let dims = [("query", "star")];
        assert_ne!(derive_key("movies", &dims), derive_key("persons", &dims));
    }

    #[test]
    fn test_empty_dimensions() {
        assert_eq!(derive_key("movies", &[]), "movies::");
    }

    proptest! {
        #[test]
        fn prop_identical_input_identical_key(
            ns in "[a-z]{1,12}",
            dims in proptest::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9_]{0,16}"), 0..5),
        ) {
            let borrowed: Vec<(&str, &str)> =
                dims.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
            prop_assert_eq!(derive_key(&ns, &borrowed), derive_key(&ns, &borrowed));
        }

        #[test]
        fn prop_key_starts_with_namespace(
            ns in "[a-z]{1,12}",
            dims in proptest::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9_]{0,16}"), 0..5),
        ) {
            let borrowed: Vec<(&str, &str)> =
                dims.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
            let prefix = format!("{}::", ns);
            prop_assert!(derive_key(&ns, &borrowed).starts_with(&prefix));
        }
    }
}
