//! Opaque pagination cursors
//!
//! The store hands back a [`PageKey`] naming the last item of a page. Clients
//! only ever see it as a [`PageCursor`]: URL-safe base64 over the key's JSON.
//! Decoding is strict, so a token that was not produced by [`PageCursor::encode`]
//! (or was produced for a different access path) is rejected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::models::is_valid_id;
use crate::query::{AccessPath, IndexFilter};
use crate::{Error, Result};

/// Storage-level continuation marker
///
/// Mirrors the key schema of the index the page was read from: the table key
/// (`id`) plus the partition attribute of the index, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageKey {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_name: Option<String>,
}

impl PageKey {
    /// Key for resuming `path` after the item `id`
    pub fn new(path: &AccessPath, id: impl Into<String>) -> Self {
        let mut key = PageKey {
            id: id.into(),
            user_id: None,
            category: None,
            species_name: None,
        };

        match path {
            AccessPath::ByUser(user_id) => key.user_id = Some(user_id.clone()),
            AccessPath::ByFilter(IndexFilter::Category(category)) => {
                key.category = Some(category.as_str().to_string())
            }
            // Species lookups ignore case, and so does the key
            AccessPath::ByFilter(IndexFilter::SpeciesName(name)) => {
                key.species_name = Some(name.to_lowercase())
            }
            AccessPath::Scan => {}
        }

        key
    }

    /// Whether this key can resume a read over `path`
    pub fn matches(&self, path: &AccessPath) -> bool {
        is_valid_id(&self.id) && *self == PageKey::new(path, self.id.clone())
    }
}

/// Client-facing pagination token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn encode(key: &PageKey) -> Result<Self> {
        let json = serde_json::to_vec(key)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json)))
    }

    pub fn decode(token: &str) -> Result<PageKey> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| Error::InvalidCursor)?;

        let key: PageKey = serde_json::from_slice(&bytes).map_err(|_| Error::InvalidCursor)?;

        if !is_valid_id(&key.id) {
            return Err(Error::InvalidCursor);
        }

        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    const ID: &str = "2024-05-01T09:30:00.000Z-abc123xyz";

    #[test]
    fn test_cursor_roundtrip() {
        let path = AccessPath::ByUser("user-1".to_string());
        let key = PageKey::new(&path, ID);

        let cursor = PageCursor::encode(&key).unwrap();
        let decoded = PageCursor::decode(cursor.as_str()).unwrap();

        assert_eq!(decoded, key);
        assert!(decoded.matches(&path));
    }

    #[test]
    fn test_cursor_is_query_string_safe() {
        let key = PageKey::new(&AccessPath::ByFilter(IndexFilter::SpeciesName(
            "Amanita muscaria?&=+/".to_string(),
        )), ID);

        let cursor = PageCursor::encode(&key).unwrap();
        assert!(cursor
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            PageCursor::decode("not base64!!"),
            Err(Error::InvalidCursor)
        ));

        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(matches!(
            PageCursor::decode(&not_json),
            Err(Error::InvalidCursor)
        ));
    }

    #[test]
    fn test_rejects_foreign_key_schema() {
        let foreign = URL_SAFE_NO_PAD.encode(format!(r#"{{"id":"{}","pk":"x"}}"#, ID));
        assert!(matches!(
            PageCursor::decode(&foreign),
            Err(Error::InvalidCursor)
        ));

        let bad_id = URL_SAFE_NO_PAD.encode(r#"{"id":"+"}"#);
        assert!(matches!(
            PageCursor::decode(&bad_id),
            Err(Error::InvalidCursor)
        ));
    }

    #[test]
    fn test_species_key_ignores_case() {
        let species = |name: &str| AccessPath::ByFilter(IndexFilter::SpeciesName(name.to_string()));
        let key = PageKey::new(&species("Pleurotus Ostreatus"), ID);

        assert_eq!(key.species_name.as_deref(), Some("pleurotus ostreatus"));
        assert!(key.matches(&species("pleurotus ostreatus")));
        assert!(key.matches(&species("PLEUROTUS OSTREATUS")));
        assert!(!key.matches(&species("Pleurotus eryngii")));
    }

    #[test]
    fn test_key_must_match_access_path() {
        let by_category = AccessPath::ByFilter(IndexFilter::Category(Category::Rare));
        let key = PageKey::new(&by_category, ID);

        assert!(key.matches(&by_category));
        assert!(!key.matches(&AccessPath::Scan));
        assert!(!key.matches(&AccessPath::ByFilter(IndexFilter::Category(
            Category::Edible
        ))));
        assert!(!key.matches(&AccessPath::ByUser("user-1".to_string())));
    }
}
