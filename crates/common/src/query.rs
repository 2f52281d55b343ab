//! Sighting list queries: parameter validation and access path selection

use serde::Deserialize;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::cursor::{PageCursor, PageKey};
use crate::models::Category;
use crate::{Error, Result};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw query string of a list request
///
/// Everything is kept as text so that bad values surface as field errors
/// instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSightingsParams {
    pub user_id: Option<String>,
    pub category: Option<String>,
    pub species_name: Option<String>,
    pub limit: Option<String>,
    pub last_evaluated_key: Option<String>,
}

/// Secondary filter attribute a deployment indexes on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDimension {
    Category,
    SpeciesName,
}

impl FilterDimension {
    /// Query parameter carrying the filter value
    pub fn param_name(&self) -> &'static str {
        match self {
            FilterDimension::Category => "category",
            FilterDimension::SpeciesName => "speciesName",
        }
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param_name())
    }
}

impl FromStr for FilterDimension {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "category" => Ok(FilterDimension::Category),
            "speciesName" | "species_name" => Ok(FilterDimension::SpeciesName),
            other => anyhow::bail!(
                "unknown filter dimension '{}' (expected 'category' or 'speciesName')",
                other
            ),
        }
    }
}

/// Value looked up on the secondary filter index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexFilter {
    Category(Category),
    SpeciesName(String),
}

/// How a list request reaches the data. Resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    /// User index, newest first
    ByUser(String),
    /// Category or species index, newest first
    ByFilter(IndexFilter),
    /// Whole table, no ordering guarantee
    Scan,
}

impl AccessPath {
    pub fn is_ordered(&self) -> bool {
        !matches!(self, AccessPath::Scan)
    }
}

/// A validated list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightingQuery {
    pub path: AccessPath,
    pub limit: u32,
    pub start_after: Option<PageKey>,
}

impl SightingQuery {
    /// Validate every supplied parameter and choose the access path
    ///
    /// Priority is user > filter dimension > scan. Only the configured
    /// filter dimension is accepted; naming the other one is an error.
    pub fn from_params(params: &ListSightingsParams, dimension: FilterDimension) -> Result<Self> {
        let limit = parse_limit(params.limit.as_deref())?;

        let user_id = params
            .user_id
            .as_deref()
            .map(|raw| non_empty("userId", raw))
            .transpose()?;

        let filter = match dimension {
            FilterDimension::Category => {
                reject_unsupported(FilterDimension::SpeciesName, &params.species_name)?;
                params
                    .category
                    .as_deref()
                    .map(|raw| {
                        non_empty("category", raw)?
                            .parse::<Category>()
                            .map(IndexFilter::Category)
                    })
                    .transpose()?
            }
            FilterDimension::SpeciesName => {
                reject_unsupported(FilterDimension::Category, &params.category)?;
                params
                    .species_name
                    .as_deref()
                    .map(|raw| non_empty("speciesName", raw).map(IndexFilter::SpeciesName))
                    .transpose()?
            }
        };

        let path = match (user_id, filter) {
            (Some(user_id), _) => AccessPath::ByUser(user_id),
            (None, Some(filter)) => AccessPath::ByFilter(filter),
            (None, None) => AccessPath::Scan,
        };

        let start_after = match params.last_evaluated_key.as_deref() {
            Some(token) => {
                let key = PageCursor::decode(token)?;
                if !key.matches(&path) {
                    return Err(Error::InvalidCursor);
                }
                Some(key)
            }
            None => None,
        };

        Ok(Self {
            path,
            limit,
            start_after,
        })
    }
}

fn parse_limit(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_LIMIT);
    };

    let out_of_range = || Error::validation("limit", "limit must be between 1 and 100");

    let limit: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
        match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(),
            _ => Error::validation("limit", "limit must be an integer"),
        }
    })?;

    if limit < 1 || limit > MAX_LIMIT as i64 {
        return Err(out_of_range());
    }

    Ok(limit as u32)
}

fn non_empty(field: &'static str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn reject_unsupported(dimension: FilterDimension, value: &Option<String>) -> Result<()> {
    if value.is_some() {
        return Err(Error::validation(
            dimension.param_name(),
            format!("filtering by {} is not supported", dimension),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "2024-05-01T09:30:00.000Z-abc123xyz";

    fn params() -> ListSightingsParams {
        ListSightingsParams::default()
    }

    #[test]
    fn test_defaults_to_scan_with_limit_10() {
        let query = SightingQuery::from_params(&params(), FilterDimension::Category).unwrap();

        assert_eq!(query.path, AccessPath::Scan);
        assert_eq!(query.limit, 10);
        assert!(query.start_after.is_none());
        assert!(!query.path.is_ordered());
    }

    #[test]
    fn test_limit_bounds() {
        for bad in [
            "0",
            "101",
            "-5",
            "1000000000000",
            "99999999999999999999",
            "-99999999999999999999",
        ] {
            let p = ListSightingsParams {
                limit: Some(bad.to_string()),
                ..params()
            };
            let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
            assert_eq!(err.field(), Some("limit"), "limit {}", bad);
            assert_eq!(err.to_string(), "limit must be between 1 and 100");
        }

        for good in ["1", "100", " 25 "] {
            let p = ListSightingsParams {
                limit: Some(good.to_string()),
                ..params()
            };
            assert!(SightingQuery::from_params(&p, FilterDimension::Category).is_ok());
        }

        let p = ListSightingsParams {
            limit: Some("ten".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert_eq!(err.field(), Some("limit"));
    }

    #[test]
    fn test_blank_filters_are_rejected() {
        let p = ListSightingsParams {
            user_id: Some("   ".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert_eq!(err.field(), Some("userId"));
        assert_eq!(err.to_string(), "userId must not be empty");

        let p = ListSightingsParams {
            species_name: Some("\t".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::SpeciesName).unwrap_err();
        assert_eq!(err.field(), Some("speciesName"));

        let p = ListSightingsParams {
            category: Some("".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert_eq!(err.field(), Some("category"));
    }

    #[test]
    fn test_category_must_be_known() {
        for bad in ["deadly", "EDIBLE", "edible,rare"] {
            let p = ListSightingsParams {
                category: Some(bad.to_string()),
                ..params()
            };
            let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
            assert_eq!(err.to_string(), "invalid category");
        }
    }

    #[test]
    fn test_path_priority() {
        let p = ListSightingsParams {
            user_id: Some(" user-1 ".to_string()),
            category: Some("rare".to_string()),
            ..params()
        };
        let query = SightingQuery::from_params(&p, FilterDimension::Category).unwrap();
        assert_eq!(query.path, AccessPath::ByUser("user-1".to_string()));

        let p = ListSightingsParams {
            category: Some("rare".to_string()),
            ..params()
        };
        let query = SightingQuery::from_params(&p, FilterDimension::Category).unwrap();
        assert_eq!(
            query.path,
            AccessPath::ByFilter(IndexFilter::Category(Category::Rare))
        );

        let p = ListSightingsParams {
            species_name: Some("Morchella esculenta".to_string()),
            ..params()
        };
        let query = SightingQuery::from_params(&p, FilterDimension::SpeciesName).unwrap();
        assert_eq!(
            query.path,
            AccessPath::ByFilter(IndexFilter::SpeciesName("Morchella esculenta".to_string()))
        );
    }

    #[test]
    fn test_lower_priority_filters_are_still_validated() {
        let p = ListSightingsParams {
            user_id: Some("user-1".to_string()),
            category: Some("deadly".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert_eq!(err.field(), Some("category"));
    }

    #[test]
    fn test_unconfigured_dimension_is_rejected() {
        let p = ListSightingsParams {
            species_name: Some("Morchella".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert_eq!(err.field(), Some("speciesName"));

        let p = ListSightingsParams {
            category: Some("rare".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::SpeciesName).unwrap_err();
        assert_eq!(err.field(), Some("category"));
    }

    #[test]
    fn test_cursor_is_decoded_and_checked_against_path() {
        let user_path = AccessPath::ByUser("user-1".to_string());
        let token = PageCursor::encode(&PageKey::new(&user_path, ID))
            .unwrap()
            .into_string();

        let p = ListSightingsParams {
            user_id: Some("user-1".to_string()),
            last_evaluated_key: Some(token.clone()),
            ..params()
        };
        let query = SightingQuery::from_params(&p, FilterDimension::Category).unwrap();
        assert_eq!(query.start_after.unwrap().id, ID);

        // Same cursor replayed against a different user
        let p = ListSightingsParams {
            user_id: Some("user-2".to_string()),
            last_evaluated_key: Some(token),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert!(matches!(err, Error::InvalidCursor));

        let p = ListSightingsParams {
            last_evaluated_key: Some("%%%".to_string()),
            ..params()
        };
        let err = SightingQuery::from_params(&p, FilterDimension::Category).unwrap_err();
        assert_eq!(err.field(), Some("lastEvaluatedKey"));
    }

    #[test]
    fn test_filter_dimension_from_str() {
        assert_eq!(
            "category".parse::<FilterDimension>().unwrap(),
            FilterDimension::Category
        );
        assert_eq!(
            "speciesName".parse::<FilterDimension>().unwrap(),
            FilterDimension::SpeciesName
        );
        assert!("colour".parse::<FilterDimension>().is_err());
    }
}
