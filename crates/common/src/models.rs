//! Sighting records and their field types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Fixed-width ISO-8601 format used for timestamps and id prefixes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const ID_SUFFIX_LEN: usize = 9;
const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z-[0-9a-z]{9}$")
        .expect("static id pattern")
});

/// A single user-reported fungi observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    /// Server-generated identifier, `<timestamp>-<suffix>`
    pub id: String,

    /// Owner of the sighting; absent for guest submissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub is_guest_submission: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<String>,

    /// Common species name
    #[serde(alias = "speciesName")]
    pub name: String,

    pub scientific_name: String,

    pub location: Location,

    pub description: String,

    pub category: Category,

    /// Reference to the uploaded photo; never checked for reachability
    pub image_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,

    /// Creation time, assigned by the server
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl Sighting {
    /// Who submitted this sighting
    pub fn submitter(&self) -> Submitter {
        match (&self.user_id, self.is_guest_submission) {
            (Some(user_id), false) => Submitter::Authenticated {
                user_id: user_id.clone(),
            },
            _ => Submitter::Guest {
                name: self.guest_name.clone(),
                email: self.guest_email.clone(),
            },
        }
    }
}

/// Identity behind a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitter {
    Authenticated { user_id: String },
    Guest {
        name: Option<String>,
        email: Option<String>,
    },
}

/// Where a sighting was made: free text or a coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Coordinates(Coordinates),
    Place(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::validation(
                "location.latitude",
                "latitude must be between -90 and 90",
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::validation(
                "location.longitude",
                "longitude must be between -180 and 180",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Degrees Celsius
    pub temperature: f64,
    pub conditions: String,
}

impl Weather {
    pub const MAX_CONDITIONS_LEN: usize = 50;

    /// Range-check the reading and return it with trimmed conditions
    pub fn validated(self) -> Result<Self> {
        if !(-50.0..=50.0).contains(&self.temperature) {
            return Err(Error::validation(
                "weather.temperature",
                "temperature must be between -50 and 50",
            ));
        }

        let conditions = self.conditions.trim().to_string();
        if conditions.chars().count() > Self::MAX_CONDITIONS_LEN {
            return Err(Error::validation(
                "weather.conditions",
                "weather conditions must be 50 characters or less",
            ));
        }

        Ok(Self {
            temperature: self.temperature,
            conditions,
        })
    }
}

/// Sighting category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Edible,
    Medicinal,
    Poisonous,
    Rare,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Edible,
        Category::Medicinal,
        Category::Poisonous,
        Category::Rare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Edible => "edible",
            Category::Medicinal => "medicinal",
            Category::Poisonous => "poisonous",
            Category::Rare => "rare",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::validation("category", "invalid category"))
    }
}

/// Generate a sighting id for a record created at `timestamp`
pub fn generate_id<R: Rng + ?Sized>(timestamp: &DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("{}-{}", format_timestamp(timestamp), suffix)
}

/// Whether `id` has the shape produced by [`generate_id`]
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
        && DateTime::parse_from_rfc3339(&id[..id.len() - ID_SUFFIX_LEN - 1]).is_ok()
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for millisecond-precision UTC timestamps
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(timestamp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
