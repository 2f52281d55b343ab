//! Validation of incoming sighting submissions

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{Category, Coordinates, Location, Sighting, Submitter, Weather};
use crate::{Error, Result};

pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_GUEST_NAME_LEN: usize = 100;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

/// Sighting payload as posted by a client
///
/// Required fields are optional here so that a missing field is reported
/// by name rather than as a generic body error. `location`, `weather` and
/// `category` are kept as raw JSON for the same reason: a wrongly shaped
/// value is a field error, not a body error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SightingSubmission {
    pub user_id: Option<String>,
    pub is_guest_submission: Option<bool>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    #[serde(alias = "speciesName")]
    pub name: Option<String>,
    pub scientific_name: Option<String>,
    pub location: Option<Value>,
    pub description: Option<String>,
    pub category: Option<Value>,
    pub image_url: Option<String>,
    pub weather: Option<Value>,
}

/// A submission that passed validation, awaiting identity and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewSighting {
    pub submitter: Submitter,
    pub name: String,
    pub scientific_name: String,
    pub location: Location,
    pub description: String,
    pub category: Category,
    pub image_url: String,
    pub weather: Option<Weather>,
}

impl SightingSubmission {
    /// Check the payload field by field, stopping at the first failure
    pub fn validate(self) -> Result<NewSighting> {
        let name = required("name", self.name.as_deref())?;
        let scientific_name = required("scientificName", self.scientific_name.as_deref())?;
        let location = present("location", self.location)?;
        if let Value::String(place) = &location {
            required("location", Some(place.as_str()))?;
        }
        let description_raw = self.description.unwrap_or_default();
        let description = required("description", Some(description_raw.as_str()))?;
        let category = match present("category", self.category)? {
            Value::String(raw) => required("category", Some(raw.as_str()))?,
            // Not a string, so it can only fail the enum check below
            other => other.to_string(),
        };
        let image_url = required("imageUrl", self.image_url.as_deref())?;

        if description_raw.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::validation(
                "description",
                "description must be 1000 characters or less",
            ));
        }

        let location = parse_location(location)?;

        let weather = match self.weather {
            None | Some(Value::Null) => None,
            Some(raw) => Some(parse_weather(raw)?.validated()?),
        };
        let category: Category = category.parse()?;

        let submitter = match (self.is_guest_submission.unwrap_or(false), self.user_id) {
            (false, Some(user_id)) => {
                let user_id = user_id.trim();
                if user_id.is_empty() {
                    return Err(Error::validation("userId", "userId must not be empty"));
                }
                Submitter::Authenticated {
                    user_id: user_id.to_string(),
                }
            }
            _ => guest(self.guest_name, self.guest_email)?,
        };

        Ok(NewSighting {
            submitter,
            name,
            scientific_name,
            location,
            description,
            category,
            image_url,
            weather,
        })
    }
}

impl NewSighting {
    /// Stamp the server-assigned identity and creation time
    pub fn into_sighting(self, id: String, timestamp: DateTime<Utc>) -> Sighting {
        let (user_id, is_guest_submission, guest_name, guest_email) = match self.submitter {
            Submitter::Authenticated { user_id } => (Some(user_id), false, None, None),
            Submitter::Guest { name, email } => (None, true, name, email),
        };

        Sighting {
            id,
            user_id,
            is_guest_submission,
            guest_name,
            guest_email,
            name: self.name,
            scientific_name: self.scientific_name,
            location: self.location,
            description: self.description,
            category: self.category,
            image_url: self.image_url,
            weather: self.weather,
            timestamp,
        }
    }
}

fn guest(name: Option<String>, email: Option<String>) -> Result<Submitter> {
    let email = trimmed_opt(email);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(Error::validation("guestEmail", "invalid guest email format"));
        }
    }

    let name = trimmed_opt(name);
    if let Some(name) = &name {
        if name.chars().count() > MAX_GUEST_NAME_LEN {
            return Err(Error::validation(
                "guestName",
                "guest name must be 100 characters or less",
            ));
        }
    }

    Ok(Submitter::Guest { name, email })
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn required(field: &'static str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(missing(field)),
    }
}

/// Treats an explicit `null` like an absent field
fn present(field: &'static str, value: Option<Value>) -> Result<Value> {
    match value {
        None | Some(Value::Null) => Err(missing(field)),
        Some(value) => Ok(value),
    }
}

fn parse_location(raw: Value) -> Result<Location> {
    match raw {
        Value::String(place) => Ok(Location::Place(place.trim().to_string())),
        Value::Object(fields) => {
            let coordinates = Coordinates {
                latitude: number(&fields, "latitude", "location.latitude")?,
                longitude: number(&fields, "longitude", "location.longitude")?,
            };
            coordinates.validate()?;
            Ok(Location::Coordinates(coordinates))
        }
        _ => Err(Error::validation(
            "location",
            "location must be a place name or latitude/longitude",
        )),
    }
}

fn parse_weather(raw: Value) -> Result<Weather> {
    let Value::Object(fields) = raw else {
        return Err(Error::validation("weather", "weather must be an object"));
    };

    let temperature = number(&fields, "temperature", "weather.temperature")?;
    let conditions = match fields.get("conditions") {
        Some(Value::String(conditions)) => conditions.clone(),
        None | Some(Value::Null) => {
            return Err(Error::validation(
                "weather.conditions",
                "conditions is required",
            ))
        }
        Some(_) => {
            return Err(Error::validation(
                "weather.conditions",
                "conditions must be a string",
            ))
        }
    };

    Ok(Weather {
        temperature,
        conditions,
    })
}

fn number(fields: &Map<String, Value>, name: &str, field: &'static str) -> Result<f64> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(Error::validation(field, format!("{} is required", name))),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| Error::validation(field, format!("{} must be a number", name))),
    }
}

fn missing(field: &'static str) -> Error {
    Error::validation(field, format!("{} is required", field))
}

fn trimmed_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
