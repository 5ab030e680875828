//! Typed facility record read from the document store.
//!
//! Store documents are loosely shaped: numeric fields sometimes arrive as
//! strings, coordinates may be missing or junk, and admins add arbitrary
//! extra keys. Ingest is lenient and field-by-field so one malformed value
//! never rejects the whole record. Unknown keys survive a round trip through
//! [`Facility::extra`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::geo::GeoPoint;

/// Flag value that marks a certification as held.
pub const AFFIRMATIVE_FLAG: &str = "yes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(rename = "_id", deserialize_with = "object_id")]
    pub id: String,
    #[serde(rename = "Licensee", default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(
        rename = "Street Address",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub street: Option<String>,
    #[serde(
        rename = "City",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    #[serde(
        rename = "county",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub county: Option<String>,
    /// Stored as a number for most records; normalized to its decimal text.
    #[serde(
        rename = "Zip Code",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub zip: Option<String>,
    #[serde(
        rename = "Number of Beds",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub bed_count: Option<i64>,
    #[serde(
        rename = "Medicaid Certified",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub medicaid_certified: Option<String>,
    #[serde(
        rename = "SALS certified",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sals_certified: Option<String>,
    #[serde(
        rename = "Level of Care",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub level_of_care: Option<String>,
    #[serde(
        rename = "Business Phone Number",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        rename = "Name of Contact Person",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact_person: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub lat: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub lng: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Facility {
    /// Minimal record with only an id; every other field absent.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            street: None,
            city: None,
            county: None,
            zip: None,
            bed_count: None,
            medicaid_certified: None,
            sals_certified: None,
            level_of_care: None,
            phone: None,
            contact_person: None,
            lat: None,
            lng: None,
            extra: Map::new(),
        }
    }

    /// Display name, falling back to the id when the licensee is blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }

    /// Valid coordinates, or `None` when either component is missing,
    /// non-finite, or out of range. Never defaults to zero.
    #[must_use]
    pub fn coordinates(&self) -> Option<GeoPoint> {
        GeoPoint::checked(self.lat?, self.lng?)
    }

    #[must_use]
    pub fn is_medicaid_certified(&self) -> bool {
        is_affirmative(self.medicaid_certified.as_deref())
    }

    #[must_use]
    pub fn is_sals_certified(&self) -> bool {
        is_affirmative(self.sals_certified.as_deref())
    }

    /// Geocodable one-line address: `street, city, county, zip`.
    ///
    /// Returns `None` when every address component is blank.
    #[must_use]
    pub fn address_line(&self) -> Option<String> {
        let parts = [&self.street, &self.city, &self.county, &self.zip]
            .map(|p| p.as_deref().map_or("", str::trim));
        if parts.iter().all(|p| p.is_empty()) {
            return None;
        }
        Some(parts.join(", "))
    }
}

fn is_affirmative(flag: Option<&str>) -> bool {
    flag.is_some_and(|f| f.trim().eq_ignore_ascii_case(AFFIRMATIVE_FLAG))
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

fn object_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(D::Error::custom("object id map without a string $oid")),
        },
        other => Err(D::Error::custom(format!("unsupported _id value: {other}"))),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15).then_some(v as i64)
}

#[cfg(test)]
#[path = "facility_test.rs"]
mod tests;
