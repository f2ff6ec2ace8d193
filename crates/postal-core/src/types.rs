//! Core data types for postal lookups.
//!
//! This module defines the fundamental data structures:
//!
//! - [`CountryCode`] - Two-letter country code, always uppercase
//! - [`NormalizedResult`] - Result of one successful provider call
//! - [`Normalized`] - Either extracted fields or the pass-through payload
//! - [`PostalFields`] - Semantic attributes extracted by structured adapters

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// An ISO 3166-1 alpha-2 country code.
///
/// Country codes are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Creates a new country code from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the country code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CountryCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for CountryCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CountryCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Semantic postal attributes extracted from an upstream payload.
///
/// Attributes the upstream did not provide serialize as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostalFields {
    /// Country the lookup was made for.
    pub country: CountryCode,
    /// Postal code as reported upstream, or the requested code.
    pub postal_code: String,
    /// Locality name.
    pub place_name: Option<String>,
    /// First-level administrative region (state, province).
    #[serde(rename = "adminName1")]
    pub admin_name1: Option<String>,
    /// Latitude in decimal degrees.
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    pub lng: Option<f64>,
}

impl PostalFields {
    /// Creates fields with only the country and postal code set.
    #[must_use]
    pub fn new(country: CountryCode, postal_code: impl Into<String>) -> Self {
        Self {
            country,
            postal_code: postal_code.into(),
            place_name: None,
            admin_name1: None,
            lat: None,
            lng: None,
        }
    }

    /// Sets the place name.
    #[must_use]
    pub fn with_place_name(mut self, place_name: impl Into<String>) -> Self {
        self.place_name = Some(place_name.into());
        self
    }

    /// Sets the first-level administrative region.
    #[must_use]
    pub fn with_admin_name1(mut self, admin_name1: impl Into<String>) -> Self {
        self.admin_name1 = Some(admin_name1.into());
        self
    }

    /// Sets the coordinates.
    #[must_use]
    pub const fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }
}

/// Normalized view of an upstream payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Normalized {
    /// The adapter has no bespoke mapping; the upstream payload is passed through.
    PassThrough {
        /// The upstream payload.
        raw: Value,
    },
    /// Fields extracted by a structured adapter.
    Fields(PostalFields),
}

/// The uniform result returned by whichever provider answered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Identifier of the provider that produced the result.
    pub provider: String,
    /// Upstream payload, kept verbatim.
    pub raw: Value,
    /// Normalized view of the payload.
    pub normalized: Normalized,
}

impl NormalizedResult {
    /// Creates a result with structured fields.
    #[must_use]
    pub fn structured(provider: impl Into<String>, raw: Value, fields: PostalFields) -> Self {
        Self {
            provider: provider.into(),
            raw,
            normalized: Normalized::Fields(fields),
        }
    }

    /// Creates a result whose normalized view is the raw payload itself.
    #[must_use]
    pub fn pass_through(provider: impl Into<String>, raw: Value) -> Self {
        Self {
            provider: provider.into(),
            normalized: Normalized::PassThrough { raw: raw.clone() },
            raw,
        }
    }

    /// Returns the extracted fields, if the adapter produced any.
    #[must_use]
    pub const fn fields(&self) -> Option<&PostalFields> {
        match &self.normalized {
            Normalized::Fields(fields) => Some(fields),
            Normalized::PassThrough { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn country_code_is_uppercased() {
        assert_eq!(CountryCode::new("br").as_str(), "BR");
        assert_eq!("de".parse::<CountryCode>().unwrap().to_string(), "DE");
    }

    #[test]
    fn structured_result_serializes_camel_case_with_nulls() {
        let fields = PostalFields::new(CountryCode::new("BR"), "01310100")
            .with_place_name("São Paulo");
        let result = NormalizedResult::structured("geonames", json!({"placeName": "São Paulo"}), fields);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "provider": "geonames",
                "raw": {"placeName": "São Paulo"},
                "normalized": {
                    "country": "BR",
                    "postalCode": "01310100",
                    "placeName": "São Paulo",
                    "adminName1": null,
                    "lat": null,
                    "lng": null
                }
            })
        );
    }

    #[test]
    fn pass_through_mirrors_raw_payload() {
        let payload = json!({"zip": "10115", "city": "Berlin"});
        let result = NormalizedResult::pass_through("openplz", payload.clone());

        assert!(result.fields().is_none());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["normalized"], json!({"raw": payload}));
    }

    #[test]
    fn normalized_deserializes_both_shapes() {
        let pass: Normalized = serde_json::from_value(json!({"raw": [1, 2]})).unwrap();
        assert!(matches!(pass, Normalized::PassThrough { .. }));

        let fields: Normalized = serde_json::from_value(json!({
            "country": "US",
            "postalCode": "94103",
            "placeName": null,
            "adminName1": "California",
            "lat": 37.77,
            "lng": -122.41
        }))
        .unwrap();
        assert!(matches!(fields, Normalized::Fields(ref f) if f.admin_name1.as_deref() == Some("California")));
    }
}
