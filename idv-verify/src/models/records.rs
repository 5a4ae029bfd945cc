//! Identity records
//!
//! Field names follow the dataset produced by the scraping tools
//! (`address-line-1`, `dateOfBirth`, ...). Every field is optional at the
//! serde level: a record with a missing field is still ingested and the
//! scorer reports it as `MissingField` instead of the whole batch failing.

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque reference to an image (URI or path served by the image store)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        ImageRef(s.to_string())
    }
}

/// The reference identity read from the photographed ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "address-line-1")]
    pub address_line_1: Option<String>,
    #[serde(default, rename = "address-line-2")]
    pub address_line_2: Option<String>,
    /// Birthdate as printed on the ID
    #[serde(default)]
    pub date_of_birth: Option<String>,
    /// Face cropped from the ID photo; the "known" image for comparisons
    #[serde(default)]
    pub face_image: Option<ImageRef>,
    #[serde(default)]
    pub profile_image: Option<ImageRef>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

/// One externally sourced record claiming to match the observed identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CandidateWire")]
pub struct CandidateRecord {
    pub name: Option<String>,
    #[serde(rename = "address-line-1")]
    pub address_line_1: Option<String>,
    #[serde(rename = "address-line-2")]
    pub address_line_2: Option<String>,
    /// Age as published by the source (candidates carry no birthdate)
    pub age: Option<i64>,
    pub nationality: Option<String>,
    pub gender: Option<String>,
    pub expiry: Option<String>,
    #[serde(rename = "faceImage")]
    pub face_image: Option<ImageRef>,
}

/// Candidate as found in the dataset
///
/// Older scrapes name the face field `image`, some records carry both keys.
/// `faceImage` wins when both are present.
#[derive(Deserialize)]
struct CandidateWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "address-line-1")]
    address_line_1: Option<String>,
    #[serde(default, rename = "address-line-2")]
    address_line_2: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_age")]
    age: Option<i64>,
    #[serde(default)]
    nationality: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    expiry: Option<String>,
    #[serde(default, rename = "faceImage")]
    face_image: Option<ImageRef>,
    #[serde(default)]
    image: Option<ImageRef>,
}

impl From<CandidateWire> for CandidateRecord {
    fn from(wire: CandidateWire) -> Self {
        Self {
            name: wire.name,
            address_line_1: wire.address_line_1,
            address_line_2: wire.address_line_2,
            age: wire.age,
            nationality: wire.nationality,
            gender: wire.gender,
            expiry: wire.expiry,
            face_image: wire.face_image.or(wire.image),
        }
    }
}

/// Accept `35`, `"35"` and `" 35 "`; anything else is treated as absent
fn deserialize_lenient_age<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// One identity: the observed record plus every online candidate for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub observed: ObservedRecord,
    /// Photo of the person taken in real life, when one was captured
    #[serde(default, rename = "IRL_image")]
    pub irl_image: Option<ImageRef>,
    #[serde(default, rename = "online")]
    pub candidates: Vec<CandidateRecord>,
}

/// Listing entry for the identity picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub index: usize,
    pub name: Option<String>,
    pub profile_image: Option<ImageRef>,
    pub face_image: Option<ImageRef>,
    pub candidate_count: usize,
}

impl IdentityEntry {
    pub fn summary(&self, index: usize) -> IdentitySummary {
        IdentitySummary {
            index,
            name: self.observed.name.clone(),
            profile_image: self.observed.profile_image.clone(),
            face_image: self.observed.face_image.clone(),
            candidate_count: self.candidates.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_age_accepts_number_or_string() {
        let c: CandidateRecord = serde_json::from_str(r#"{"age": 35}"#).unwrap();
        assert_eq!(c.age, Some(35));

        let c: CandidateRecord = serde_json::from_str(r#"{"age": " 41 "}"#).unwrap();
        assert_eq!(c.age, Some(41));

        let c: CandidateRecord = serde_json::from_str(r#"{"age": "unknown"}"#).unwrap();
        assert_eq!(c.age, None);

        let c: CandidateRecord = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(c.age, None);
    }

    #[test]
    fn test_candidate_image_alias() {
        let c: CandidateRecord = serde_json::from_str(r#"{"image": "/faces/a.jpg"}"#).unwrap();
        assert_eq!(c.face_image, Some(ImageRef::from("/faces/a.jpg")));
    }

    #[test]
    fn test_candidate_with_both_image_keys() {
        let c: CandidateRecord =
            serde_json::from_str(r#"{"faceImage": "/faces/a.jpg", "image": "/faces/b.jpg"}"#).unwrap();
        assert_eq!(c.face_image, Some(ImageRef::from("/faces/a.jpg")));

        let c: CandidateRecord =
            serde_json::from_str(r#"{"faceImage": null, "image": "/faces/b.jpg"}"#).unwrap();
        assert_eq!(c.face_image, Some(ImageRef::from("/faces/b.jpg")));
    }

    #[test]
    fn test_observed_field_names() {
        let o: ObservedRecord = serde_json::from_str(
            r#"{
                "name": "Jane Doe",
                "address-line-1": "1 Main St",
                "address-line-2": "City ST 1",
                "dateOfBirth": "01/01/1990",
                "faceImage": "/id/face.png",
                "profileImage": "/id/profile.png",
                "expiryDate": "01/01/2030"
            }"#,
        )
        .unwrap();
        assert_eq!(o.address_line_2.as_deref(), Some("City ST 1"));
        assert_eq!(o.date_of_birth.as_deref(), Some("01/01/1990"));
        assert_eq!(o.face_image, Some(ImageRef::from("/id/face.png")));
        assert_eq!(o.expiry_date.as_deref(), Some("01/01/2030"));
    }
}
