//! Wire-format quirks shared by the Nimbus service modules

use serde::{Deserialize, Deserializer};

/// Error body most Nimbus services return on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
}

/// Some older Nimbus endpoints encode booleans as 0/1.
pub fn deserialize_bool_or_int<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(u8),
    }

    match Option::<BoolOrInt>::deserialize(deserializer)? {
        Some(BoolOrInt::Bool(b)) => Ok(Some(b)),
        Some(BoolOrInt::Int(0)) => Ok(Some(false)),
        Some(BoolOrInt::Int(1)) => Ok(Some(true)),
        Some(BoolOrInt::Int(_)) => Err(serde::de::Error::custom("expected 0 or 1")),
        None => Ok(None),
    }
}

/// Object IDs arrive as strings from most services and as numbers from a
/// few legacy ones; both normalize to String.
pub fn deserialize_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Number(n) => Ok(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Flags {
        #[serde(deserialize_with = "deserialize_bool_or_int", default)]
        routed: Option<bool>,
    }

    #[derive(Deserialize)]
    struct WithId {
        #[serde(deserialize_with = "deserialize_id_string")]
        id: String,
    }

    #[test]
    fn bool_or_int_accepts_both_encodings() {
        let a: Flags = serde_json::from_str(r#"{"routed": true}"#).unwrap();
        assert_eq!(a.routed, Some(true));

        let b: Flags = serde_json::from_str(r#"{"routed": 0}"#).unwrap();
        assert_eq!(b.routed, Some(false));

        let c: Flags = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(c.routed, None);

        assert!(serde_json::from_str::<Flags>(r#"{"routed": 2}"#).is_err());
    }

    #[test]
    fn id_normalizes_numbers_to_strings() {
        let a: WithId = serde_json::from_str(r#"{"id": "net-5f2b"}"#).unwrap();
        assert_eq!(a.id, "net-5f2b");

        let b: WithId = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(b.id, "42");
    }
}
