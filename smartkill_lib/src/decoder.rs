//! Decoding of response bodies into typed entities.

use serde_json::Value;
use tracing::debug;

use crate::error::MappingError;
use crate::schema::{Entity, UnknownFields};

/// Applies entity schemas to response bodies under a fixed unknown-field policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder {
    unknown: UnknownFields,
}

impl ResponseDecoder {
    pub fn new(unknown: UnknownFields) -> Self {
        Self { unknown }
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown
    }

    /// Decode a single JSON object.
    pub fn decode<T: Entity>(&self, body: &Value) -> Result<T, MappingError> {
        let schema = T::schema();
        let canonical = schema.normalize(body, self.unknown)?;
        let entity: T = serde_json::from_value(canonical)
            .map_err(|e| MappingError::new(format!("{}: {}", schema.name, e)))?;
        entity.validate()?;
        Ok(entity)
    }

    /// Decode a list response, either a bare array or a `{"results": [...]}` envelope.
    pub fn decode_list<T: Entity>(&self, body: &Value) -> Result<Vec<T>, MappingError> {
        let items = unwrap_list(body)?;
        debug!(entity = T::schema().name, count = items.len(), "Decoding list");
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.decode(item).map_err(|e| e.at_index(i)))
            .collect()
    }
}

/// The items of a list response, whichever form it arrived in.
pub fn unwrap_list(body: &Value) -> Result<&[Value], MappingError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(MappingError::unexpected_content()),
        },
        _ => Err(MappingError::unexpected_content()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MobileApp, Trap};
    use serde_json::json;

    fn mobile_app(url: &str) -> Value {
        json!({
            "url": url,
            "min_android_version": 30,
            "ideal_android_version": 41,
            "min_ios_version": "2.0.1",
            "ideal_ios_version": "2.4.0",
            "commercial_min_android_version": 12,
            "commercial_ideal_android_version": 15,
            "commercial_min_ios_version": "1.1",
            "commercial_ideal_ios_version": "1.3"
        })
    }

    #[test]
    fn bare_array_and_envelope_decode_identically() {
        let items = json!([mobile_app("https://x/mobileapps/1/"), mobile_app("https://x/mobileapps/2/")]);
        let envelope = json!({"count": 2, "next": null, "results": items.clone()});

        let decoder = ResponseDecoder::default();
        let from_array: Vec<MobileApp> = decoder.decode_list(&items).unwrap();
        let from_envelope: Vec<MobileApp> = decoder.decode_list(&envelope).unwrap();
        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array, from_envelope);
        assert_eq!(from_array[1].url, "https://x/mobileapps/2/");
    }

    #[test]
    fn empty_envelope_is_an_empty_list() {
        let apps: Vec<MobileApp> = ResponseDecoder::default()
            .decode_list(&json!({"results": []}))
            .unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn object_without_results_is_unexpected_content() {
        let err = ResponseDecoder::default()
            .decode_list::<MobileApp>(&json!({"foo": 1}))
            .unwrap_err();
        assert_eq!(err.message, "Unexpected response content");
    }

    #[test]
    fn null_and_scalars_are_unexpected_content() {
        let decoder = ResponseDecoder::default();
        for body in [Value::Null, json!(3), json!("traps"), json!({"results": null})] {
            let err = decoder.decode_list::<MobileApp>(&body).unwrap_err();
            assert!(err.message.contains("Unexpected response content"), "{body}");
        }
    }

    #[test]
    fn single_decode_rejects_arrays() {
        let err = ResponseDecoder::default()
            .decode::<MobileApp>(&json!([mobile_app("u")]))
            .unwrap_err();
        assert!(err.message.contains("expected a MobileApp object"));
    }

    #[test]
    fn list_item_errors_carry_index() {
        let mut bad = mobile_app("u2");
        bad["min_android_version"] = json!("thirty");
        let err = ResponseDecoder::default()
            .decode_list::<MobileApp>(&json!([mobile_app("u1"), bad]))
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("[1].min_android_version"));
        assert_eq!(err.value, Some(json!("thirty")));
    }

    #[test]
    fn unknown_field_policy_is_per_decoder() {
        let mut raw = mobile_app("u");
        raw["min_windows_version"] = json!("10");

        let err = ResponseDecoder::new(UnknownFields::Raise)
            .decode::<MobileApp>(&raw)
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("min_windows_version"));

        let ignored: MobileApp = ResponseDecoder::new(UnknownFields::Ignore).decode(&raw).unwrap();
        assert!(ignored.unknown_fields().is_empty());

        let included: MobileApp = ResponseDecoder::new(UnknownFields::Include).decode(&raw).unwrap();
        assert_eq!(included.unknown_fields().get("min_windows_version"), Some(&json!("10")));
        // The side channel never leaks into the encoded form.
        let encoded = included.to_json().unwrap();
        assert!(encoded.get("min_windows_version").is_none());
        assert!(encoded.get("_unknown").is_none());
    }

    #[test]
    fn validation_runs_after_construction() {
        let raw: Value = serde_json::from_str(include_str!("../tests/fixtures/trap.json")).unwrap();
        let mut broken = raw.clone();
        broken["corruption_status"] = json!(99);
        let err = ResponseDecoder::default().decode::<Trap>(&broken).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("corruption_status"));

        let mut no_options = raw;
        no_options["corruption_status"] = json!(99);
        no_options["corruption_status_options"] = Value::Null;
        let trap: Trap = ResponseDecoder::default().decode(&no_options).unwrap();
        assert_eq!(trap.corruption_status_verbose(), None);
    }
}
