//! Declarative field-mapping tables for entities.
//!
//! Every entity declares a static [`EntitySchema`]: one [`FieldSpec`] per target
//! field naming the source JSON key, the expected [`FieldType`] and whether the
//! field may be absent. Decoding first normalizes a raw server object into a
//! canonical object keyed by target field names (coercing scalars, parsing
//! timestamps, recursing into nested entities), then serde builds the typed
//! entity from that canonical form. Encoding runs the table in reverse.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::MappingError;
use crate::helpers::parse_time;

/// Canonical key under which [`UnknownFields::Include`] keeps unmapped source keys.
pub(crate) const UNKNOWN_KEY: &str = "_unknown";

/// What to do with JSON keys that are not in an entity's mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Fail with a [`MappingError`] naming the key.
    #[default]
    Raise,
    /// Drop the key silently.
    Ignore,
    /// Keep the key and its raw value in the entity's side-channel map.
    Include,
}

impl FromStr for UnknownFields {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raise" => Ok(UnknownFields::Raise),
            "ignore" => Ok(UnknownFields::Ignore),
            "include" => Ok(UnknownFields::Include),
            _ => Err(format!("unknown field policy: {}", s)),
        }
    }
}

/// Expected shape of a mapped field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    Integer,
    /// Server-assigned identifier: a non-negative integer.
    Id,
    Float,
    Boolean,
    Text,
    /// ISO 8601 string (or integer Unix seconds).
    DateTime,
    /// Free-form JSON kept as-is.
    Opaque,
    List(&'static FieldType),
    /// List of `[code, label]` pairs.
    CodeLabelList,
    Nested(&'static EntitySchema),
    NestedList(&'static EntitySchema),
}

/// One row of a mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Target field name on the entity.
    pub name: &'static str,
    /// Source key in the server payload.
    pub key: &'static str,
    pub kind: FieldType,
    /// Whether the key may be missing or null.
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            key: name,
            kind,
            nullable: false,
        }
    }

    /// Read the field from a differently named source key.
    pub const fn from_key(self, key: &'static str) -> Self {
        Self { key, ..self }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }
}

/// Static mapping table for one entity type.
#[derive(Debug)]
pub struct EntitySchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl EntitySchema {
    /// Look up a field by its target name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by its source key.
    pub fn field_by_key(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Normalize a raw server object into the canonical, target-keyed form.
    pub fn normalize(&self, raw: &Value, unknown: UnknownFields) -> Result<Value, MappingError> {
        self.normalize_at(raw, unknown, "")
    }

    fn normalize_at(
        &self,
        raw: &Value,
        unknown: UnknownFields,
        path: &str,
    ) -> Result<Value, MappingError> {
        let object = raw.as_object().ok_or_else(|| {
            let at = if path.is_empty() { self.name } else { path };
            MappingError::field(at, &format!("expected a {} object", self.name), Some(raw))
        })?;

        let mut out = Map::with_capacity(self.fields.len());
        for spec in self.fields {
            let field_path = join_path(path, spec.key);
            let value = match object.get(spec.key) {
                None | Some(Value::Null) if spec.nullable => Value::Null,
                None => {
                    return Err(MappingError::field(field_path, "missing required field", None))
                }
                Some(Value::Null) => {
                    return Err(MappingError::field(field_path, "field may not be null", None))
                }
                Some(v) => spec.kind.coerce(v, unknown, &field_path)?,
            };
            out.insert(spec.name.to_string(), value);
        }

        let mut extra = object
            .iter()
            .filter(|(key, _)| self.field_by_key(key).is_none());
        match unknown {
            UnknownFields::Ignore => {}
            UnknownFields::Raise => {
                if let Some((key, value)) = extra.next() {
                    return Err(MappingError::field(
                        join_path(path, key),
                        "unknown field",
                        Some(value),
                    ));
                }
            }
            UnknownFields::Include => {
                let kept: Map<String, Value> =
                    extra.map(|(k, v)| (k.clone(), v.clone())).collect();
                if !kept.is_empty() {
                    out.insert(UNKNOWN_KEY.to_string(), Value::Object(kept));
                }
            }
        }

        Ok(Value::Object(out))
    }

    /// Rename a canonical (target-keyed) object back to the server's keys.
    pub fn encode(&self, value: &Value) -> Value {
        let Some(object) = value.as_object() else {
            return value.clone();
        };
        let mut out = Map::with_capacity(self.fields.len());
        for spec in self.fields {
            let v = object.get(spec.name).cloned().unwrap_or(Value::Null);
            let encoded = match (spec.kind, &v) {
                (FieldType::Nested(schema), _) => schema.encode(&v),
                (FieldType::NestedList(schema), Value::Array(items)) => {
                    Value::Array(items.iter().map(|item| schema.encode(item)).collect())
                }
                _ => v,
            };
            out.insert(spec.key.to_string(), encoded);
        }
        Value::Object(out)
    }
}

impl FieldType {
    fn coerce(&self, raw: &Value, unknown: UnknownFields, path: &str) -> Result<Value, MappingError> {
        match self {
            FieldType::Integer => {
                coerce_integer(raw).ok_or_else(|| invalid(path, "not a valid integer", raw))
            }
            FieldType::Id => coerce_id(raw).ok_or_else(|| invalid(path, "not a valid id", raw)),
            FieldType::Float => {
                coerce_float(raw).ok_or_else(|| invalid(path, "not a valid number", raw))
            }
            FieldType::Boolean => coerce_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| invalid(path, "not a valid boolean", raw)),
            FieldType::Text => match raw {
                Value::String(_) => Ok(raw.clone()),
                _ => Err(invalid(path, "not a valid string", raw)),
            },
            FieldType::DateTime => coerce_datetime(raw)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| invalid(path, "not a valid datetime", raw)),
            FieldType::Opaque => Ok(raw.clone()),
            FieldType::List(inner) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| invalid(path, "not a valid list", raw))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| inner.coerce(item, unknown, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldType::CodeLabelList => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| invalid(path, "not a valid list", raw))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| coerce_code_label(item, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldType::Nested(schema) => schema.normalize_at(raw, unknown, path),
            FieldType::NestedList(schema) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| invalid(path, "not a valid list", raw))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| schema.normalize_at(item, unknown, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }
}

/// An entity decoded through a static [`EntitySchema`].
pub trait Entity: DeserializeOwned + Serialize {
    fn schema() -> &'static EntitySchema;

    /// Source keys retained under [`UnknownFields::Include`]; empty otherwise.
    fn unknown_fields(&self) -> &Map<String, Value>;

    /// Cross-field checks run after construction.
    fn validate(&self) -> Result<(), MappingError> {
        Ok(())
    }

    /// Serialize back to JSON using the server's key names.
    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self).map(|v| Self::schema().encode(&v))
    }
}

pub(crate) fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn invalid(path: &str, reason: &str, raw: &Value) -> MappingError {
    MappingError::field(path, reason, Some(raw))
}

fn coerce_integer(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(n) => n.as_i64().map(Value::from).or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64))
        }),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_id(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(n) if n.as_u64().is_some() => Some(raw.clone()),
        _ => coerce_integer(raw).filter(|v| v.as_i64().is_some_and(|i| i >= 0)),
    }
}

fn coerce_float(raw: &Value) -> Option<Value> {
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_datetime(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_time(s).ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        _ => None,
    }
}

fn coerce_code_label(item: &Value, path: &str) -> Result<Value, MappingError> {
    let pair = item
        .as_array()
        .filter(|p| p.len() == 2)
        .ok_or_else(|| invalid(path, "not a valid (code, label) pair", item))?;
    let code = coerce_integer(&pair[0])
        .ok_or_else(|| invalid(&format!("{}[0]", path), "not a valid integer", &pair[0]))?;
    if !pair[1].is_string() {
        return Err(invalid(&format!("{}[1]", path), "not a valid string", &pair[1]));
    }
    Ok(Value::Array(vec![code, pair[1].clone()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static PART: EntitySchema = EntitySchema {
        name: "Part",
        fields: &[
            FieldSpec::new("serial", FieldType::Text),
            FieldSpec::new("weight", FieldType::Float).nullable(),
        ],
    };

    static GADGET: EntitySchema = EntitySchema {
        name: "Gadget",
        fields: &[
            FieldSpec::new("id", FieldType::Integer),
            FieldSpec::new("is_armed", FieldType::Boolean).from_key("isArmed"),
            FieldSpec::new("installed", FieldType::DateTime),
            FieldSpec::new("note", FieldType::Opaque).nullable(),
            FieldSpec::new("tags", FieldType::List(&FieldType::Text)),
            FieldSpec::new("options", FieldType::CodeLabelList).nullable(),
            FieldSpec::new("part", FieldType::Nested(&PART)),
            FieldSpec::new("spares", FieldType::NestedList(&PART)).nullable(),
        ],
    };

    fn gadget() -> Value {
        json!({
            "id": "17",
            "isArmed": "yes",
            "installed": "2021-03-04T05:06:07Z",
            "note": {"free": ["form"]},
            "tags": ["a", "b"],
            "options": [[0, "OK"], ["1", "Broken"]],
            "part": {"serial": "P-1", "weight": "2.5"},
            "spares": [{"serial": "P-2"}]
        })
    }

    #[test]
    fn normalize_renames_and_coerces() {
        let out = GADGET.normalize(&gadget(), UnknownFields::Raise).unwrap();
        assert_eq!(out["id"], json!(17));
        assert_eq!(out["is_armed"], json!(true));
        assert!(out.get("isArmed").is_none());
        assert_eq!(out["installed"], json!("2021-03-04T05:06:07+00:00"));
        assert_eq!(out["note"], json!({"free": ["form"]}));
        assert_eq!(out["options"], json!([[0, "OK"], [1, "Broken"]]));
        assert_eq!(out["part"]["weight"], json!(2.5));
        assert_eq!(out["spares"][0]["weight"], Value::Null);
    }

    #[test]
    fn nullable_fields_may_be_missing() {
        let mut raw = gadget();
        let obj = raw.as_object_mut().unwrap();
        obj.remove("note");
        obj.insert("options".into(), Value::Null);
        let out = GADGET.normalize(&raw, UnknownFields::Raise).unwrap();
        assert_eq!(out["note"], Value::Null);
        assert_eq!(out["options"], Value::Null);
    }

    #[test]
    fn missing_required_field_is_named() {
        let mut raw = gadget();
        raw.as_object_mut().unwrap().remove("isArmed");
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("isArmed"));
        assert!(err.message.contains("missing required field"));
    }

    #[test]
    fn null_required_field_is_rejected() {
        let mut raw = gadget();
        raw["id"] = Value::Null;
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("id"));
    }

    #[test]
    fn coercion_failure_names_field_and_value() {
        let mut raw = gadget();
        raw["id"] = json!("seventeen");
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("id"));
        assert_eq!(err.value, Some(json!("seventeen")));
        assert!(err.message.contains("not a valid integer"));
    }

    #[test]
    fn ids_must_be_non_negative() {
        let id = FieldType::Id;
        assert_eq!(id.coerce(&json!(42), UnknownFields::Raise, "id").unwrap(), json!(42));
        assert_eq!(id.coerce(&json!("7"), UnknownFields::Raise, "id").unwrap(), json!(7));
        assert_eq!(id.coerce(&json!(0), UnknownFields::Raise, "id").unwrap(), json!(0));

        let err = id
            .coerce(&json!(-5), UnknownFields::Raise, "part.id")
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("part.id"));
        assert_eq!(err.value, Some(json!(-5)));
        assert!(err.message.contains("not a valid id"));
        assert!(id.coerce(&json!("-1"), UnknownFields::Raise, "id").is_err());
        assert!(id.coerce(&json!(true), UnknownFields::Raise, "id").is_err());
    }

    #[test]
    fn booleans_are_not_integers() {
        let mut raw = gadget();
        raw["id"] = json!(true);
        assert!(GADGET.normalize(&raw, UnknownFields::Raise).is_err());
    }

    #[test]
    fn text_rejects_numbers() {
        let mut raw = gadget();
        raw["part"]["serial"] = json!(12);
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("part.serial"));
    }

    #[test]
    fn malformed_datetime_is_rejected() {
        let mut raw = gadget();
        raw["installed"] = json!("last tuesday");
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("installed"));
        assert!(err.message.contains("datetime"));
    }

    #[test]
    fn unix_seconds_are_datetimes() {
        let mut raw = gadget();
        raw["installed"] = json!(0);
        let out = GADGET.normalize(&raw, UnknownFields::Raise).unwrap();
        assert_eq!(out["installed"], json!("1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn nested_list_errors_carry_index() {
        let mut raw = gadget();
        raw["spares"] = json!([{"serial": "ok"}, {"weight": 1}]);
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("spares[1].serial"));
    }

    #[test]
    fn malformed_code_label_pair() {
        let mut raw = gadget();
        raw["options"] = json!([[0, "OK", "extra"]]);
        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("options[0]"));
    }

    #[test]
    fn unknown_field_policies() {
        let mut raw = gadget();
        raw["colour"] = json!("red");
        raw["part"]["vendor"] = json!("acme");

        let err = GADGET.normalize(&raw, UnknownFields::Raise).unwrap_err();
        assert!(err.message.contains("unknown field"));

        let ignored = GADGET.normalize(&raw, UnknownFields::Ignore).unwrap();
        assert!(ignored.get(UNKNOWN_KEY).is_none());
        assert!(ignored.get("colour").is_none());

        let included = GADGET.normalize(&raw, UnknownFields::Include).unwrap();
        assert_eq!(included[UNKNOWN_KEY], json!({"colour": "red"}));
        assert_eq!(included["part"][UNKNOWN_KEY], json!({"vendor": "acme"}));
    }

    #[test]
    fn encode_restores_source_keys() {
        let canonical = GADGET.normalize(&gadget(), UnknownFields::Raise).unwrap();
        let encoded = GADGET.encode(&canonical);
        assert_eq!(encoded["isArmed"], json!(true));
        assert!(encoded.get("is_armed").is_none());
        assert_eq!(encoded["part"]["serial"], json!("P-1"));
        assert_eq!(encoded["spares"][0]["serial"], json!("P-2"));
    }

    #[test]
    fn lookups_by_name_and_key() {
        assert_eq!(GADGET.field("is_armed").map(|f| f.key), Some("isArmed"));
        assert_eq!(GADGET.field_by_key("isArmed").map(|f| f.name), Some("is_armed"));
        assert!(GADGET.field_by_key("is_armed").is_none());
    }

    #[test]
    fn unknown_fields_from_str() {
        assert_eq!("raise".parse::<UnknownFields>().unwrap(), UnknownFields::Raise);
        assert_eq!("Ignore".parse::<UnknownFields>().unwrap(), UnknownFields::Ignore);
        assert_eq!("INCLUDE".parse::<UnknownFields>().unwrap(), UnknownFields::Include);
        assert!("drop".parse::<UnknownFields>().is_err());
    }
}
