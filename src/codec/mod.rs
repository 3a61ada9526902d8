//! Codec Module
//!
//! Converts application values to and from the JSON payloads kept in the store.
//!
//! Polymorphic values are modelled as internally tagged enums using the
//! [`TYPE_TAG`] field, so a payload carries the concrete variant it was
//! written from. The tag value is also the type identifier consulted by the
//! [`TypeRegistry`] for excluded fields and custom readers.

mod back_ref;
mod registry;

pub use back_ref::BackRef;
pub use registry::{Reader, TypeRegistry, TypeRules};

use std::any::type_name;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::CodecError;

// == Public Constants ==
/// Field carrying the type identifier of a tagged JSON object.
///
/// Types use it through `#[serde(tag = "$type")]`.
pub const TYPE_TAG: &str = "$type";

// == Codec ==
/// JSON codec with a per-type rule table.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
}

impl Codec {
    // == Constructor ==
    /// Creates a codec consulting the given registry.
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Returns the rule table used by this codec.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // == Serialize ==
    /// Encodes a value as JSON text, dropping excluded fields of tagged objects.
    pub fn serialize<T>(&self, value: &T) -> Result<String, CodecError>
    where
        T: Serialize + ?Sized,
    {
        if !self.registry.has_exclusions() {
            return serde_json::to_string(value).map_err(CodecError::Serialize);
        }

        let mut tree = serde_json::to_value(value).map_err(CodecError::Serialize)?;
        self.registry.strip_excluded(&mut tree);
        serde_json::to_string(&tree).map_err(CodecError::Serialize)
    }

    // == Deserialize ==
    /// Decodes JSON text as `T`, running registered readers on tagged objects first.
    pub fn deserialize<T>(&self, payload: &str) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        let failed = |source: serde_json::Error| CodecError::Deserialize {
            type_name: type_name::<T>(),
            source,
        };

        if !self.registry.has_readers() {
            return serde_json::from_str(payload).map_err(failed);
        }

        let mut tree: Value = serde_json::from_str(payload).map_err(failed)?;
        self.registry.apply_readers(&mut tree)?;
        serde_json::from_value(tree).map_err(failed)
    }

    // == Is Null ==
    /// Returns true when the payload carries no value (empty or JSON `null`).
    pub fn is_null_payload(payload: &str) -> bool {
        let trimmed = payload.trim();
        trimmed.is_empty() || trimmed == "null"
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "$type")]
    enum Shape {
        Circle { radius: f64 },
        Rectangle { width: f64, height: f64 },
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Drawing {
        title: String,
        primary: Shape,
        layers: Vec<Shape>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct DatabaseServerType {
        database_type_id: String,
        short_name: String,
        display_name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "$type")]
    enum Connector {
        DatabaseServer(DatabaseServerType),
        File { path: String },
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "$type")]
    enum Credential {
        ApiKey {
            name: String,
            #[serde(default)]
            token: String,
        },
    }

    fn legacy_server_reader() -> TypeRegistry {
        TypeRegistry::new().register_reader("DatabaseServer", |fields| {
            let field = |name: &str| {
                fields
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| CodecError::Reader {
                        type_id: "DatabaseServer".to_string(),
                        message: format!("missing field {}", name),
                    })
            };

            let database_type_id = field("DatabaseTypeId")?;
            let short_name = field("ShortDbTypeName")?;
            let display_name = field("DatabaseTypeName")?;

            Ok(json!({
                "database_type_id": database_type_id,
                "short_name": short_name,
                "display_name": display_name,
            }))
        })
    }

    #[test]
    fn test_roundtrip_plain_values() {
        let codec = Codec::default();

        let mut map = BTreeMap::new();
        map.insert("a".to_string(), vec![1, 2, 3]);
        map.insert("b".to_string(), vec![]);

        let payload = codec.serialize(&map).unwrap();
        let decoded: BTreeMap<String, Vec<i32>> = codec.deserialize(&payload).unwrap();
        assert_eq!(decoded, map);

        let payload = codec.serialize("test value").unwrap();
        let decoded: String = codec.deserialize(&payload).unwrap();
        assert_eq!(decoded, "test value");
    }

    #[test]
    fn test_polymorphic_field_keeps_variant() {
        let codec = Codec::default();
        let drawing = Drawing {
            title: "plan".to_string(),
            primary: Shape::Rectangle {
                width: 2.0,
                height: 3.5,
            },
            layers: vec![Shape::Circle { radius: 1.0 }, Shape::Rectangle { width: 1.0, height: 1.0 }],
        };

        let payload = codec.serialize(&drawing).unwrap();
        assert!(payload.contains(r#""$type":"Rectangle""#));

        let decoded: Drawing = codec.deserialize(&payload).unwrap();
        assert_eq!(decoded, drawing);
        assert!(matches!(decoded.primary, Shape::Rectangle { .. }));
    }

    #[test]
    fn test_excluded_fields_are_dropped() {
        let codec = Codec::new(TypeRegistry::new().exclude_fields("ApiKey", ["token"]));
        let credential = Credential::ApiKey {
            name: "reporting".to_string(),
            token: "s3cr3t".to_string(),
        };

        let payload = codec.serialize(&vec![credential]).unwrap();
        assert!(!payload.contains("s3cr3t"));
        assert!(!payload.contains("token"));

        let decoded: Vec<Credential> = codec.deserialize(&payload).unwrap();
        assert_eq!(
            decoded,
            vec![Credential::ApiKey {
                name: "reporting".to_string(),
                token: String::new(),
            }]
        );
    }

    #[test]
    fn test_exclusions_only_apply_to_their_type() {
        let codec = Codec::new(TypeRegistry::new().exclude_fields("Circle", ["radius"]));
        let payload = codec
            .serialize(&Shape::Rectangle {
                width: 4.0,
                height: 2.0,
            })
            .unwrap();

        let decoded: Shape = codec.deserialize(&payload).unwrap();
        assert_eq!(
            decoded,
            Shape::Rectangle {
                width: 4.0,
                height: 2.0
            }
        );
    }

    #[test]
    fn test_custom_reader_rebuilds_value() {
        let codec = Codec::new(legacy_server_reader());
        let payload = r#"[
            {"$type":"DatabaseServer","DatabaseTypeId":"mssql","ShortDbTypeName":"MSSQL",
             "DatabaseTypeName":"SQL Server","Capabilities":["views","procedures"]},
            {"$type":"File","path":"/tmp/data.csv"}
        ]"#;

        let decoded: Vec<Connector> = codec.deserialize(payload).unwrap();
        assert_eq!(
            decoded,
            vec![
                Connector::DatabaseServer(DatabaseServerType {
                    database_type_id: "mssql".to_string(),
                    short_name: "MSSQL".to_string(),
                    display_name: "SQL Server".to_string(),
                }),
                Connector::File {
                    path: "/tmp/data.csv".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_custom_reader_error_propagates() {
        let codec = Codec::new(legacy_server_reader());
        let payload = r#"{"$type":"DatabaseServer","DatabaseTypeId":"mssql"}"#;

        let result: Result<Connector, _> = codec.deserialize(payload);
        assert!(matches!(result, Err(CodecError::Reader { .. })));
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let codec = Codec::default();
        let payload = codec.serialize(&"not a number").unwrap();

        let result: Result<u32, _> = codec.deserialize(&payload);
        match result {
            Err(CodecError::Deserialize { type_name, .. }) => assert_eq!(type_name, "u32"),
            other => panic!("expected deserialize error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_payload_detection() {
        assert!(Codec::is_null_payload(""));
        assert!(Codec::is_null_payload("null"));
        assert!(Codec::is_null_payload("  null\n"));
        assert!(!Codec::is_null_payload("0"));
        assert!(!Codec::is_null_payload(r#""""#));
    }
}
