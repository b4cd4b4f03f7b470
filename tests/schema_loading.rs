//! Schema Loading Tests
//!
//! Models declared as JSON files drive the engine exactly like models
//! registered in code:
//! - Saved definitions load back into an equivalent registry
//! - Inherited key tables and explicit keys shape the documents
//! - Configuration files set registry and call defaults

use std::fs;

use recordjson::{
    DeserializeOptions, Document, DynamicRecord, FieldDecl, FieldValue, InMemoryRecordStore,
    KeyConvention, MarshalConfig, Marshaller, ModelDef, Record, SchemaError, SchemaRegistry,
    TypeTag,
};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn person() -> ModelDef {
    ModelDef::new(
        "person",
        vec![
            FieldDecl::generated_id("id"),
            FieldDecl::plain("first_name"),
            FieldDecl::new("birth_date", TypeTag::Date).with_null(),
        ],
    )
    .with_json_keys([("first_name", "givenName")])
}

fn employee() -> ModelDef {
    ModelDef::new(
        "employee",
        vec![
            FieldDecl::plain("staff_code").with_json_key("code").with_unique(),
            FieldDecl::relation("manager", "employee").with_null(),
        ],
    )
    .extending("person")
}

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

// =============================================================================
// File Round Trip
// =============================================================================

/// Saved models load into a fresh registry with identical descriptors.
#[test]
fn test_saved_models_reload() {
    let tmp = TempDir::new().unwrap();
    let original = SchemaRegistry::new();

    for def in [person(), employee()] {
        original.save_model(tmp.path(), &def).unwrap();
        original.register(def).unwrap();
    }

    let reloaded = SchemaRegistry::new();
    assert_eq!(reloaded.load_dir(tmp.path()).unwrap(), 2);
    assert_eq!(reloaded.model_names(), vec!["employee", "person"]);

    for model in ["person", "employee"] {
        assert_eq!(
            original.descriptors_for(model).unwrap(),
            reloaded.descriptors_for(model).unwrap()
        );
    }
}

/// A hand-written model file is enough to marshal records.
#[test]
fn test_hand_written_model_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("ticket.json"),
        r#"{
            "name": "ticket",
            "fields": [
                {"attribute": "id", "type": "generated_id", "has_default": true},
                {"attribute": "title", "type": "plain"},
                {"attribute": "opened_at", "type": "datetime"},
                {"attribute": "state", "type": "enum",
                 "enum_values": {"members": [{"name": "OPEN", "value": "o"}, {"name": "DONE", "value": "d"}]}}
            ]
        }"#,
    )
    .unwrap();

    let registry = SchemaRegistry::new();
    registry.load_dir(tmp.path()).unwrap();
    let store = InMemoryRecordStore::new();
    let marshaller = Marshaller::new(&registry, &store);

    let record = marshaller
        .deserialize(
            "ticket",
            &doc(json!({"title": "broken", "openedAt": "2024-01-01 08:00:00", "state": "o"})),
            &DeserializeOptions::default(),
        )
        .unwrap();
    assert_eq!(record.read("state"), FieldValue::Enum("OPEN".into()));

    let document = marshaller
        .serialize(&record, &marshaller.serialize_options())
        .unwrap();
    assert_eq!(document["openedAt"], json!("2024-01-01T08:00:00"));
    assert_eq!(document["state"], json!("o"));
}

/// An unreadable model file stops loading with an I/O schema error.
#[test]
fn test_invalid_model_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();

    let err = SchemaRegistry::new().load_dir(tmp.path()).unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}

// =============================================================================
// Key Resolution Through Inheritance
// =============================================================================

/// Inherited key tables, explicit keys and the convention all apply.
#[test]
fn test_inherited_keys_shape_documents() {
    let registry = SchemaRegistry::new();
    registry.register(person()).unwrap();
    registry.register(employee()).unwrap();
    let store = InMemoryRecordStore::new();
    let marshaller = Marshaller::new(&registry, &store);

    let keys: Vec<String> = marshaller
        .schema_of("employee")
        .unwrap()
        .fields()
        .iter()
        .map(|f| f.json_key.clone())
        .collect();
    assert_eq!(keys, vec!["id", "givenName", "birthDate", "code", "managerId"]);

    let boss = DynamicRecord::new("employee")
        .with("first_name", "Grace")
        .with("staff_code", "E1");
    let boss_id = store.insert(boss).unwrap();

    let record = DynamicRecord::new("employee")
        .with("id", 2_i64)
        .with("first_name", "Alan")
        .with("staff_code", "E2")
        .with("manager", FieldValue::Reference(boss_id));

    let options = marshaller
        .serialize_options()
        .with_cascade(recordjson::Cascade::Depth(1));
    let document = marshaller.serialize(&record, &options).unwrap();

    assert_eq!(
        Value::Object(document),
        json!({
            "id": 2,
            "givenName": "Alan",
            "code": "E2",
            "managerId": {"id": 1, "givenName": "Grace", "code": "E1"}
        })
    );
}

/// A derived model may not claim a key its parent already resolves to.
#[test]
fn test_derived_key_collision() {
    let registry = SchemaRegistry::new();
    registry.register(person()).unwrap();
    registry
        .register(
            ModelDef::new("contractor", vec![FieldDecl::plain("nickname").with_json_key("givenName")])
                .extending("person"),
        )
        .unwrap();

    let err = registry.descriptors_for("contractor").unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateJsonKey { .. }));
}

// =============================================================================
// Configuration
// =============================================================================

/// A config file selects the key convention and serialization defaults.
#[test]
fn test_config_file_drives_engine() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("recordjson.json");
    fs::write(
        &path,
        r#"{"key_convention": "column", "include_nulls": true, "min_secret_length": 4}"#,
    )
    .unwrap();

    let config = MarshalConfig::from_file(&path).unwrap();
    let registry = SchemaRegistry::from_config(&config);
    assert_eq!(registry.convention(), KeyConvention::Column);

    registry
        .register(ModelDef::new(
            "login",
            vec![
                FieldDecl::generated_id("id"),
                FieldDecl::plain("user_name"),
                FieldDecl::secret("pass_word"),
                FieldDecl::new("last_seen", TypeTag::DateTime).with_null(),
            ],
        ))
        .unwrap();

    let store = InMemoryRecordStore::new();
    let marshaller = Marshaller::with_config(&registry, &store, config);

    let record = marshaller
        .deserialize(
            "login",
            &doc(json!({"user_name": "ada", "pass_word": "abcd"})),
            &marshaller.deserialize_options(),
        )
        .unwrap();

    let document = marshaller
        .serialize(&record, &marshaller.serialize_options())
        .unwrap();
    assert_eq!(
        Value::Object(document),
        json!({"id": null, "user_name": "ada", "last_seen": null})
    );
}
