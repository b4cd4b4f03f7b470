//! Schema registry and introspector
//!
//! - Model definitions are registered once and never replaced
//! - Definitions may be read from `model_<name>.json` files
//! - Descriptor sets are resolved on first use and memoized for the life
//!   of the registry; resolution is a pure function of immutable
//!   definitions, so concurrent first uses may both compute it safely

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::MarshalConfig;
use crate::convert::SecretHash;
use crate::observability::{log_event_with_fields, Event};

use super::descriptor::{FieldDescriptor, ModelSchema};
use super::errors::{SchemaError, SchemaResult};
use super::naming::KeyConvention;
use super::types::{FieldDecl, ModelDef, TypeTag};

/// Registry of model definitions with a memoized descriptor table.
pub struct SchemaRegistry {
    convention: KeyConvention,
    min_secret_length: usize,
    definitions: RwLock<HashMap<String, Arc<ModelDef>>>,
    resolved: RwLock<HashMap<String, Arc<ModelSchema>>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Creates an empty registry using the default key convention.
    pub fn new() -> Self {
        Self::with_convention(KeyConvention::default())
    }

    /// Creates an empty registry deriving keys with `convention`.
    pub fn with_convention(convention: KeyConvention) -> Self {
        Self {
            convention,
            min_secret_length: SecretHash::DEFAULT_MIN_LENGTH,
            definitions: RwLock::new(HashMap::new()),
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an empty registry from the engine configuration.
    pub fn from_config(config: &MarshalConfig) -> Self {
        Self {
            min_secret_length: config.min_secret_length,
            ..Self::with_convention(config.key_convention)
        }
    }

    /// Returns the key convention used for fields without an override.
    pub fn convention(&self) -> KeyConvention {
        self.convention
    }

    /// Returns the minimum plaintext length given to secret fields without one.
    pub fn min_secret_length(&self) -> usize {
        self.min_secret_length
    }

    /// Registers a model definition.
    ///
    /// Fails if the definition is malformed or the name is taken.
    pub fn register(&self, def: ModelDef) -> SchemaResult<()> {
        def.validate_structure()
            .map_err(|reason| SchemaError::malformed(&def.name, reason))?;

        let name = def.name.clone();
        let field_count = def.fields.len().to_string();
        {
            let mut definitions = self
                .definitions
                .write()
                .map_err(|_| SchemaError::RegistryPoisoned)?;

            if definitions.contains_key(&name) {
                return Err(SchemaError::ModelImmutable(name));
            }

            definitions.insert(name.clone(), Arc::new(def));
        }

        log_event_with_fields(
            Event::SchemaRegistered,
            &[("model", name.as_str()), ("fields", field_count.as_str())],
        );
        Ok(())
    }

    /// Loads every `*.json` model file in `dir`.
    ///
    /// A missing directory holds no models. Returns the number registered.
    pub fn load_dir(&self, dir: &Path) -> SchemaResult<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::io(dir.display().to_string(), format!("failed to read directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::io(dir.display().to_string(), format!("failed to read entry: {}", e))
            })?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }

        // Directory order is platform dependent
        paths.sort();

        for path in &paths {
            self.load_model_file(path)?;
        }

        Ok(paths.len())
    }

    fn load_model_file(&self, path: &Path) -> SchemaResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::io(path.display().to_string(), format!("failed to read file: {}", e))
        })?;

        let def: ModelDef = serde_json::from_str(&content).map_err(|e| {
            SchemaError::io(path.display().to_string(), format!("invalid JSON: {}", e))
        })?;

        let name = def.name.clone();
        self.register(def)?;

        let path_text = path.display().to_string();
        log_event_with_fields(
            Event::SchemaFileLoaded,
            &[("model", name.as_str()), ("path", path_text.as_str())],
        );
        Ok(())
    }

    /// Writes `def` to `dir/model_<name>.json`.
    ///
    /// Existing files are never overwritten.
    pub fn save_model(&self, dir: &Path, def: &ModelDef) -> SchemaResult<PathBuf> {
        let path = dir.join(format!("model_{}.json", def.name));

        if path.exists() {
            return Err(SchemaError::ModelImmutable(def.name.clone()));
        }

        fs::create_dir_all(dir).map_err(|e| {
            SchemaError::io(dir.display().to_string(), format!("failed to create directory: {}", e))
        })?;

        let content = serde_json::to_string_pretty(def).map_err(|e| {
            SchemaError::io(path.display().to_string(), format!("failed to serialize: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::io(path.display().to_string(), format!("failed to write file: {}", e))
        })?;

        Ok(path)
    }

    /// Checks if a model is registered.
    pub fn contains(&self, model: &str) -> bool {
        self.definitions
            .read()
            .map(|definitions| definitions.contains_key(model))
            .unwrap_or(false)
    }

    /// Returns the registered model names, sorted.
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .definitions
            .read()
            .map(|definitions| definitions.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Returns the resolved descriptor set of `model`, computing it on first use.
    pub fn descriptors_for(&self, model: &str) -> SchemaResult<Arc<ModelSchema>> {
        if let Some(schema) = self
            .resolved
            .read()
            .map_err(|_| SchemaError::RegistryPoisoned)?
            .get(model)
        {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(self.resolve(model)?);

        let mut resolved = self
            .resolved
            .write()
            .map_err(|_| SchemaError::RegistryPoisoned)?;
        let entry = resolved
            .entry(model.to_string())
            .or_insert_with(|| Arc::clone(&schema));

        let field_count = entry.len().to_string();
        log_event_with_fields(
            Event::SchemaResolved,
            &[("model", model), ("fields", field_count.as_str())],
        );

        Ok(Arc::clone(entry))
    }

    /// Returns the definitions from the root ancestor down to `model`.
    fn inheritance_chain(&self, model: &str) -> SchemaResult<Vec<Arc<ModelDef>>> {
        let definitions = self
            .definitions
            .read()
            .map_err(|_| SchemaError::RegistryPoisoned)?;

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = model.to_string();
        let mut child: Option<String> = None;

        loop {
            if !seen.insert(current.clone()) {
                return Err(SchemaError::InheritanceCycle(current));
            }

            let def = match (definitions.get(&current), child) {
                (Some(def), _) => Arc::clone(def),
                (None, None) => return Err(SchemaError::UnknownModel(current)),
                (None, Some(child)) => {
                    return Err(SchemaError::UnknownParent {
                        model: child,
                        parent: current,
                    })
                }
            };

            child = Some(current);
            let parent = def.parent.clone();
            chain.push(def);

            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    fn resolve(&self, model: &str) -> SchemaResult<ModelSchema> {
        let chain = self.inheritance_chain(model)?;

        // A derived declaration replaces the inherited one in place;
        // key tables merge base first so the most derived entry wins.
        let mut decls: Vec<FieldDecl> = Vec::new();
        let mut key_table: BTreeMap<String, String> = BTreeMap::new();

        for def in &chain {
            for decl in &def.fields {
                match decls.iter_mut().find(|d| d.attribute == decl.attribute) {
                    Some(existing) => *existing = decl.clone(),
                    None => decls.push(decl.clone()),
                }
            }
            key_table.extend(def.json_keys.iter().map(|(a, k)| (a.clone(), k.clone())));
        }

        if let Some(attribute) = key_table
            .keys()
            .find(|attribute| !decls.iter().any(|d| &d.attribute == *attribute))
        {
            return Err(SchemaError::NotAField {
                model: model.to_string(),
                attribute: attribute.clone(),
            });
        }

        let shadow_columns: HashSet<String> = decls
            .iter()
            .filter(|d| d.type_tag == TypeTag::Reference)
            .flat_map(|d| [d.column(), format!("{}_id", d.attribute)])
            .collect();

        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(decls.len());

        for mut decl in decls {
            let explicit = decl
                .json_key
                .clone()
                .or_else(|| key_table.get(&decl.attribute).cloned());

            if decl.attribute.starts_with('_') && explicit.is_none() {
                continue;
            }

            if decl.type_tag != TypeTag::Reference
                && (shadow_columns.contains(&decl.attribute) || shadow_columns.contains(&decl.column()))
            {
                continue;
            }

            let json_key = explicit.unwrap_or_else(|| self.convention.apply(&decl.column()));

            if let Some(existing) = fields.iter().find(|f| f.json_key == json_key) {
                return Err(SchemaError::DuplicateJsonKey {
                    model: model.to_string(),
                    key: json_key,
                    first: existing.attribute.clone(),
                    second: decl.attribute,
                });
            }

            if decl.type_tag == TypeTag::Secret && decl.min_length.is_none() {
                decl.min_length = Some(self.min_secret_length);
            }

            fields.push(FieldDescriptor::from_decl(decl, json_key));
        }

        Ok(ModelSchema::new(model, fields))
    }
}
