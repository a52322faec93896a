//! Loaded models, keyed by corpus name.
//!
//! A registry is built once at startup (typically from a models directory) and handed by
//! reference to whatever serves queries. Models are shared behind `Arc`, so handlers can hold
//! on to one while the registry is replaced.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::canonical::CanonicalItems;
use crate::codec::{self, Format};
use crate::error::Result;
use crate::item::{OBJECT_TYPE_PREFIX, SUBJECT_TYPE_PREFIX};
use crate::tree::SchemaTree;

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<SchemaTree>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every snapshot file in `directory`, named `<corpus><suffix>`.
    ///
    /// Other files are skipped. A snapshot that fails to load fails the whole registry.
    pub fn load_dir(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let mut registry = Self::new();
        let mut entries: Vec<_> = std::fs::read_dir(directory)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            let file_name = entry.file_name();
            let Some((format, corpus)) = file_name.to_str().and_then(Format::parse_file_name) else {
                continue;
            };
            let tree = codec::load(entry.path())?;
            if let Some(previous) = registry.insert(corpus, tree) {
                warn!(corpus, ?format, nodes = previous.len(), "model replaced by a later snapshot");
            }
        }
        info!(directory = %directory.display(), models = registry.len(), "loaded model registry");
        Ok(registry)
    }

    /// Adds a model, returning the one it replaces.
    pub fn insert(&mut self, name: impl Into<String>, tree: SchemaTree) -> Option<Arc<SchemaTree>> {
        self.models.insert(name.into(), Arc::new(tree))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SchemaTree>> {
        self.models.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Builds the instance for a qualifier request against the model named after `property`.
    ///
    /// Subject and object types arrive without their prefixes. `None` if no model is named
    /// after the property.
    pub fn qualifier_instance<Q, S, O>(
        &self,
        property: &str,
        qualifiers: impl IntoIterator<Item = Q>,
        subject_types: impl IntoIterator<Item = S>,
        object_types: impl IntoIterator<Item = O>,
    ) -> Option<(&Arc<SchemaTree>, CanonicalItems)>
    where
        Q: AsRef<str>,
        S: AsRef<str>,
        O: AsRef<str>,
    {
        let tree = self.get(property)?;
        let types = subject_types
            .into_iter()
            .map(|name| format!("{SUBJECT_TYPE_PREFIX}{}", name.as_ref()))
            .chain(object_types.into_iter().map(|name| format!("{OBJECT_TYPE_PREFIX}{}", name.as_ref())));
        let instance = tree.build_instance(qualifiers, types);
        Some((tree, instance))
    }
}
