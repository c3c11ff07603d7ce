use crate::domain::ports::{TagMetadataStore, TagScope};
use crate::utils::error::{Result, SyncError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct TagFile {
    #[serde(default)]
    products: HashMap<String, String>,
    #[serde(default)]
    variations: HashMap<String, String>,
}

/// Tag metadata held in memory, optionally loaded from a TOML file:
///
/// ```toml
/// [products]
/// 101 = "Course-Jan"
///
/// [variations]
/// 2001 = "Size-L"
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTagMetadata {
    tags: HashMap<(TagScope, u64), String>,
}

impl InMemoryTagMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TagFile = toml::from_str(content).map_err(|e| SyncError::ConfigValidationError {
            field: "tag_metadata".to_string(),
            message: format!("TOML parsing error: {}", e),
        })?;

        let mut store = Self::new();
        for (scope, entries) in [
            (TagScope::Product, file.products),
            (TagScope::Variation, file.variations),
        ] {
            for (id, tag) in entries {
                let entity_id = id.trim().parse::<u64>().map_err(|_| {
                    SyncError::InvalidConfigValueError {
                        field: scope.meta_key().to_string(),
                        value: id.clone(),
                        reason: "Entity id must be a positive integer".to_string(),
                    }
                })?;
                store.set(scope, entity_id, tag);
            }
        }

        Ok(store)
    }

    /// Stores the trimmed tag; a blank tag removes the entry.
    pub fn set(&mut self, scope: TagScope, entity_id: u64, tag: impl Into<String>) {
        let tag = tag.into().trim().to_string();
        if tag.is_empty() {
            self.tags.remove(&(scope, entity_id));
        } else {
            self.tags.insert((scope, entity_id), tag);
        }
    }

    pub fn with_product_tag(mut self, product_id: u64, tag: impl Into<String>) -> Self {
        self.set(TagScope::Product, product_id, tag);
        self
    }

    pub fn with_variation_tag(mut self, variation_id: u64, tag: impl Into<String>) -> Self {
        self.set(TagScope::Variation, variation_id, tag);
        self
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl TagMetadataStore for InMemoryTagMetadata {
    fn tag(&self, scope: TagScope, entity_id: u64) -> Option<String> {
        self.tags.get(&(scope, entity_id)).cloned()
    }
}
