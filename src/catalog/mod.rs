//! Static feature, filter and policy-text configuration consumed by the session.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_CATALOG_JSON: &str = include_str!("../../assets/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog defines no features")]
    Empty,
    #[error("duplicate feature name: {0}")]
    DuplicateFeature(String),
    #[error("duplicate filter name: {0}")]
    DuplicateFilter(String),
    #[error("instant feature {0} has no instant prompt")]
    MissingInstantPrompt(String),
    #[error("unknown feature: {0}")]
    FeatureNotFound(String),
    #[error("unknown filter: {0}")]
    FilterNotFound(String),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Edits around a clicked hotspot.
    Localized,
    /// Edits the whole image from a prompt.
    Global,
    /// Runs immediately with a built-in prompt.
    Instant,
    /// Text-to-image generation from a location description.
    Map,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 4] = [Self::Localized, Self::Global, Self::Instant, Self::Map];

    pub const fn requires_hotspot(self) -> bool {
        matches!(self, Self::Localized)
    }

    pub const fn requires_prompt(self) -> bool {
        !matches!(self, Self::Instant)
    }

    pub const fn edits_existing_image(self) -> bool {
        !matches!(self, Self::Map)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Localized => "localized",
            Self::Global => "global",
            Self::Instant => "instant",
            Self::Map => "map",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub sample_prompts: Vec<String>,
    pub kind: FeatureKind,
    pub system_instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instant_prompt: Option<String>,
    /// Artistic styles a map feature can be rendered in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
}

impl Feature {
    pub const fn runs_immediately(&self) -> bool {
        matches!(self.kind, FeatureKind::Instant)
    }

    /// Global and instant features apply to the whole image and never take a hotspot.
    pub const fn is_global(&self) -> bool {
        matches!(self.kind, FeatureKind::Global | FeatureKind::Instant)
    }

    pub fn default_style(&self) -> Option<&str> {
        self.styles.first().map(String::as_str)
    }

    pub fn offers_style(&self, style: &str) -> bool {
        self.styles.iter().any(|candidate| candidate == style)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub feature_names: Vec<String>,
}

#[derive(Deserialize)]
struct CatalogFile {
    filter_instruction: String,
    generative_layer: Feature,
    categories: Vec<CategoryFile>,
    #[serde(default)]
    filters: Vec<Filter>,
}

#[derive(Deserialize)]
struct CategoryFile {
    name: String,
    features: Vec<Feature>,
}

/// Feature definitions indexed by name, built once at load time.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    categories: Vec<Category>,
    features: Vec<Feature>,
    feature_index: HashMap<String, usize>,
    filters: Vec<Filter>,
    filter_index: HashMap<String, usize>,
    filter_instruction: String,
    generative_layer: Feature,
}

impl FeatureCatalog {
    pub fn builtin() -> CatalogResult<Self> {
        Self::from_json(BUILTIN_CATALOG_JSON)
    }

    pub fn load_from_path(path: &Path) -> CatalogResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> CatalogResult<Self> {
        let file: CatalogFile = serde_json::from_str(contents)?;
        Self::from_file(file)
    }

    fn from_file(file: CatalogFile) -> CatalogResult<Self> {
        let mut categories = Vec::with_capacity(file.categories.len());
        let mut features = Vec::new();
        let mut feature_index = HashMap::new();

        for category in file.categories {
            let mut feature_names = Vec::with_capacity(category.features.len());
            for feature in category.features {
                validate_feature(&feature)?;
                if feature_index.contains_key(&feature.name) {
                    return Err(CatalogError::DuplicateFeature(feature.name));
                }
                feature_index.insert(feature.name.clone(), features.len());
                feature_names.push(feature.name.clone());
                features.push(feature);
            }
            categories.push(Category {
                name: category.name,
                feature_names,
            });
        }

        if features.is_empty() {
            return Err(CatalogError::Empty);
        }
        validate_feature(&file.generative_layer)?;

        let mut filter_index = HashMap::new();
        for (position, filter) in file.filters.iter().enumerate() {
            if filter_index.insert(filter.name.clone(), position).is_some() {
                return Err(CatalogError::DuplicateFilter(filter.name.clone()));
            }
        }

        tracing::debug!(
            features = features.len(),
            filters = file.filters.len(),
            "feature catalog loaded"
        );

        Ok(Self {
            categories,
            features,
            feature_index,
            filters: file.filters,
            filter_index,
            filter_instruction: file.filter_instruction,
            generative_layer: file.generative_layer,
        })
    }

    pub fn feature(&self, name: &str) -> CatalogResult<&Feature> {
        self.feature_index
            .get(name)
            .map(|&position| &self.features[position])
            .ok_or_else(|| CatalogError::FeatureNotFound(name.to_string()))
    }

    pub fn filter(&self, name: &str) -> CatalogResult<&Filter> {
        self.filter_index
            .get(name)
            .map(|&position| &self.filters[position])
            .ok_or_else(|| CatalogError::FilterNotFound(name.to_string()))
    }

    /// First feature of the first category; selected when a session starts.
    pub fn default_feature(&self) -> &Feature {
        &self.features[0]
    }

    pub fn generative_layer(&self) -> &Feature {
        &self.generative_layer
    }

    pub fn filter_instruction(&self) -> &str {
        &self.filter_instruction
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

fn validate_feature(feature: &Feature) -> CatalogResult<()> {
    let has_prompt = feature
        .instant_prompt
        .as_deref()
        .is_some_and(|prompt| !prompt.trim().is_empty());
    if feature.runs_immediately() && !has_prompt {
        return Err(CatalogError::MissingInstantPrompt(feature.name.clone()));
    }
    Ok(())
}
