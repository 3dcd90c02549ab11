//! Collision-free type names along a field path.
//!
//! A [`NameGenerator`] owns the [`NameRegistry`] of one compilation. Names are
//! registered before they are returned, so later requests in the same run always
//! see them.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NamingError;

// ————————————————————————————————————————————————————————————————————————————
// STRATEGY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationRule {
    /// `["sample", "manager", "name"]` → `Name`
    #[default]
    LastSegment,
    /// `["sample", "manager", "name"]` → `SampleManagerName`
    FullPath,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRule {
    /// Parent segment + candidate: `ManagerName`.
    #[default]
    ParentPrefix,
    /// Every segment: `SampleManagerName`.
    FullPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessRule {
    Prefix(String),
    Suffix(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Append the smallest free positive integer.
    #[default]
    Suffix,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingStrategy {
    pub generation: GenerationRule,
    pub fallback: FallbackRule,
    pub post_process: Vec<PostProcessRule>,
    pub on_overlap: OverlapPolicy,
    /// Registering `X` also reserves `X{wire_suffix}` for the wire twin.
    pub wire_suffix: String,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        NamingStrategy {
            generation: GenerationRule::default(),
            fallback: FallbackRule::default(),
            post_process: Vec::new(),
            on_overlap: OverlapPolicy::default(),
            wire_suffix: "Raw".to_string(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

/// Type names emitted so far in one compilation.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: HashSet<String>,
}

impl NameRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn insert(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GENERATOR
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    strategy: NamingStrategy,
    registry: NameRegistry,
}

impl NameGenerator {
    pub fn new(strategy: NamingStrategy) -> Self {
        NameGenerator { strategy, registry: NameRegistry::default() }
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn wire_name(&self, name: &str) -> String {
        format!("{name}{}", self.strategy.wire_suffix)
    }

    /// A fresh, registered type name for the field at `path`.
    pub fn generate(&mut self, path: &[String]) -> Result<String, NamingError> {
        let Some(last) = path.last() else {
            return Err(NamingError::EmptyPath);
        };

        let candidate = match self.strategy.generation {
            GenerationRule::LastSegment => self.finish(&type_word(last)),
            GenerationRule::FullPath => self.finish(&join_pascal(path)),
        };
        if self.is_free(&candidate) {
            return Ok(self.register(candidate));
        }

        if path.len() < 2 {
            return Err(NamingError::RootCollision { name: candidate });
        }
        let fallback = match self.strategy.fallback {
            FallbackRule::ParentPrefix => {
                let parent = &path[path.len() - 2];
                self.finish(&format!("{}{}", type_word(parent), type_word(last)))
            }
            FallbackRule::FullPath => self.finish(&join_pascal(path)),
        };
        if self.is_free(&fallback) {
            tracing::debug!(%candidate, %fallback, "type name taken, using parent prefix");
            return Ok(self.register(fallback));
        }

        if self.strategy.on_overlap == OverlapPolicy::Fail {
            return Err(NamingError::Overlap { name: fallback, path: path.join(".") });
        }
        let numbered = (1u64..)
            .map(|n| format!("{fallback}{n}"))
            .find(|name| self.is_free(name))
            .unwrap_or_default();
        tracing::warn!(%fallback, %numbered, path = %path.join("."), "type name overlaps, numbering");
        Ok(self.register(numbered))
    }

    fn finish(&self, base: &str) -> String {
        let mut name = base.to_string();
        for rule in &self.strategy.post_process {
            match rule {
                PostProcessRule::Prefix(p) => name = format!("{}{name}", pascal_case(p)),
                PostProcessRule::Suffix(s) => name = format!("{name}{}", pascal_case(s)),
            }
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) { format!("_{name}") } else { name }
    }

    fn is_free(&self, name: &str) -> bool {
        !self.registry.contains(name) && !self.registry.contains(&self.wire_name(name))
    }

    fn register(&mut self, name: String) -> String {
        self.registry.insert(&name);
        let wire = self.wire_name(&name);
        self.registry.insert(&wire);
        tracing::debug!(%name, "registered type name");
        name
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CASE HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Name given to a field whose name has no letters or digits at all.
const UNNAMED: &str = "Unnamed";

static WORD_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"));

/// `first_name` → `FirstName`, `dateNano` → `DateNano`, `@timestamp` → `Timestamp`.
///
/// Anything that is not a letter or digit separates words, and only the first
/// letter of each word changes. `heck::ToPascalCase` would also lowercase the
/// rest of each word (`dateNano` → `Datenano`, `HTTPCode` → `HttpCode`), which
/// loses the field's own casing in the type name.
pub fn pascal_case(s: &str) -> String {
    WORD_DELIMITER
        .split(s)
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// [`pascal_case`] of one path segment, never empty.
fn type_word(segment: &str) -> String {
    let word = pascal_case(segment);
    if word.is_empty() { UNNAMED.to_string() } else { word }
}

fn join_pascal(path: &[String]) -> String {
    path.iter().map(|s| type_word(s)).collect()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
