//! Sync profiles
//!
//! A profile narrows the scanned file set before it reaches the engine.
//! Precedence is explicit exclude, then explicit include, then category.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::file::{Category, TrackedFile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: BTreeSet<Category>,
    /// Relative paths always included, regardless of category.
    #[serde(default)]
    pub include: BTreeSet<String>,
    /// Relative paths always excluded.
    #[serde(default)]
    pub exclude: BTreeSet<String>,
}

impl SyncProfile {
    pub fn new(name: impl Into<String>, categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            categories: categories.into_iter().collect(),
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn including(mut self, relative_path: impl Into<String>) -> Self {
        self.include.insert(relative_path.into());
        self
    }

    pub fn excluding(mut self, relative_path: impl Into<String>) -> Self {
        self.exclude.insert(relative_path.into());
        self
    }

    pub fn includes(&self, file: &TrackedFile) -> bool {
        if self.exclude.contains(&file.relative_path) {
            return false;
        }
        if self.include.contains(&file.relative_path) {
            return true;
        }
        self.categories.contains(&file.category)
    }

    pub fn full() -> Self {
        Self::new("Full", Category::ALL).with_description("Every discovered configuration file")
    }

    pub fn minimal() -> Self {
        Self::new("Minimal", [Category::Shell, Category::Git])
            .with_description("Shell and git essentials")
    }

    pub fn work() -> Self {
        Self::new(
            "Work",
            [
                Category::Shell,
                Category::Git,
                Category::Editor,
                Category::Cloud,
                Category::Docker,
                Category::Language,
                Category::Assistant,
            ],
        )
        .with_description("Development and cloud tooling")
    }

    pub fn home() -> Self {
        Self::new(
            "Home",
            [
                Category::Shell,
                Category::Git,
                Category::Editor,
                Category::Custom,
                Category::Documentation,
            ],
        )
        .with_description("Personal shell and editor setup")
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::full(), Self::minimal(), Self::work(), Self::home()]
    }

    /// Look up a built-in profile by case-insensitive name.
    pub fn builtin_named(name: &str) -> Option<Self> {
        Self::builtin()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
