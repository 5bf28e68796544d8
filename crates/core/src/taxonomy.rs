use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier returned when nothing matched. Reserved; never part of a taxonomy file.
pub const OTHER_CATEGORY: &str = "other";
const OTHER_NAME: &str = "Other";
const OTHER_DESCRIPTION: &str = "Miscellaneous expenses";

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse taxonomy TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Category id must not be empty")]
    EmptyId,
    #[error("Category id '{0}' is reserved")]
    ReservedId(String),
    #[error("Duplicate category id '{0}'")]
    DuplicateId(String),
    #[error("Category '{0}' has no keywords")]
    NoKeywords(String),
    #[error("Invalid keyword pattern for '{0}': {1}")]
    Pattern(String, regex::Error),
}

/// One `[[category]]` entry as written in a taxonomy file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    category: Vec<CategoryDef>,
}

/// A category with its keyword set compiled into a single word-boundary matcher.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    #[serde(skip)]
    matcher: Regex,
}

impl Category {
    fn compile(def: CategoryDef) -> Result<Self, TaxonomyError> {
        let keywords: Vec<String> = def
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(TaxonomyError::NoKeywords(def.id));
        }
        let pattern = keywords
            .iter()
            .map(|k| format!(r"\b{}\b", regex::escape(k)))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!("(?i){pattern}"))
            .map_err(|e| TaxonomyError::Pattern(def.id.clone(), e))?;
        Ok(Category {
            id: def.id,
            name: def.name,
            description: def.description,
            keywords,
            matcher,
        })
    }

    /// Number of non-overlapping keyword matches in `text`.
    pub fn count_matches(&self, text: &str) -> usize {
        self.matcher.find_iter(text).count()
    }
}

/// Ordered category table. Declaration order is the tie-break order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTaxonomy {
    categories: Vec<Category>,
}

pub const DEFAULT_CATEGORIES: &[(&str, &str, &str, &[&str])] = &[
    (
        "food_dining",
        "Food & Dining",
        "Restaurants, groceries, and food delivery",
        &["restaurant", "cafe", "coffee", "food", "grocery", "meal", "uber eats", "doordash"],
    ),
    (
        "shopping",
        "Shopping",
        "Clothing, electronics, home goods",
        &["amazon", "walmart", "target", "store", "shop", "retail", "clothing"],
    ),
    (
        "transportation",
        "Transportation",
        "Public transit, fuel, car maintenance, ride-sharing",
        &["uber", "lyft", "taxi", "bus", "train", "subway", "gas", "parking"],
    ),
    (
        "bills_utilities",
        "Bills & Utilities",
        "Electricity, water, gas, internet, phone",
        &["electricity", "water", "gas", "internet", "phone", "utility", "bill"],
    ),
    (
        "entertainment",
        "Entertainment",
        "Movies, games, streaming services, hobbies",
        &["movie", "theatre", "concert", "netflix", "spotify", "game", "streaming"],
    ),
    (
        "health_fitness",
        "Health & Fitness",
        "Medical bills, medications, gym and fitness",
        &["gym", "doctor", "medical", "pharmacy", "fitness", "health"],
    ),
    (
        "travel",
        "Travel",
        "Flights, hotels, vacation expenses",
        &["hotel", "flight", "airline", "airbnb", "travel", "vacation"],
    ),
    (
        "education",
        "Education",
        "Tuition, books, courses, training",
        &["school", "university", "college", "course", "book", "tuition"],
    ),
];

impl CategoryTaxonomy {
    pub fn new(defs: Vec<CategoryDef>) -> Result<Self, TaxonomyError> {
        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(defs.len());
        for def in defs {
            let id = def.id.trim().to_string();
            if id.is_empty() {
                return Err(TaxonomyError::EmptyId);
            }
            if id.eq_ignore_ascii_case(OTHER_CATEGORY) {
                return Err(TaxonomyError::ReservedId(id));
            }
            if !seen.insert(id.clone()) {
                return Err(TaxonomyError::DuplicateId(id));
            }
            let def = CategoryDef { id, ..def };
            categories.push(Category::compile(def)?);
        }
        Ok(Self { categories })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = toml::from_str(toml_content)?;
        Self::new(file.category)
    }

    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let content = std::fs::read_to_string(path)?;
        let taxonomy = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            categories = taxonomy.len(),
            "Loaded category taxonomy"
        );
        Ok(taxonomy)
    }

    /// The built-in taxonomy, compiled once per process and shared read-only.
    pub fn builtin() -> Arc<CategoryTaxonomy> {
        static T: OnceLock<Arc<CategoryTaxonomy>> = OnceLock::new();
        let t = T.get_or_init(|| {
            let defs = DEFAULT_CATEGORIES
                .iter()
                .map(|(id, name, description, keywords)| CategoryDef {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                })
                .collect();
            Arc::new(CategoryTaxonomy::new(defs).expect("built-in taxonomy is valid"))
        });
        Arc::clone(t)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Whether `id` names a category or the reserved `other`.
    pub fn is_known(&self, id: &str) -> bool {
        id == OTHER_CATEGORY || self.get(id).is_some()
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        if id == OTHER_CATEGORY {
            return Some(OTHER_NAME);
        }
        self.get(id).map(|c| c.name.as_str())
    }

    /// `(id, description)` for every category followed by `other`, in order.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.categories
            .iter()
            .map(|c| (c.id.as_str(), c.description.as_str()))
            .chain(std::iter::once((OTHER_CATEGORY, OTHER_DESCRIPTION)))
            .collect()
    }
}
