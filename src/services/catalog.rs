use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::core::idea::BookType;
use crate::services::dictionary::VariableDictionary;
use crate::utils::text::normalize_key;

const FICTION_TEMPLATES_JSON: &str = include_str!("../../data/fiction-templates.json");
const NONFICTION_TEMPLATES_JSON: &str = include_str!("../../data/nonfiction-templates.json");
const TITLE_VARIABLES_JSON: &str = include_str!("../../data/title-variables.json");

pub const DEFAULT_FICTION_GENRE: &str = "romance";
pub const DEFAULT_NONFICTION_GENRE: &str = "self_help";

/// Themes offered for every non-fiction idea.
pub const NONFICTION_THEMES: [&str; 6] = [
    "Personal transformation",
    "Evidence-based strategies",
    "Practical implementation",
    "Sustainable change",
    "Expert insights",
    "Real-world application",
];

pub trait GenreTemplate {
    fn name(&self) -> &str;
    /// Named content pools, checked for emptiness at load time.
    fn pools(&self) -> Vec<(&'static str, &[String])>;
    /// Template-specific checks run after the pools are known to be non-empty.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Fiction ideas carry between 2 and 4 distinct themes.
pub const MIN_FICTION_THEMES: usize = 2;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FictionTemplate {
    pub name: String,
    pub concepts: Vec<String>,
    pub characters: Vec<String>,
    pub settings: Vec<String>,
    pub conflicts: Vec<String>,
    pub themes: Vec<String>,
    pub opening_lines: Vec<String>,
    pub title_patterns: Vec<String>,
}

impl GenreTemplate for FictionTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn pools(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("concepts", self.concepts.as_slice()),
            ("characters", self.characters.as_slice()),
            ("settings", self.settings.as_slice()),
            ("conflicts", self.conflicts.as_slice()),
            ("themes", self.themes.as_slice()),
            ("openingLines", self.opening_lines.as_slice()),
            ("titlePatterns", self.title_patterns.as_slice()),
        ]
    }

    fn check(&self) -> Result<()> {
        let distinct: HashSet<&str> = self.themes.iter().map(String::as_str).collect();
        if distinct.len() < MIN_FICTION_THEMES {
            bail!(
                "Genre '{}' needs at least {} distinct themes",
                self.name,
                MIN_FICTION_THEMES
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NonfictionTemplate {
    pub name: String,
    pub topics: Vec<String>,
    pub approaches: Vec<String>,
    pub target_audiences: Vec<String>,
    pub formats: Vec<String>,
    pub title_patterns: Vec<String>,
}

impl GenreTemplate for NonfictionTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn pools(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("topics", self.topics.as_slice()),
            ("approaches", self.approaches.as_slice()),
            ("targetAudiences", self.target_audiences.as_slice()),
            ("formats", self.formats.as_slice()),
            ("titlePatterns", self.title_patterns.as_slice()),
        ]
    }
}

#[derive(Deserialize)]
struct TemplateFile<T> {
    genres: Vec<T>,
}

/// Templates for one book type, in file order, indexed by normalized name.
#[derive(Debug)]
pub struct GenreTable<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
    default_key: &'static str,
}

impl<T: GenreTemplate + DeserializeOwned> GenreTable<T> {
    fn from_json(json: &str, default_key: &'static str) -> Result<Self> {
        let file: TemplateFile<T> = serde_json::from_str(json)?;
        let mut index = HashMap::new();

        for (i, template) in file.genres.iter().enumerate() {
            let key = normalize_key(template.name());
            if key.is_empty() {
                bail!("Genre #{} has an empty name", i + 1);
            }
            for (pool, values) in template.pools() {
                if values.is_empty() {
                    bail!("Genre '{}' has an empty {} pool", template.name(), pool);
                }
            }
            template.check()?;
            if index.insert(key, i).is_some() {
                bail!("Duplicate genre '{}'", template.name());
            }
        }

        if !index.contains_key(default_key) {
            bail!("Default genre '{}' is missing", default_key);
        }

        Ok(Self {
            entries: file.genres,
            index,
            default_key,
        })
    }

    pub fn get(&self, genre: &str) -> Option<&T> {
        self.index.get(&normalize_key(genre)).map(|&i| &self.entries[i])
    }

    /// The template for `genre`, or the default template when the genre is
    /// unknown. The flag is true when the default was substituted.
    pub fn resolve(&self, genre: &str) -> (&T, bool) {
        match self.get(genre) {
            Some(template) => (template, false),
            None => {
                log::debug!("Unknown genre '{}', using '{}'", genre, self.default_key);
                (&self.entries[self.index[self.default_key]], true)
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

/// Read-only content the generator draws from.
#[derive(Debug)]
pub struct Catalog {
    pub fiction: GenreTable<FictionTemplate>,
    pub non_fiction: GenreTable<NonfictionTemplate>,
    pub variables: VariableDictionary,
}

static BUILTIN: OnceLock<std::result::Result<Catalog, String>> = OnceLock::new();

impl Catalog {
    pub fn from_json(fiction: &str, non_fiction: &str, variables: &str) -> Result<Self> {
        Ok(Self {
            fiction: GenreTable::from_json(fiction, DEFAULT_FICTION_GENRE)
                .context("Invalid fiction templates")?,
            non_fiction: GenreTable::from_json(non_fiction, DEFAULT_NONFICTION_GENRE)
                .context("Invalid non-fiction templates")?,
            variables: VariableDictionary::from_json(variables)?,
        })
    }

    /// The catalog embedded in the binary, parsed on first use.
    pub fn builtin() -> Result<&'static Catalog> {
        let loaded = BUILTIN.get_or_init(|| {
            Catalog::from_json(
                FICTION_TEMPLATES_JSON,
                NONFICTION_TEMPLATES_JSON,
                TITLE_VARIABLES_JSON,
            )
            .map_err(|e| format!("{:#}", e))
        });
        loaded.as_ref().map_err(|e| anyhow!("Built-in catalog is invalid: {}", e))
    }

    /// Display names of the genres offered for `book_type`.
    pub fn genres_for(&self, book_type: BookType) -> Vec<&str> {
        match book_type {
            BookType::Fiction => self.fiction.names(),
            BookType::NonFiction => self.non_fiction.names(),
        }
    }

    pub fn is_known_genre(&self, book_type: BookType, genre: &str) -> bool {
        match book_type {
            BookType::Fiction => self.fiction.get(genre).is_some(),
            BookType::NonFiction => self.non_fiction.get(genre).is_some(),
        }
    }

    pub fn recommended_themes(&self, genre: &str, book_type: BookType) -> Vec<String> {
        match book_type {
            BookType::Fiction => self.fiction.resolve(genre).0.themes.clone(),
            BookType::NonFiction => NONFICTION_THEMES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::text::placeholders;

    #[test]
    fn test_builtin_catalog_loads() -> Result<()> {
        let catalog = Catalog::builtin()?;
        assert_eq!(
            catalog.genres_for(BookType::Fiction),
            vec!["Romance", "Mystery", "Fantasy", "Science Fiction", "Thriller", "Horror"]
        );
        assert_eq!(catalog.genres_for(BookType::NonFiction), vec!["Self-Help", "Business"]);
        Ok(())
    }

    #[test]
    fn test_every_builtin_placeholder_is_resolvable() -> Result<()> {
        let catalog = Catalog::builtin()?;
        let fiction = catalog
            .fiction
            .iter()
            .flat_map(|t| t.title_patterns.iter().map(|p| (BookType::Fiction, p)));
        let non_fiction = catalog
            .non_fiction
            .iter()
            .flat_map(|t| t.title_patterns.iter().map(|p| (BookType::NonFiction, p)));

        for (book_type, pattern) in fiction.chain(non_fiction) {
            for name in placeholders(pattern) {
                assert!(
                    catalog.variables.contains(book_type, name),
                    "'{}' in '{}' has no dictionary entry",
                    name,
                    pattern
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_lookup_normalizes_genre() -> Result<()> {
        let catalog = Catalog::builtin()?;
        assert_eq!(catalog.fiction.get("science-fiction").map(|t| t.name.as_str()), Some("Science Fiction"));
        assert_eq!(catalog.non_fiction.get("SELF HELP").map(|t| t.name.as_str()), Some("Self-Help"));
        assert!(catalog.is_known_genre(BookType::Fiction, " fantasy "));
        assert!(!catalog.is_known_genre(BookType::NonFiction, "Fantasy"));
        Ok(())
    }

    #[test]
    fn test_unknown_genre_resolves_to_default() -> Result<()> {
        let catalog = Catalog::builtin()?;
        let (template, fell_back) = catalog.fiction.resolve("Cyberpunk Western");
        assert!(fell_back);
        assert_eq!(template.name, "Romance");

        let (template, fell_back) = catalog.non_fiction.resolve("Cooking");
        assert!(fell_back);
        assert_eq!(template.name, "Self-Help");

        let (_, fell_back) = catalog.fiction.resolve("Horror");
        assert!(!fell_back);
        Ok(())
    }

    #[test]
    fn test_recommended_themes() -> Result<()> {
        let catalog = Catalog::builtin()?;
        let fantasy = catalog.recommended_themes("Fantasy", BookType::Fiction);
        assert!(fantasy.contains(&"Found family".to_string()));
        assert_eq!(catalog.recommended_themes("Business", BookType::NonFiction).len(), 6);
        Ok(())
    }

    #[test]
    fn test_missing_default_genre_is_rejected() {
        let fiction = r#"{"genres": [{"name": "Mystery", "concepts": ["c"], "characters": ["c"],
            "settings": ["s"], "conflicts": ["c"], "themes": ["t"], "openingLines": ["o"],
            "titlePatterns": ["p"]}]}"#;
        let err = Catalog::from_json(fiction, NONFICTION_TEMPLATES_JSON, TITLE_VARIABLES_JSON)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("romance"));
    }

    #[test]
    fn test_fiction_genre_needs_two_distinct_themes() {
        let fiction = r#"{"genres": [{"name": "Romance", "concepts": ["c"], "characters": ["c"],
            "settings": ["s"], "conflicts": ["c"], "themes": ["t", "t"], "openingLines": ["o"],
            "titlePatterns": ["p"]}]}"#;
        let err = Catalog::from_json(fiction, NONFICTION_TEMPLATES_JSON, TITLE_VARIABLES_JSON)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("at least 2 distinct themes"));
    }

    #[test]
    fn test_every_builtin_fiction_genre_has_enough_themes() -> Result<()> {
        let catalog = Catalog::builtin()?;
        for template in catalog.fiction.iter() {
            let distinct: HashSet<&str> = template.themes.iter().map(String::as_str).collect();
            assert!(distinct.len() >= MIN_FICTION_THEMES, "{}", template.name);
        }
        Ok(())
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let fiction = r#"{"genres": [{"name": "Romance", "concepts": [], "characters": ["c"],
            "settings": ["s"], "conflicts": ["c"], "themes": ["t"], "openingLines": ["o"],
            "titlePatterns": ["p"]}]}"#;
        let err = Catalog::from_json(fiction, NONFICTION_TEMPLATES_JSON, TITLE_VARIABLES_JSON)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("empty concepts pool"));
    }
}
