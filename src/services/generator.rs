use chrono::Utc;
use rand::prelude::IndexedRandom;
use rand::seq::index;
use rand::Rng;

use crate::core::config::GeneratorConfig;
use crate::core::idea::{BookIdea, BookType, GeneratorOptions};
use crate::services::catalog::{Catalog, FictionTemplate, NonfictionTemplate, NONFICTION_THEMES};

/// Attempts at a not-yet-used title before a duplicate is accepted.
const MAX_UNIQUE_TITLE_ATTEMPTS: usize = 16;

const NONFICTION_THEME_COUNT: usize = 3;

const NONFICTION_CHALLENGE: &str = "Main challenge: Implementing lasting change while overcoming common obstacles and maintaining motivation";

const NONFICTION_OPENING_LINES: [&str; 10] = [
    "What if I told you that {topic} is not only possible, but inevitable with the right approach?",
    "The journey to {topic} begins with a single realization: you have more power than you think.",
    "After studying thousands of people who successfully mastered {topic}, I discovered a pattern.",
    "Everything you think you know about {topic} is about to change.",
    "The secret to {topic} isn't what most people think. It's actually much simpler.",
    "Imagine if {topic} became as natural as breathing. This book will show you how.",
    "The difference between those who achieve {topic} and those who struggle isn't talent. It's strategy.",
    "What if the biggest obstacle to {topic} isn't external, but the stories we tell ourselves?",
    "The path to {topic} has been mapped by science, tested by experience, and proven by results.",
    "Your relationship with {topic} is about to transform in ways you never imagined possible.",
];

/// Turns `GeneratorOptions` into `BookIdea`s by sampling catalog content.
/// The catalog is only ever read.
pub struct IdeaGenerator<'a> {
    catalog: &'a Catalog,
    title_count: usize,
}

impl<'a> IdeaGenerator<'a> {
    pub fn new(catalog: &'a Catalog, config: &GeneratorConfig) -> Self {
        Self {
            catalog,
            title_count: config.title_count.max(1),
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn generate(&self, options: &GeneratorOptions) -> BookIdea {
        self.generate_with(options, &mut rand::rng())
    }

    pub fn generate_many(&self, options: &GeneratorOptions, count: usize) -> Vec<BookIdea> {
        let mut rng = rand::rng();
        (0..count).map(|_| self.generate_with(options, &mut rng)).collect()
    }

    /// Same as `generate`, drawing every random choice from `rng`.
    pub fn generate_with<R: Rng + ?Sized>(&self, options: &GeneratorOptions, rng: &mut R) -> BookIdea {
        match options.book_type {
            BookType::Fiction => {
                let (template, _) = self.catalog.fiction.resolve(&options.genre);
                self.fiction_idea(template, options, rng)
            }
            BookType::NonFiction => {
                let (template, _) = self.catalog.non_fiction.resolve(&options.genre);
                self.nonfiction_idea(template, options, rng)
            }
        }
    }

    /// True when the options name a genre offered for their book type.
    pub fn validate_options(&self, options: &GeneratorOptions) -> bool {
        self.catalog.is_known_genre(options.book_type, &options.genre)
    }

    fn fiction_idea<R: Rng + ?Sized>(
        &self,
        template: &FictionTemplate,
        options: &GeneratorOptions,
        rng: &mut R,
    ) -> BookIdea {
        let concept = pick(&template.concepts, rng);
        let character = pick(&template.characters, rng);
        let setting = pick(&template.settings, rng);
        let conflict = pick(&template.conflicts, rng);
        let theme_count = rng.random_range(2..=4);
        let themes = sample_distinct(&template.themes, theme_count, rng);
        let opening_line = pick(&template.opening_lines, rng);
        let title = self.titles(BookType::Fiction, &template.title_patterns, rng);

        let concept = format!(
            "{} The story follows {} in {}, where {}.",
            concept,
            character,
            setting,
            lower_first(&conflict)
        );

        BookIdea {
            id: new_id(rng),
            title,
            genre: options.genre.clone(),
            concept,
            main_character: character,
            setting,
            conflict,
            target_audience: options.target_age,
            opening_line,
            themes,
            generated_at: Utc::now(),
        }
    }

    fn nonfiction_idea<R: Rng + ?Sized>(
        &self,
        template: &NonfictionTemplate,
        options: &GeneratorOptions,
        rng: &mut R,
    ) -> BookIdea {
        let topic = pick(&template.topics, rng);
        let approach = pick(&template.approaches, rng);
        let audience = pick(&template.target_audiences, rng);
        let format = pick(&template.formats, rng);
        let title = self.titles(BookType::NonFiction, &template.title_patterns, rng);

        let opening_line = NONFICTION_OPENING_LINES
            .choose(rng)
            .map(|line| line.replace("{topic}", &lower_first(&topic)))
            .unwrap_or_default();
        let themes = sample_distinct(&NONFICTION_THEMES, NONFICTION_THEME_COUNT, rng);

        BookIdea {
            id: new_id(rng),
            title,
            genre: options.genre.clone(),
            concept: format!(
                "{}. {} This book uses {} to help readers achieve lasting change.",
                topic,
                approach,
                lower_first(&format)
            ),
            main_character: format!("Target reader: {}", audience),
            setting: format!("Format: {}", format),
            conflict: NONFICTION_CHALLENGE.to_string(),
            target_audience: options.target_age,
            opening_line,
            themes,
            generated_at: Utc::now(),
        }
    }

    /// Renders `title_count` titles. Patterns are used without replacement
    /// first; once they run out they are reused, and if no unused rendering
    /// turns up within a few attempts a duplicate title is accepted.
    fn titles<R: Rng + ?Sized>(&self, book_type: BookType, patterns: &[String], rng: &mut R) -> Vec<String> {
        if patterns.is_empty() {
            return vec!["Untitled".to_string()];
        }

        let dict = &self.catalog.variables;
        let mut titles: Vec<String> = Vec::with_capacity(self.title_count);

        for i in index::sample(rng, patterns.len(), patterns.len()).iter() {
            if titles.len() == self.title_count {
                break;
            }
            let title = dict.fill(book_type, &patterns[i], rng);
            if !titles.contains(&title) {
                titles.push(title);
            }
        }

        while titles.len() < self.title_count {
            let mut candidate = String::new();
            for _ in 0..MAX_UNIQUE_TITLE_ATTEMPTS {
                candidate = dict.fill(book_type, &pick(patterns, rng), rng);
                if !titles.contains(&candidate) {
                    break;
                }
            }
            titles.push(candidate);
        }

        titles
    }
}

fn pick<T: AsRef<str>, R: Rng + ?Sized>(pool: &[T], rng: &mut R) -> String {
    pool.choose(rng)
        .map(|s| {
            let s: &str = s.as_ref();
            s.to_string()
        })
        .unwrap_or_default()
}

/// Up to `amount` distinct values from `pool`, uniformly without replacement.
fn sample_distinct<T: AsRef<str>, R: Rng + ?Sized>(pool: &[T], amount: usize, rng: &mut R) -> Vec<String> {
    let mut unique: Vec<&str> = Vec::with_capacity(pool.len());
    for value in pool {
        if !unique.contains(&value.as_ref()) {
            unique.push(value.as_ref());
        }
    }
    index::sample(rng, unique.len(), amount.min(unique.len()))
        .iter()
        .map(|i| unique[i].to_string())
        .collect()
}

fn new_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
