use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BookType {
    #[default]
    #[serde(rename = "fiction")]
    Fiction,
    #[serde(rename = "non-fiction")]
    NonFiction,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Length {
    ShortStory,
    Novella,
    #[default]
    Novel,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TargetAge {
    Children,
    YoungAdult,
    #[default]
    Adult,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    Light,
    #[default]
    Serious,
    Humorous,
    Dark,
}

// Wire strings shared by Display, FromStr and the serde renames above.
macro_rules! wire_enum {
    ($ty:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| anyhow!("Unknown {}: {}", stringify!($ty), s))
            }
        }
    };
}

wire_enum!(BookType { Fiction => "fiction", NonFiction => "non-fiction" });
wire_enum!(Length { ShortStory => "short-story", Novella => "novella", Novel => "novel" });
wire_enum!(TargetAge { Children => "children", YoungAdult => "young-adult", Adult => "adult" });
wire_enum!(Tone { Light => "light", Serious => "serious", Humorous => "humorous", Dark => "dark" });

/// User-selected inputs for one generation request. Never persisted on its
/// own, except as the "last used" entry in settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    #[serde(default)]
    pub book_type: BookType,
    #[serde(default = "default_genre")]
    pub genre: String,
    #[serde(default)]
    pub length: Length,
    #[serde(default)]
    pub target_age: TargetAge,
    #[serde(default)]
    pub tone: Tone,
}

fn default_genre() -> String {
    "Fantasy".to_string()
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            book_type: BookType::default(),
            genre: default_genre(),
            length: Length::default(),
            target_age: TargetAge::default(),
            tone: Tone::default(),
        }
    }
}

/// A generated book idea. Field names follow the persisted JSON documents.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookIdea {
    pub id: String,
    pub title: Vec<String>,
    pub genre: String,
    pub concept: String,
    pub main_character: String,
    pub setting: String,
    pub conflict: String,
    pub target_audience: TargetAge,
    pub opening_line: String,
    pub themes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl BookIdea {
    /// The first candidate title, used as a headline.
    pub fn headline(&self) -> &str {
        self.title.first().map(String::as_str).unwrap_or("Untitled")
    }

    /// Lowercased text of every searchable field, space separated.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.title.len() + self.themes.len() + 5);
        parts.extend(self.title.iter().map(String::as_str));
        parts.push(&self.genre);
        parts.push(&self.concept);
        parts.push(&self.main_character);
        parts.push(&self.setting);
        parts.push(&self.conflict);
        parts.extend(self.themes.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }
}

impl fmt::Display for BookIdea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.headline(), self.genre)?;
        for alt in self.title.iter().skip(1) {
            writeln!(f, "  also: {}", alt)?;
        }
        writeln!(f, "Concept: {}", self.concept)?;
        writeln!(f, "Main character: {}", self.main_character)?;
        writeln!(f, "Setting: {}", self.setting)?;
        writeln!(f, "Conflict: {}", self.conflict)?;
        writeln!(f, "Audience: {}", self.target_audience)?;
        writeln!(f, "Opening line: {}", self.opening_line)?;
        write!(f, "Themes: {}", self.themes.join(", "))
    }
}
