use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, InquireError, Select, Text};
use std::fmt;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::idea::{BookIdea, BookType, GeneratorOptions, Length, TargetAge, Tone};
use crate::services::generator::IdeaGenerator;
use crate::services::store::IdeaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Generate,
    Favorites,
    History,
    Search,
    ByGenre,
    ByAudience,
    Export,
    Import,
    Backup,
    Restore,
    Stats,
    ClearFavorites,
    ClearHistory,
    Quit,
}

impl Action {
    const ALL: [Action; 14] = [
        Action::Generate,
        Action::Favorites,
        Action::History,
        Action::Search,
        Action::ByGenre,
        Action::ByAudience,
        Action::Export,
        Action::Import,
        Action::Backup,
        Action::Restore,
        Action::Stats,
        Action::ClearFavorites,
        Action::ClearHistory,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Generate => "Generate a new idea",
            Action::Favorites => "Browse favorites",
            Action::History => "Show history",
            Action::Search => "Search ideas",
            Action::ByGenre => "Favorites by genre",
            Action::ByAudience => "Favorites by audience",
            Action::Export => "Export favorites to a file",
            Action::Import => "Import favorites from a file",
            Action::Backup => "Back up everything to a file",
            Action::Restore => "Restore from a backup file",
            Action::Stats => "Storage statistics",
            Action::ClearFavorites => "Clear favorites",
            Action::ClearHistory => "Clear history",
            Action::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Interactive terminal front-end over a generator and a store.
pub struct Menu<'a> {
    config: &'a Config,
    generator: &'a IdeaGenerator<'a>,
    store: &'a IdeaStore,
}

impl<'a> Menu<'a> {
    pub fn new(config: &'a Config, generator: &'a IdeaGenerator<'a>, store: &'a IdeaStore) -> Self {
        Self {
            config,
            generator,
            store,
        }
    }

    /// Generates one idea from the configured defaults, prints it and
    /// records it in history.
    pub async fn run_unattended(&self) -> Result<()> {
        let options = &self.config.defaults;
        if !self.generator.validate_options(options) {
            log::warn!(
                "Genre '{}' is not offered for {}, the default template will be used",
                options.genre,
                options.book_type
            );
        }

        let idea = self.generate(options).await?;
        println!("{}", idea);
        self.store.add_to_history(&idea).await;
        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        if !self.store.is_available().await {
            println!("Warning: storage is not available, nothing will be saved.");
        }

        loop {
            let action = match Select::new("What would you like to do?", Action::ALL.to_vec())
                .with_page_size(Action::ALL.len())
                .prompt()
            {
                Ok(action) => action,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
                Err(e) => return Err(e.into()),
            };

            if action == Action::Quit {
                break;
            }

            if let Err(e) = self.dispatch(action).await {
                match e.downcast_ref::<InquireError>() {
                    Some(InquireError::OperationInterrupted) => break,
                    Some(InquireError::OperationCanceled) => continue,
                    _ => println!("Error: {:#}", e),
                }
            }
        }

        println!("Goodbye.");
        Ok(())
    }

    async fn dispatch(&self, action: Action) -> Result<()> {
        match action {
            Action::Generate => self.generate_interactive().await,
            Action::Favorites => self.browse_favorites().await,
            Action::History => {
                print_list("History", &self.store.get_history().await);
                Ok(())
            }
            Action::Search => self.search().await,
            Action::ByGenre => self.by_genre().await,
            Action::ByAudience => self.by_audience().await,
            Action::Export => self.export().await,
            Action::Import => self.import().await,
            Action::Backup => self.backup().await,
            Action::Restore => self.restore().await,
            Action::Stats => {
                let stats = self.store.get_storage_stats().await;
                println!("Favorites: {}/{}", stats.favorites, stats.max_favorites);
                println!("History:   {}/{}", stats.history, stats.max_history);
                println!("Used:      {} bytes", stats.storage_used);
                println!("Available: {}", if stats.storage_available { "yes" } else { "no" });
                Ok(())
            }
            Action::ClearFavorites => {
                if Confirm::new("Remove every favorite?").with_default(false).prompt()? {
                    self.store.clear_favorites().await?;
                    println!("Favorites cleared.");
                }
                Ok(())
            }
            Action::ClearHistory => {
                if Confirm::new("Remove all history?").with_default(false).prompt()? {
                    self.store.clear_history().await?;
                    println!("History cleared.");
                }
                Ok(())
            }
            Action::Quit => Ok(()),
        }
    }

    async fn generate(&self, options: &GeneratorOptions) -> Result<BookIdea> {
        let delay = self.config.generator.delay_ms;
        if delay > 0 {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message("Sparking an idea...");
            pb.enable_steady_tick(Duration::from_millis(80));
            tokio::time::sleep(Duration::from_millis(delay)).await;
            pb.finish_and_clear();
        }
        Ok(self.generator.generate(options))
    }

    async fn generate_interactive(&self) -> Result<()> {
        let last = self
            .store
            .last_options()
            .await
            .unwrap_or_else(|| self.config.defaults.clone());
        let options = self.prompt_options(&last)?;

        let idea = self.generate(&options).await?;
        println!("\n{}\n", idea);

        if let Err(e) = self.store.remember_options(&options).await {
            log::warn!("Failed to remember options: {}", e);
        }
        self.store.add_to_history(&idea).await;

        if Confirm::new("Save to favorites?").with_default(true).prompt()? {
            match self.store.save_favorite(&idea).await {
                Ok(()) => println!("Saved \"{}\".", idea.headline()),
                Err(e) => println!("Could not save: {}", e),
            }
        }
        Ok(())
    }

    fn prompt_options(&self, last: &GeneratorOptions) -> Result<GeneratorOptions> {
        let book_type = choose("Book type:", BookType::ALL, last.book_type)?;

        let genres: Vec<String> = self
            .generator
            .catalog()
            .genres_for(book_type)
            .into_iter()
            .map(str::to_string)
            .collect();
        let cursor = genres
            .iter()
            .position(|g| g.eq_ignore_ascii_case(&last.genre))
            .unwrap_or(0);
        let genre = Select::new("Genre:", genres)
            .with_starting_cursor(cursor)
            .prompt()?;

        Ok(GeneratorOptions {
            book_type,
            genre,
            length: choose("Length:", Length::ALL, last.length)?,
            target_age: choose("Target age:", TargetAge::ALL, last.target_age)?,
            tone: choose("Tone:", Tone::ALL, last.tone)?,
        })
    }

    async fn browse_favorites(&self) -> Result<()> {
        let favorites = self.store.get_favorites().await;
        if favorites.is_empty() {
            println!("No favorites yet.");
            return Ok(());
        }

        let choices: Vec<IdeaChoice> = favorites.into_iter().map(IdeaChoice).collect();
        let IdeaChoice(idea) = Select::new("Favorites:", choices).prompt()?;
        println!("\n{}\n", idea);

        if Confirm::new("Remove from favorites?").with_default(false).prompt()? {
            self.store.remove_favorite(&idea.id).await?;
            println!("Removed.");
        }
        Ok(())
    }

    async fn search(&self) -> Result<()> {
        let query = Text::new("Search for:").prompt()?;
        let include_history = Confirm::new("Include history?").with_default(false).prompt()?;
        let results = self.store.search_ideas(&query, include_history).await;
        print_list(&format!("Results for \"{}\"", query.trim()), &results);
        Ok(())
    }

    async fn by_genre(&self) -> Result<()> {
        let catalog = self.generator.catalog();
        let genres: Vec<&str> = catalog
            .genres_for(BookType::Fiction)
            .into_iter()
            .chain(catalog.genres_for(BookType::NonFiction))
            .collect();
        let genre = Select::new("Genre:", genres).prompt()?;
        print_list(genre, &self.store.get_ideas_by_genre(genre).await);
        Ok(())
    }

    async fn by_audience(&self) -> Result<()> {
        let audience = Select::new("Audience:", TargetAge::ALL.to_vec()).prompt()?;
        print_list(
            audience.as_str(),
            &self.store.get_ideas_by_audience(audience.as_str()).await,
        );
        Ok(())
    }

    async fn export(&self) -> Result<()> {
        let path = Text::new("Export to:")
            .with_default("bookspark-favorites.json")
            .prompt()?;
        let content = self.store.export_favorites().await;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path))?;
        println!("Favorites exported to {}", path);
        Ok(())
    }

    async fn import(&self) -> Result<()> {
        let path = Text::new("Import from:")
            .with_default("bookspark-favorites.json")
            .prompt()?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;

        let report = self.store.import_favorites(&content).await;
        println!("Imported {} ideas.", report.imported);
        print_problems(&report.errors);
        Ok(())
    }

    async fn backup(&self) -> Result<()> {
        let path = Text::new("Back up to:")
            .with_default("bookspark-backup.json")
            .prompt()?;
        let content = self.store.create_backup().await;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path))?;
        println!("Backup written to {}", path);
        Ok(())
    }

    async fn restore(&self) -> Result<()> {
        let path = Text::new("Restore from:")
            .with_default("bookspark-backup.json")
            .prompt()?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;

        if !Confirm::new("This replaces your current favorites. Continue?")
            .with_default(false)
            .prompt()?
        {
            return Ok(());
        }

        let report = self.store.restore_from_backup(&content).await;
        if report.success {
            println!("Backup restored.");
        } else {
            println!("Restore failed.");
        }
        print_problems(&report.errors);
        Ok(())
    }
}

/// Select-list entry showing an idea by its headline.
struct IdeaChoice(BookIdea);

impl fmt::Display for IdeaChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.0.headline(), self.0.genre)
    }
}

fn choose<T>(prompt: &str, all: &[T], current: T) -> Result<T>
where
    T: fmt::Display + Copy + PartialEq,
{
    let cursor = all.iter().position(|v| *v == current).unwrap_or(0);
    Ok(Select::new(prompt, all.to_vec())
        .with_starting_cursor(cursor)
        .prompt()?)
}

fn print_list(heading: &str, ideas: &[BookIdea]) {
    println!("{} ({}):", heading, ideas.len());
    if ideas.is_empty() {
        println!("  (none)");
    }
    for (i, idea) in ideas.iter().enumerate() {
        println!(
            "  {:>2}. {} [{}, {}] {}",
            i + 1,
            idea.headline(),
            idea.genre,
            idea.target_audience,
            idea.generated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_problems(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("{} problem(s):", errors.len());
    for error in errors {
        println!("  - {}", error);
    }
}
