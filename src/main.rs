use anyhow::Result;
use std::sync::Arc;

use bookspark::core::config::Config;
use bookspark::core::io::NativeStorage;
use bookspark::services::catalog::Catalog;
use bookspark::services::generator::IdeaGenerator;
use bookspark::services::menu::Menu;
use bookspark::services::store::IdeaStore;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please fix or remove 'config.yml' and try again.");
            return Err(e);
        }
    };

    if !Config::exists() {
        config.save()?;
        println!("Default configuration written to config.yml.");
    }
    config.ensure_directories()?;

    let catalog = Catalog::builtin()?;
    let generator = IdeaGenerator::new(catalog, &config.generator);
    let store = IdeaStore::new(Arc::new(NativeStorage::new(&config.data_folder)));

    let menu = Menu::new(&config, &generator, &store);
    if config.unattended {
        menu.run_unattended().await
    } else {
        menu.run().await
    }
}
