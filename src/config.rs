/// Command line configuration
///
/// Everything has a sensible default so the app can be launched with no
/// arguments from the project directory.

use clap::Parser;
use std::path::PathBuf;

use crate::state::pagination::DEFAULT_PAGE_SIZE;

/// Fixed name of the exported shopping list
pub const OUTPUT_FILE_NAME: &str = "pokemon-shopping-list.pdf";

/// Browse a Pokémon catalog and export a shopping list PDF.
#[derive(Debug, Clone, Parser)]
#[command(name = "pokedex-cart", about, version)]
pub struct Config {
    /// Catalog JSON file (local path or http(s) URL)
    #[arg(long, value_name = "PATH_OR_URL", default_value = "data/pokemon.json")]
    pub catalog: String,

    /// Directory the shopping list is written to (default: Downloads)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of cards added per infinite-scroll step
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Directory for the offline asset cache (default: user cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Disable the offline asset cache
    #[arg(long)]
    pub no_cache: bool,
}

impl Config {
    /// Full path of the exported PDF
    pub fn output_path(&self) -> PathBuf {
        let dir = self
            .output_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join(OUTPUT_FILE_NAME)
    }

    /// Cache directory, or `None` when caching is disabled
    pub fn asset_cache_dir(&self) -> Option<PathBuf> {
        if self.no_cache {
            return None;
        }

        self.cache_dir.clone().or_else(|| {
            dirs::cache_dir().map(|mut path| {
                path.push("pokedex-cart");
                path.push("assets");
                path
            })
        })
    }

    /// Page size, never zero (a zero step would stall the scroll loader)
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }
}
