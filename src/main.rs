use clap::Parser;
use iced::widget::image::Handle;
use iced::widget::{button, center, column, container, row, scrollable, text, text_input, Stack};
use iced::{alignment, window, Alignment, Element, Length, Size, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod assets;
mod config;
mod error;
mod export;
mod state;
mod ui;

use assets::{AssetCache, AssetFetcher, AssetLocation, ImageSource};
use config::Config;
use export::{ExportReport, ExportState};
use state::catalog::CatalogSource;
use state::data::CatalogEntry;
use state::pagination::{visible, Pagination, ProximityDetector, ViewportMetrics};
use state::selection::Selection;
use state::units::CatalogView;
use ui::grid::{columns_for_width, GridView};
use ui::thumbnails::Thumbnails;

/// Catalog load progress
#[derive(Debug, Clone, PartialEq)]
enum LoadState {
    Loading,
    Ready,
    /// All retries failed; the message is shown with a retry button
    Failed(String),
}

/// Main application state
struct PokedexCart {
    config: Config,
    client: reqwest::Client,
    /// Where the catalog comes from
    source: CatalogSource,
    /// Fetches images relative to the current catalog
    fetcher: AssetFetcher,
    load: LoadState,
    /// Bumped on every catalog load; older results are dropped
    load_generation: u64,
    /// Bumped whenever a catalog is installed; thumbnails of an older
    /// catalog are dropped
    thumbnail_generation: u64,
    /// Catalog snapshot with its memoized flattened/filtered lists
    view: CatalogView,
    pagination: Pagination,
    detector: ProximityDetector,
    selection: Selection,
    export: ExportState,
    thumbnails: Thumbnails,
    grid_id: scrollable::Id,
    window_width: f32,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Background catalog load finished (tagged with its load generation)
    CatalogLoaded(u64, Result<Arc<[CatalogEntry]>, String>),
    /// User asked to retry a failed load
    RetryLoad,
    /// User clicked "Open catalog…"
    OpenCatalog,
    SearchChanged(String),
    /// The grid scrolled (drives the infinite-scroll sentinel)
    Scrolled(scrollable::Viewport),
    WindowResized(Size),
    /// Click anywhere on a card
    ToggleSelection(String),
    /// A grid image arrived (tagged with its thumbnail generation)
    ThumbnailLoaded(u64, String, Result<Handle, String>),
    Export,
    ExportFinished(Result<Option<ExportReport>, String>),
    RequestClear,
    ConfirmClear,
    CancelClear,
}

impl PokedexCart {
    /// Create a new instance of the application and start loading the catalog
    fn new(config: Config) -> (Self, Task<Message>) {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pokedex-cart/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        let location = AssetLocation::parse_catalog(&config.catalog)
            .unwrap_or_else(|_| AssetLocation::File(PathBuf::from(&config.catalog)));
        let source = CatalogSource::new(location, client.clone(), static_cache(&config));
        let fetcher = AssetFetcher::new(source.asset_base(), client.clone(), image_cache(&config));

        let mut app = PokedexCart {
            pagination: Pagination::new(config.effective_page_size()),
            config,
            client,
            source,
            fetcher,
            load: LoadState::Loading,
            load_generation: 0,
            thumbnail_generation: 0,
            view: CatalogView::default(),
            detector: ProximityDetector::default(),
            selection: Selection::new(),
            export: ExportState::Idle,
            thumbnails: Thumbnails::default(),
            grid_id: scrollable::Id::new("catalog-grid"),
            window_width: 1024.0,
            status: String::from("Loading catalog…"),
        };

        let task = app.load_catalog();
        (app, task)
    }

    /// Start a new catalog load; any load still running becomes stale
    fn load_catalog(&mut self) -> Task<Message> {
        self.load_generation += 1;
        let generation = self.load_generation;
        let source = self.source.clone();
        Task::perform(
            async move { source.load_with_retry().await.map_err(|e| e.to_string()) },
            move |result| Message::CatalogLoaded(generation, result),
        )
    }

    /// Cards currently rendered
    fn rendered(&self) -> usize {
        self.pagination.rendered(self.view.filtered().len())
    }

    fn has_more(&self) -> bool {
        self.pagination.has_more(self.view.filtered().len())
    }

    /// Fetch grid images for every rendered card not requested yet
    fn request_thumbnails(&mut self) -> Task<Message> {
        let filtered = Arc::clone(self.view.filtered());
        let shown = visible(&filtered[..], self.pagination.count());
        let references = shown
            .iter()
            .flat_map(|unit| unit.images.iter().map(String::as_str));

        let generation = self.thumbnail_generation;
        let tasks: Vec<Task<Message>> = self
            .thumbnails
            .claim_missing(references)
            .into_iter()
            .map(|reference| {
                let fetcher = self.fetcher.clone();
                let key = reference.clone();
                Task::perform(
                    async move {
                        fetcher
                            .fetch(&reference)
                            .await
                            .map(Handle::from_bytes)
                            .map_err(|e| e.to_string())
                    },
                    move |result| Message::ThumbnailLoaded(generation, key.clone(), result),
                )
            })
            .collect();

        Task::batch(tasks)
    }

    /// Grow the window if the sentinel is in view
    fn maybe_load_more(&mut self, fired: bool) -> Task<Message> {
        if fired && self.pagination.load_more(self.view.filtered().len()) {
            tracing::debug!("showing {} cards", self.rendered());
            return self.request_thumbnails();
        }
        Task::none()
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::CatalogLoaded(generation, _) if generation != self.load_generation => {
                tracing::debug!("dropping result of superseded catalog load {}", generation);
                Task::none()
            }
            Message::CatalogLoaded(_, Ok(entries)) => {
                // New snapshot: start over at the top with fresh thumbnails
                self.view.set_catalog(entries);
                self.pagination.reset();
                self.detector.reset();
                self.thumbnail_generation += 1;
                self.thumbnails.clear();
                self.fetcher = AssetFetcher::new(
                    self.source.asset_base(),
                    self.client.clone(),
                    image_cache(&self.config),
                );
                self.load = LoadState::Ready;
                self.status = format!(
                    "Ready. {} Pokémon in catalog ({} cards).",
                    self.view.catalog().len(),
                    self.view.units().len()
                );

                Task::batch([
                    self.request_thumbnails(),
                    scrollable::snap_to(self.grid_id.clone(), scrollable::RelativeOffset::START),
                ])
            }
            Message::CatalogLoaded(_, Err(e)) => {
                tracing::error!("❌ Catalog load failed: {}", e);
                self.status = String::from("Catalog unavailable.");
                self.load = LoadState::Failed(e);
                Task::none()
            }
            Message::RetryLoad => {
                self.load = LoadState::Loading;
                self.status = String::from("Loading catalog…");
                self.load_catalog()
            }
            Message::OpenCatalog => {
                // Show the native file picker dialog
                let file = FileDialog::new()
                    .set_title("Open Pokémon catalog")
                    .add_filter("JSON", &["json"])
                    .pick_file();

                let Some(path) = file else {
                    return Task::none();
                };

                // The image fetcher follows once this catalog has loaded
                let location = AssetLocation::File(path);
                self.status = format!("Loading {}…", location.describe());
                self.source = CatalogSource::new(location, self.client.clone(), static_cache(&self.config));
                self.load = LoadState::Loading;
                self.load_catalog()
            }
            Message::SearchChanged(term) => {
                if !self.view.set_term(&term) {
                    return Task::none();
                }

                // A new term shows the first page again
                self.pagination.reset();
                self.detector.reset();

                Task::batch([
                    self.request_thumbnails(),
                    scrollable::snap_to(self.grid_id.clone(), scrollable::RelativeOffset::START),
                ])
            }
            Message::Scrolled(viewport) => {
                // Measure how close the sentinel is to the bottom edge
                let metrics = ViewportMetrics {
                    offset_y: viewport.absolute_offset().y,
                    viewport_height: viewport.bounds().height,
                    content_height: viewport.content_bounds().height,
                };
                let fired = self.detector.observe(self.rendered(), self.has_more(), metrics);
                self.maybe_load_more(fired)
            }
            Message::WindowResized(size) => {
                // Column count follows the width; the sentinel may now be in view
                self.window_width = size.width;
                let fired = self.detector.recheck(self.rendered(), self.has_more());
                self.maybe_load_more(fired)
            }
            Message::ToggleSelection(key) => {
                if !self.export.is_generating() {
                    self.selection.toggle(&key);
                }
                Task::none()
            }
            Message::ThumbnailLoaded(generation, reference, result) => {
                if generation == self.thumbnail_generation {
                    self.thumbnails.finish(reference, result);
                }
                Task::none()
            }
            Message::Export => {
                // No export while the clear dialog is open
                if self.selection.is_confirming_clear() {
                    return Task::none();
                }

                // Snapshot the selection against the full list before going async
                let units = self.selection.resolve(self.view.units());
                let stale = self
                    .selection
                    .keys()
                    .filter(|key| !units.iter().any(|unit| unit.unique_key == *key))
                    .count();
                if stale > 0 {
                    tracing::debug!("{} selected keys are not in this catalog", stale);
                }
                if !self.export.start(units.len()) {
                    return Task::none();
                }

                // Build and write the PDF in the background
                self.status = format!("Generating shopping list for {} items…", units.len());
                let fetcher = self.fetcher.clone();
                let path = self.config.output_path();
                Task::perform(
                    async move {
                        export::export_shopping_list(units, &fetcher, &path)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::ExportFinished,
                )
            }
            Message::ExportFinished(result) => {
                self.export.finish();
                match result {
                    Ok(Some(report)) => {
                        // export and clear are one step: only a written file empties the cart
                        self.selection.clear();
                        self.status = if report.missing_images > 0 {
                            format!(
                                "✅ Saved {} items to {} ({} images unavailable).",
                                report.items,
                                report.path.display(),
                                report.missing_images
                            )
                        } else {
                            format!("✅ Saved {} items to {}.", report.items, report.path.display())
                        };
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!("❌ Export failed: {}", e);
                        self.status = format!("Export failed: {}", e);
                    }
                }
                Task::none()
            }
            Message::RequestClear => {
                if !self.export.is_generating() {
                    self.selection.request_clear();
                }
                Task::none()
            }
            Message::ConfirmClear => {
                if self.selection.confirm_clear() {
                    self.status = String::from("Shopping list cleared.");
                }
                Task::none()
            }
            Message::CancelClear => {
                self.selection.cancel_clear();
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = row![
            text("Pokédex Cart").size(28),
            text_input("Search by name or number…", self.view.term())
                .on_input(Message::SearchChanged)
                .padding(8)
                .width(Length::Fill),
            button("Open catalog…")
                .on_press_maybe((!self.export.is_generating()).then_some(Message::OpenCatalog))
                .padding(8),
        ]
        .spacing(16)
        .padding(16)
        .align_y(Alignment::Center);

        let body: Element<Message> = match &self.load {
            LoadState::Loading => center(text("Loading catalog…").size(18)).into(),
            LoadState::Failed(e) => center(
                column![
                    text("The catalog could not be loaded.").size(20),
                    text(e.as_str()).size(14),
                    button("Retry").on_press(Message::RetryLoad).padding(10),
                ]
                .spacing(12)
                .align_x(Alignment::Center),
            )
            .into(),
            LoadState::Ready => {
                let filtered = self.view.filtered();
                let grid = GridView {
                    units: visible(&filtered[..], self.pagination.count()),
                    columns: columns_for_width(self.window_width),
                    selection: &self.selection,
                    thumbnails: &self.thumbnails,
                    interactive: !self.export.is_generating(),
                    has_more: self.has_more(),
                };

                scrollable(grid.view())
                    .id(self.grid_id.clone())
                    .on_scroll(Message::Scrolled)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .into()
            }
        };

        let base = column![header, body, text(&self.status).size(14)]
            .padding(8)
            .width(Length::Fill)
            .height(Length::Fill);

        let mut layers = Stack::new()
            .width(Length::Fill)
            .height(Length::Fill)
            .push(base);

        if !self.selection.is_empty() {
            layers = layers.push(
                container(ui::summary::summary_bar(
                    self.selection.len(),
                    self.export.is_generating(),
                ))
                .center_x(Length::Fill)
                .height(Length::Fill)
                .align_y(alignment::Vertical::Bottom)
                .padding(40),
            );
        }

        if self.selection.is_confirming_clear() {
            layers = layers.push(ui::summary::confirm_clear_dialog(self.selection.len()));
        }

        layers.into()
    }

    fn subscription(&self) -> Subscription<Message> {
        window::resize_events().map(|(_id, size)| Message::WindowResized(size))
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn image_cache(config: &Config) -> Option<AssetCache> {
    config.asset_cache_dir().map(|dir| AssetCache::images(&dir))
}

fn static_cache(config: &Config) -> Option<AssetCache> {
    config.asset_cache_dir().map(|dir| AssetCache::static_files(&dir))
}

fn main() -> iced::Result {
    // RUST_LOG=debug for verbose per-operation logs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,pokedex_cart=info")),
        )
        .init();

    let config = Config::parse();
    tracing::info!("🎨 Pokédex Cart starting with catalog {}", config.catalog);

    iced::application("Pokédex Cart", PokedexCart::update, PokedexCart::view)
        .subscription(PokedexCart::subscription)
        .theme(PokedexCart::theme)
        .centered()
        .run_with(move || PokedexCart::new(config))
}
