/// User interface building blocks
///
/// - Responsive card grid with the infinite-scroll sentinel (grid.rs)
/// - Summary bar and the clear confirmation modal (summary.rs)
/// - Grid image handles (thumbnails.rs)

pub mod grid;
pub mod summary;
pub mod thumbnails;
