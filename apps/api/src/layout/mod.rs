// Document layout: static font metrics, word wrap and the page compositor.
// Pure and CPU-bound; callers on the async runtime run it inside tokio::task::spawn_blocking.

pub mod compositor;
pub mod font_metrics;
pub mod wrap;

// Re-export the public API consumed by other modules (render, pipeline).
pub use compositor::{compose, Align, BlockContent, PageLayout, PlacedBlock, TextRole};
pub use font_metrics::{
    default_page_metrics, FontFace, MetricsError, PageMetrics, PT_PER_MM,
};
