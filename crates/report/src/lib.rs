pub mod breaches;
pub mod export;
pub mod filters;
pub mod graph;
pub mod links;
pub mod query;
pub mod render;
pub mod share;
pub mod svg;

pub use breaches::{YearCount, breach_histogram};
pub use export::{ExportDocument, export_filename, sanitize_filename};
pub use filters::{ActiveFilter, FilterOption, filters};
pub use graph::{GraphEdge, GraphLayout, GraphNode, LayoutConfig, NodeKind, layout};
pub use links::{Linkifier, Segment};
pub use query::AdvancedQuery;
pub use render::{RenderedItem, Section, render_sections, render_text};
pub use share::{share_message, telegram_share_url};
pub use svg::render_svg;
