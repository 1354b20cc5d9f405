pub mod icons;
pub mod render;

pub use render::{format_entry, format_health, format_metrics, format_report, format_status};
