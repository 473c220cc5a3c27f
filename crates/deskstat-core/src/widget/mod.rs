//! Consumer-side rendering of bus properties into bar text.

pub mod options;
pub mod renderer;
pub mod template;

pub use options::{Border, Style, WidgetOptions};
pub use renderer::WidgetRenderer;
pub use template::TagTemplate;
