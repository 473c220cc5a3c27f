//! deskstat core: status values, media-session arbitration and widget
//! rendering. Everything here is synchronous and free of bus access so the
//! publisher and the widgets can share it.

pub mod error;
pub mod media;
pub mod status;
pub mod theme;
pub mod volume;
pub mod widget;

pub use error::StatusError;
pub use status::{Content, StatusValue, Unit, Value};
pub use theme::Theme;
