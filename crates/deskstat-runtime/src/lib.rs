//! deskstat runtime: the publisher process and the bar widgets.
//!
//! `deskstat publish` fans every producer into one outbound channel and
//! serves the resulting properties on a Unix socket; `deskstat widget`
//! subscribes to that socket and prints one line per redraw.

pub mod audio;
pub mod cli;
pub mod client;
pub mod error;
pub mod media;
pub mod orchestrator;
pub mod protocol;
pub mod publish;
pub mod publisher;
pub mod resources;
pub mod server;
pub mod widget;
