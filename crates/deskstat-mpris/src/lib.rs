//! Media sessions over the D-Bus session bus.
//!
//! [`client::MprisClient`] talks to the bus; [`aggregator`] decides what is
//! shown and is generic over [`probe::SessionProbe`] so it can run against
//! fakes.

pub mod aggregator;
pub mod client;
pub mod decode;
pub mod error;
pub mod probe;

pub use aggregator::{MediaAggregator, StatusRefresher};
pub use client::MprisClient;
pub use error::MprisError;
pub use probe::SessionProbe;
