use std::future::Future;

use deskstat_core::media::{MediaSession, PlaybackState, SessionProperties};

use crate::error::MprisError;

/// Read access to a running media player.
///
/// Implemented over the bus by [`crate::MprisClient`]; tests use in-memory
/// fakes.
pub trait SessionProbe: Send + Sync {
    /// Current `PlaybackStatus` of the session.
    fn playback_status(
        &self,
        session: &MediaSession,
    ) -> impl Future<Output = Result<PlaybackState, MprisError>> + Send;

    /// Playback state plus metadata, fetched for the winning session only.
    fn properties(
        &self,
        session: &MediaSession,
    ) -> impl Future<Output = Result<SessionProperties, MprisError>> + Send;
}
