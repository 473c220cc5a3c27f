use super::{MediaSession, PlaybackState};

/// A session scored for arbitration. Built fresh on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedCandidate {
    pub numeric_id: u64,
    pub weight: u8,
    pub owner: String,
    pub bus_name: String,
}

impl WeightedCandidate {
    pub fn new(session: &MediaSession, playback: PlaybackState) -> Self {
        Self {
            numeric_id: session.numeric_id,
            weight: playback.weight(),
            owner: session.owner.clone(),
            bus_name: session.bus_name.clone(),
        }
    }
}

/// Pick the current session: highest weight, then highest numeric id.
///
/// Equal weight and id can only happen with non-numeric owner suffixes; the
/// larger owner string wins then so the choice never depends on input order.
pub fn select_current(candidates: &[WeightedCandidate]) -> Option<&WeightedCandidate> {
    candidates
        .iter()
        .max_by(|a, b| {
            (a.weight, a.numeric_id, &a.owner).cmp(&(b.weight, b.numeric_id, &b.owner))
        })
}
