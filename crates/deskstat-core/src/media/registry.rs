use std::collections::BTreeMap;

/// One tracked media player, keyed by the bus owner that currently holds its
/// well-known name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSession {
    pub owner: String,
    pub bus_name: String,
    pub numeric_id: u64,
}

impl MediaSession {
    pub fn new(bus_name: impl Into<String>, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        Self {
            numeric_id: numeric_id(&owner),
            owner,
            bus_name: bus_name.into(),
        }
    }
}

/// Integer after the last `.` of a unique bus name (`:1.42` → 42), 0 when
/// that suffix is not a number.
pub fn numeric_id(owner: &str) -> u64 {
    owner
        .rsplit('.')
        .next()
        .and_then(|tail| tail.parse().ok())
        .unwrap_or(0)
}

/// Outcome of an owner change, one flag per half.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerChange {
    pub withdrawn: bool,
    pub announced: bool,
}

impl OwnerChange {
    pub fn any(self) -> bool {
        self.withdrawn || self.announced
    }
}

/// Sessions by owner. Ordered so snapshots and logs are stable.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, MediaSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.sessions.contains_key(owner)
    }

    pub fn snapshot(&self) -> Vec<MediaSession> {
        self.sessions.values().cloned().collect()
    }

    /// Register `owner`. Re-announcing a known owner keeps the existing
    /// session and still succeeds.
    pub fn announce(&mut self, bus_name: &str, owner: &str) -> bool {
        if owner.is_empty() {
            return false;
        }
        self.sessions
            .entry(owner.to_string())
            .or_insert_with(|| MediaSession::new(bus_name, owner));
        true
    }

    pub fn withdraw(&mut self, _bus_name: &str, owner: &str) -> bool {
        self.sessions.remove(owner).is_some()
    }

    /// Apply a name owner change. Empty old/new owners mean the name was
    /// acquired/released; both halves run regardless of each other's result.
    pub fn change_owner(&mut self, bus_name: &str, old_owner: &str, new_owner: &str) -> OwnerChange {
        let withdrawn = !old_owner.is_empty() && self.withdraw(bus_name, old_owner);
        let announced = !new_owner.is_empty() && self.announce(bus_name, new_owner);
        OwnerChange {
            withdrawn,
            announced,
        }
    }
}
