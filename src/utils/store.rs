use dashmap::DashMap;
use teloxide::types::UserId;

use crate::utils::geo::Coordinate;

/// Last known location per user.
pub trait LocationStore: Send + Sync {
    fn get(&self, user: UserId) -> Option<Coordinate>;

    /// Replaces whatever was stored for `user`.
    fn put(&self, user: UserId, coordinate: Coordinate);
}

/// Process-lifetime store; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryLocationStore {
    locations: DashMap<UserId, Coordinate>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationStore for InMemoryLocationStore {
    fn get(&self, user: UserId) -> Option<Coordinate> {
        self.locations.get(&user).map(|entry| *entry)
    }

    fn put(&self, user: UserId, coordinate: Coordinate) {
        self.locations.insert(user, coordinate);
    }
}
