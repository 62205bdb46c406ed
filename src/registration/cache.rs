use std::time::{Duration, Instant};

use super::Registration;

/// Time-boxed cache for the "recent registrations" listing.
///
/// Every invalidation bumps a generation counter; a fill that started
/// before the bump is discarded so a write can never be hidden by a slower
/// concurrent read.
#[derive(Debug)]
pub struct RecentCache {
    ttl: Duration,
    generation: u64,
    entry: Option<(Instant, Vec<Registration>)>,
}

impl RecentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: 0,
            entry: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self) -> Option<Vec<Registration>> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<Vec<Registration>> {
        match &self.entry {
            Some((stored_at, rows)) if now.saturating_duration_since(*stored_at) <= self.ttl => {
                Some(rows.clone())
            }
            _ => None,
        }
    }

    /// Stores `rows` if no invalidation happened since `generation` was read.
    pub fn put(&mut self, generation: u64, rows: Vec<Registration>) {
        if generation == self.generation {
            self.entry = Some((Instant::now(), rows));
        }
    }

    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.entry = None;
    }
}
