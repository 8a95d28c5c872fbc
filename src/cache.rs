//! Memoized model decisions keyed by board, legal moves and strategy.

use crate::strategy::StrategyId;
use llm2048_board::{Board, Direction, LegalMoves};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, trace};

/// Default entry ceiling.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Identity of one decision situation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    board: Board,
    legal: LegalMoves,
    strategy: StrategyId,
}

impl CacheKey {
    /// Builds a key from value snapshots.
    pub fn new(board: &Board, legal: LegalMoves, strategy: StrategyId) -> Self {
        Self {
            board: board.clone(),
            legal,
            strategy,
        }
    }
}

/// Bounded, process-wide decision store.
///
/// Inserts beyond the capacity are dropped; nothing is ever evicted.
#[derive(Debug)]
pub struct DecisionCache {
    entries: Mutex<HashMap<CacheKey, Direction>>,
    capacity: usize,
}

impl DecisionCache {
    /// Creates an empty cache holding at most `capacity` entries.
    #[instrument]
    pub fn new(capacity: usize) -> Self {
        info!(capacity, "Creating decision cache");
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the map half-written, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Direction>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a cached decision.
    #[instrument(level = "debug", skip(self, key))]
    pub fn get(&self, key: &CacheKey) -> Option<Direction> {
        let hit = self.lock().get(key).copied();
        trace!(hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Stores a decision. Returns false when the cache is full and `key` is
    /// not already present.
    #[instrument(level = "debug", skip(self, key))]
    pub fn put(&self, key: CacheKey, direction: Direction) -> bool {
        let mut entries = self.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            debug!(capacity = self.capacity, "Cache full, decision not stored");
            return false;
        }
        entries.insert(key, direction);
        true
    }

    /// Drops every entry.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let mut entries = self.lock();
        info!(dropped = entries.len(), "Clearing decision cache");
        entries.clear();
    }

    /// Number of stored decisions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Entry ceiling.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: u32, strategy: StrategyId) -> CacheKey {
        let board = Board::from_rows(vec![vec![value, 0], vec![0, 0]]).unwrap();
        CacheKey::new(&board, LegalMoves::ALL, strategy)
    }

    #[test]
    fn test_get_after_put() {
        let cache = DecisionCache::new(4);
        assert_eq!(cache.get(&key(2, StrategyId::Snake)), None);
        assert!(cache.put(key(2, StrategyId::Snake), Direction::Left));
        assert_eq!(cache.get(&key(2, StrategyId::Snake)), Some(Direction::Left));
    }

    #[test]
    fn test_strategy_is_part_of_key() {
        let cache = DecisionCache::new(4);
        cache.put(key(2, StrategyId::Snake), Direction::Left);
        assert_eq!(cache.get(&key(2, StrategyId::CornerFocus)), None);
    }

    #[test]
    fn test_put_beyond_capacity_is_silent_noop() {
        let cache = DecisionCache::new(2);
        assert!(cache.put(key(2, StrategyId::Snake), Direction::Up));
        assert!(cache.put(key(4, StrategyId::Snake), Direction::Up));
        assert!(!cache.put(key(8, StrategyId::Snake), Direction::Up));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key(8, StrategyId::Snake)), None);
        assert_eq!(cache.get(&key(2, StrategyId::Snake)), Some(Direction::Up));
    }

    #[test]
    fn test_overwrite_at_capacity() {
        let cache = DecisionCache::new(1);
        cache.put(key(2, StrategyId::Snake), Direction::Up);
        assert!(cache.put(key(2, StrategyId::Snake), Direction::Down));
        assert_eq!(cache.get(&key(2, StrategyId::Snake)), Some(Direction::Down));
    }

    #[test]
    fn test_clear() {
        let cache = DecisionCache::default();
        cache.put(key(2, StrategyId::Snake), Direction::Up);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), DEFAULT_CACHE_CAPACITY);
    }
}
