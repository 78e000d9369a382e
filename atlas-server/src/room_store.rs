use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use atlas_core::Room;
use atlas_types::{Country, GameError};

/// Bound on code-generation retries. Hitting it means the 6-digit code
/// space is effectively saturated, which is a capacity problem rather than
/// something to retry forever.
const MAX_CODE_ATTEMPTS: usize = 100;

/// Scheduled tasks tied to one room's identity. Aborted as a group when the
/// room is deleted for any reason, so a timer can never race a reclaimed
/// room.
#[derive(Debug, Default)]
pub struct RoomTimers {
    pub expiry: Option<AbortHandle>,
    pub grace: Option<AbortHandle>,
    pub cleanup: Option<AbortHandle>,
}

impl RoomTimers {
    fn abort_all(&mut self) {
        for handle in [
            self.expiry.take(),
            self.grace.take(),
            self.cleanup.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

/// One active room: the room itself behind its per-room lock, plus the
/// timers scheduled for it. Mutating operations hold `room` for the whole
/// logical operation; `timers` is only ever taken after `room` is released.
#[derive(Debug)]
pub struct RoomSlot {
    pub room: Mutex<Room>,
    pub timers: Mutex<RoomTimers>,
}

impl RoomSlot {
    fn new(room: Room) -> Self {
        Self {
            room: Mutex::new(room),
            timers: Mutex::new(RoomTimers::default()),
        }
    }
}

/// The authoritative table of active rooms, keyed by 6-digit code. The
/// sharded map makes code generation + insertion one atomic step, so two
/// concurrent creations can never claim the same code.
pub struct RoomStore {
    rooms: DashMap<String, Arc<RoomSlot>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn create(&self, answer: Country) -> Result<(String, Arc<RoomSlot>), GameError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    let slot = Arc::new(RoomSlot::new(Room::new(code.clone(), answer.clone())));
                    vacant.insert(Arc::clone(&slot));
                    return Ok((code, slot));
                }
            }
        }
        Err(GameError::CodeGenerationExhausted)
    }

    pub fn get(&self, code: &str) -> Option<Arc<RoomSlot>> {
        self.rooms.get(code).map(|entry| Arc::clone(entry.value()))
    }

    /// Idempotent: removing an absent code is a no-op. Any pending timers
    /// for the room are cancelled.
    pub async fn remove(&self, code: &str) -> Option<Arc<RoomSlot>> {
        let (_, slot) = self.rooms.remove(code)?;
        slot.timers.lock().await.abort_all();
        Some(slot)
    }

    pub fn codes(&self) -> Vec<String> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::CountryCatalog;
    use std::collections::HashSet;

    fn any_country() -> Country {
        CountryCatalog::with_test_countries().get("FRA").unwrap().clone()
    }

    #[test]
    fn generated_codes_are_six_ascii_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[tokio::test]
    async fn test_create_get_remove_cycle() {
        let store = RoomStore::new();
        let (code, _) = store.create(any_country()).unwrap();

        assert!(store.get(&code).is_some());
        assert_eq!(store.len(), 1);

        assert!(store.remove(&code).await.is_some());
        assert!(store.get(&code).is_none());
        // Removing again is a no-op
        assert!(store.remove(&code).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creations_get_unique_codes() {
        let store = Arc::new(RoomStore::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let (code, _) = store.create(any_country()).unwrap();
                code
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            codes.insert(handle.await.unwrap());
        }
        assert_eq!(codes.len(), 50);
        assert_eq!(store.len(), 50);
    }

    #[tokio::test]
    async fn test_remove_aborts_pending_timers() {
        let store = RoomStore::new();
        let (code, slot) = store.create(any_country()).unwrap();

        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        slot.timers.lock().await.cleanup = Some(task.abort_handle());

        store.remove(&code).await;
        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
