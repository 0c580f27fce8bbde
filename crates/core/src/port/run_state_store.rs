// Run State Store Port (checkpoint persistence)

use async_trait::async_trait;

use crate::domain::MigrationRunState;
use crate::error::Result;

/// Persistence for the checkpointed run state.
///
/// The state document is rewritten after every stage transition by exactly
/// one logical owner (the state machine), so atomic whole-file replacement
/// suffices without additional locking.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// Load the persisted run state, if any. A corrupted document is set
    /// aside (not deleted) and reported as absent so the run starts fresh.
    async fn load(&self) -> Result<Option<MigrationRunState>>;

    /// Persist the run state with atomic replacement
    async fn save(&self, state: &MigrationRunState) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store for tests, with a save counter
    #[derive(Default)]
    pub struct MemoryRunStateStore {
        state: Mutex<Option<MigrationRunState>>,
        saves: Mutex<usize>,
    }

    impl MemoryRunStateStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_state(state: MigrationRunState) -> Self {
            Self {
                state: Mutex::new(Some(state)),
                saves: Mutex::new(0),
            }
        }

        pub fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }

        pub fn current(&self) -> Option<MigrationRunState> {
            self.state.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RunStateStore for MemoryRunStateStore {
        async fn load(&self) -> Result<Option<MigrationRunState>> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save(&self, state: &MigrationRunState) -> Result<()> {
            *self.state.lock().unwrap() = Some(state.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }
}
