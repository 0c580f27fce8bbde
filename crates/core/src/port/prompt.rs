// Operator Prompt Port (interactive inclusion policy)

use async_trait::async_trait;

use crate::domain::InclusionPolicy;
use crate::error::Result;
use crate::port::artifact_store::StatusCounts;

/// Interactive decision point before batch creation. The terminal adapter
/// lives in the CLI; under `--force` the run never consults this port.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Ask the operator which classified identities to include
    async fn choose_inclusion_policy(&self, counts: StatusCounts) -> Result<InclusionPolicy>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Scripted prompt for tests
    pub struct ScriptedPrompt {
        policy: InclusionPolicy,
        asked: Mutex<usize>,
    }

    impl ScriptedPrompt {
        pub fn new(policy: InclusionPolicy) -> Self {
            Self {
                policy,
                asked: Mutex::new(0),
            }
        }

        pub fn times_asked(&self) -> usize {
            *self.asked.lock().unwrap()
        }
    }

    #[async_trait]
    impl OperatorPrompt for ScriptedPrompt {
        async fn choose_inclusion_policy(&self, _counts: StatusCounts) -> Result<InclusionPolicy> {
            *self.asked.lock().unwrap() += 1;
            Ok(self.policy)
        }
    }
}
