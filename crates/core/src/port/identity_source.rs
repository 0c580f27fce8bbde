// Identity Source Port (streaming input)

use async_trait::async_trait;

use crate::domain::Identity;
use crate::error::Result;

/// Streaming source of mailbox identities.
///
/// The full list is never materialized by consumers: the batch executor
/// reads one window at a time. The total is known up front (counted when
/// the source is opened) so progress can be reported as processed/total.
#[async_trait]
pub trait IdentitySource: Send {
    /// Total number of identities in the source
    fn total(&self) -> usize;

    /// Read up to `max` identities; an empty vec means the source is drained
    async fn next_window(&mut self, max: usize) -> Result<Vec<Identity>>;
}

pub mod mocks {
    use super::*;

    /// In-memory source for tests
    pub struct VecIdentitySource {
        identities: Vec<Identity>,
        cursor: usize,
    }

    impl VecIdentitySource {
        pub fn new(identities: Vec<Identity>) -> Self {
            Self {
                identities,
                cursor: 0,
            }
        }

        pub fn from_strs(identities: &[&str]) -> Self {
            Self::new(identities.iter().map(|s| s.to_string()).collect())
        }
    }

    #[async_trait]
    impl IdentitySource for VecIdentitySource {
        fn total(&self) -> usize {
            self.identities.len()
        }

        async fn next_window(&mut self, max: usize) -> Result<Vec<Identity>> {
            let end = (self.cursor + max).min(self.identities.len());
            let window = self.identities[self.cursor..end].to_vec();
            self.cursor = end;
            Ok(window)
        }
    }
}
