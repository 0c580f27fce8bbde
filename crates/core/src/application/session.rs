// Session Manager - explicit session object with reconnect and
// pre-emptive refresh (replaces the original's ambient globals)

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::port::{DirectoryGateway, GatewayError, GatewayResult, TimeProvider};

/// Authenticated session lifetime (50 minutes)
pub const SESSION_LIFETIME_MS: i64 = 50 * 60 * 1000;

/// Refresh margin: reconnect this long before expiry (5 minutes)
pub const SESSION_REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Auth-class failures recognized by message pattern
const AUTH_PATTERNS: &[&str] = &[
    "token",
    "unauthorized",
    "authentication",
    "401",
    "session expired",
];

/// Whether an error is authentication-class: either tagged Auth or carrying
/// a recognizable auth message
pub fn is_auth_failure(error: &GatewayError) -> bool {
    if error.is_auth() {
        return true;
    }
    let text = error.to_string().to_lowercase();
    AUTH_PATTERNS.iter().any(|p| text.contains(p))
}

/// Process-wide session owner.
///
/// One instance is shared by every worker; a reconnect triggered by any
/// worker does not cancel the others' in-flight calls, it only affects
/// their next attempt.
pub struct SessionManager {
    gateway: Arc<dyn DirectoryGateway>,
    time_provider: Arc<dyn TimeProvider>,
    /// Last successful connection or call, epoch ms (0 = never connected)
    last_connected: Mutex<i64>,
    max_auth_retries: u32,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn DirectoryGateway>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            gateway,
            time_provider,
            last_connected: Mutex::new(0),
            max_auth_retries: 2,
        }
    }

    /// Establish the initial session
    pub async fn connect(&self) -> GatewayResult<()> {
        self.reconnect().await
    }

    /// Epoch ms of the last successful connection or call
    pub fn last_connected_millis(&self) -> i64 {
        *self.last_connected.lock().unwrap()
    }

    fn touch(&self) {
        *self.last_connected.lock().unwrap() = self.time_provider.now_millis();
    }

    fn is_near_expiry(&self) -> bool {
        let last = *self.last_connected.lock().unwrap();
        if last == 0 {
            return false;
        }
        let age = self.time_provider.now_millis() - last;
        age >= SESSION_LIFETIME_MS - SESSION_REFRESH_MARGIN_MS
    }

    /// Force a gateway reconnect. A failed reconnect surfaces as an
    /// ordinary transient failure.
    pub async fn reconnect(&self) -> GatewayResult<()> {
        match self.gateway.reconnect().await {
            Ok(()) => {
                self.touch();
                info!("Gateway session established");
                Ok(())
            }
            Err(error) => Err(GatewayError::Transient(format!(
                "reconnect failed: {}",
                error
            ))),
        }
    }

    /// Pre-emptively refresh a session nearing its lifetime
    pub async fn ensure_fresh(&self) -> GatewayResult<()> {
        if self.is_near_expiry() {
            info!("Session nearing expiry, refreshing pre-emptively");
            self.reconnect().await?;
        }
        Ok(())
    }

    /// Run a gateway call under session management.
    ///
    /// Auth-class failures force a reconnect and the call is retried (up to
    /// a small auth budget). Every other error is re-raised immediately -
    /// transient retry is the retry executor's concern, layered outside.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.ensure_fresh().await?;

        let mut auth_attempts: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    self.touch();
                    return Ok(value);
                }
                Err(error) if is_auth_failure(&error) && auth_attempts < self.max_auth_retries => {
                    auth_attempts += 1;
                    warn!(
                        auth_attempts = %auth_attempts,
                        error = %error,
                        "Authentication failure, reconnecting"
                    );
                    self.reconnect().await?;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
