//! services/dashboard/src/adapters/session.rs
//!
//! A `SessionService` holding the signed-in account in process memory.
//! The authentication service itself is external; this adapter only remembers
//! which account the surfaces act for.

use async_trait::async_trait;
use tasktime_core::ports::{PortResult, SessionService};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
pub struct StaticSession {
    user: RwLock<Option<Uuid>>,
}

impl StaticSession {
    pub fn new(user: Option<Uuid>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    pub async fn sign_in(&self, user_id: Uuid) {
        *self.user.write().await = Some(user_id);
        info!("Signed in as {}", user_id);
    }
}

#[async_trait]
impl SessionService for StaticSession {
    async fn current_user(&self) -> PortResult<Option<Uuid>> {
        Ok(*self.user.read().await)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if let Some(user_id) = self.user.write().await.take() {
            info!("Signed out {}", user_id);
        }
        Ok(())
    }
}
