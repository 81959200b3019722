//! Notifier boundary. Backends (email, webhook chat) live outside this crate.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::types::journey::JourneyInfo;

/// Receives each cycle's batch of newly discovered journeys.
///
/// Called from its own task, so a slow backend never delays the watchdog.
/// Empty batches are delivered too; backends decide whether to skip them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn on_update(&self, offers: &[JourneyInfo]) -> Result<(), NotifyError>;
}
