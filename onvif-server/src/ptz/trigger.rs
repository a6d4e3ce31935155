//! Alternate preset action: publish a fixed message to an external bus.

use async_trait::async_trait;

use crate::error::TriggerError;

/// Delivers a preset's message to its broker/topic.
#[async_trait]
pub trait PresetTrigger: Send + Sync {
    async fn fire(&self, broker: &str, topic: &str, message: &str) -> Result<(), TriggerError>;
}

/// Used when no message bus is wired in. Every trigger fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTrigger;

#[async_trait]
impl PresetTrigger for DisabledTrigger {
    async fn fire(&self, broker: &str, topic: &str, _message: &str) -> Result<(), TriggerError> {
        tracing::warn!(broker, topic, "Preset trigger requested but no message bus is configured");
        Err(TriggerError::Disabled)
    }
}
