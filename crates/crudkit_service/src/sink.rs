//! Callback envelopes and the enqueue seam
//!
//! Mutating service operations emit a [`CallbackEnvelope`] through an
//! optional [`CallbackSink`]. The sink is the narrow seam towards whatever
//! queue infrastructure the application runs; broker mechanics stay outside
//! this crate. Dispatching a received envelope is the registry's job.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::error::ServiceError;

/// A serialized callback crossing the process boundary
///
/// Carries exactly what dispatch needs: the stable service identity, the
/// method to invoke, and the raw payload to parse through the service's
/// read schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    /// Stable identity of the service type that should handle the callback
    pub service: String,
    /// Name of the method to invoke on the resolved service
    pub method: String,
    /// Raw JSON payload, parsed through the service's read schema
    pub payload: JsonValue,
}

impl CallbackEnvelope {
    pub fn new(service: impl Into<String>, method: impl Into<String>, payload: JsonValue) -> Self {
        CallbackEnvelope { service: service.into(), method: method.into(), payload }
    }
}

/// Fire-and-forget destination for callback envelopes
#[async_trait]
pub trait CallbackSink: Send + Sync {
    /// Enqueues `envelope` for asynchronous processing
    async fn enqueue(&self, envelope: CallbackEnvelope) -> Result<(), ServiceError>;
}

/// In-memory sink capturing envelopes for tests
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    envelopes: Arc<Mutex<Vec<CallbackEnvelope>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Removes and returns every captured envelope
    pub async fn drain(&self) -> Vec<CallbackEnvelope> {
        std::mem::take(&mut *self.envelopes.lock().await)
    }

    /// Number of envelopes currently captured
    pub async fn len(&self) -> usize {
        self.envelopes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CallbackSink for MemorySink {
    async fn enqueue(&self, envelope: CallbackEnvelope) -> Result<(), ServiceError> {
        self.envelopes.lock().await.push(envelope);
        Ok(())
    }
}
