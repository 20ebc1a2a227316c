//! Service identity registry and callback dispatch
//!
//! The process-wide map from stable service identity to concrete service
//! type. The composition root builds one registry during startup,
//! registering every service type it hosts; after that the registry is only
//! read. Registration is an explicit call, not a side effect of declaring
//! the type, so ordering and testability stay visible.
//!
//! # Dispatch
//!
//! A background worker receives only an identity string, a method name, and
//! a raw payload. Dispatch resolves the identity to its registered entry
//! (an unknown identity is a lookup error, fatal for that task),
//! constructs a service instance through the registered factory, parses
//! the payload through the entity's read schema, and invokes the named
//! method. No return value is consumed.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = ServiceRegistry::new();
//! registry.register::<AuthorService, _, _>(move || {
//!     let repo = repo.clone();
//!     async move { Ok(AuthorService::new(repo)) }
//! });
//! registry.dispatch(AuthorService::identity(), "receive_callback", &payload).await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;

use crudkit_dto::{DtoConfig, Schema};

use crate::error::ServiceError;
use crate::service::CrudService;
use crate::sink::CallbackEnvelope;

type DispatchFuture = Pin<Box<dyn Future<Output = Result<(), ServiceError>> + Send>>;
type Dispatcher = Box<dyn Fn(String, JsonValue) -> DispatchFuture + Send + Sync>;

/// Registry of service types, keyed by stable identity
#[derive(Default)]
pub struct ServiceRegistry {
    entries: HashMap<&'static str, Dispatcher>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        ServiceRegistry::default()
    }

    /// Registers `S` under its identity
    ///
    /// `factory` constructs a fresh service instance for each dispatched
    /// callback; it is where the composition root supplies the repository
    /// and its unit-of-work handle. Registering the same identity twice
    /// replaces the earlier entry.
    pub fn register<S, F, Fut>(&mut self, factory: F)
    where
        S: CrudService,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, ServiceError>> + Send + 'static,
    {
        let identity = S::identity();
        if self.entries.contains_key(identity) {
            tracing::warn!(identity, "service identity re-registered, replacing earlier entry");
        }
        let dispatcher: Dispatcher = Box::new(move |method, payload| {
            let instance = factory();
            Box::pin(async move {
                let service = instance.await?;
                let schema = Schema::derive::<S::Entity>(&DtoConfig::read())?;
                let data = schema.parse(&payload)?;
                service.invoke(&method, data).await
            })
        });
        self.entries.insert(identity, dispatcher);
        tracing::debug!(identity, "service registered");
    }

    /// Checks whether an identity is registered
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Registered identities, in arbitrary order
    pub fn identities(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Dispatches a callback to the service registered under `identity`
    ///
    /// # Errors
    ///
    /// * `UnknownService` when no entry carries `identity`; nothing is
    ///   invoked
    /// * `ValidationError` (pass-through) when the payload fails the read
    ///   schema
    /// * `UnknownMethod` when the resolved service does not route `method`
    pub async fn dispatch(
        &self,
        identity: &str,
        method: &str,
        payload: &JsonValue,
    ) -> Result<(), ServiceError> {
        let entry = self
            .entries
            .get(identity)
            .ok_or_else(|| ServiceError::UnknownService(identity.to_string()))?;
        tracing::debug!(identity, method, "dispatching callback");
        entry(method.to_string(), payload.clone()).await
    }

    /// Dispatches a received envelope
    pub async fn dispatch_envelope(&self, envelope: &CallbackEnvelope) -> Result<(), ServiceError> {
        self.dispatch(&envelope.service, &envelope.method, &envelope.payload).await
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry").field("identities", &self.identities()).finish()
    }
}
