//! The JSON-RPC server: registration phase, then serving.

use std::fmt;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::Semaphore;

use crate::batch;
use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::decode::{self, Envelope};
use crate::dispatch::{self, DispatchError, Dispatcher};
use crate::error::{Error, RegistrationError};
use crate::listener::EventListener;
use crate::registry::Method;
use crate::response::JsonRpcMessage;
use crate::validate::Validator;

/// Transport-agnostic JSON-RPC 2.0 server.
///
/// Methods are registered through `&mut self` before serving starts;
/// [`Server::handle`] only needs `&self` and can be called concurrently.
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    pool: Arc<Semaphore>,
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::default()),
            pool: Arc::new(Semaphore::new(config.workers())),
            config,
        }
    }

    /// Server with default settings and a pool of `max_workers` batch workers
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self::new(ServerConfig::default().with_max_workers(max_workers))
    }

    /// Validate every bound argument with `validator`
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        Arc::make_mut(&mut self.dispatcher).validator = Some(Arc::new(validator));
        self
    }

    /// Report request lifecycle events to `listener`
    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener + 'static,
    {
        Arc::make_mut(&mut self.dispatcher).listener = Arc::new(listener);
        self
    }

    /// Register a method, replacing any method of the same name.
    pub fn register_method(&mut self, method: Method) -> Result<(), RegistrationError> {
        Arc::make_mut(&mut self.dispatcher).registry.register(method)
    }

    /// Register methods in order, stopping at the first invalid one.
    /// Methods before it stay registered.
    pub fn register_methods<I>(&mut self, methods: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = Method>,
    {
        for method in methods {
            self.register_method(method)?;
        }
        Ok(())
    }

    /// Names of all registered methods, sorted
    pub fn registered_methods(&self) -> Vec<String> {
        self.dispatcher.registry().names()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle one request or batch held in memory.
    ///
    /// `Ok(None)` means nothing should be written back.
    pub async fn handle(&self, ctx: &RequestContext, input: &[u8]) -> crate::Result<Option<Vec<u8>>> {
        self.handle_reader(ctx, input).await
    }

    /// Read a request or batch from `reader` and handle it.
    ///
    /// Only the first JSON value is used. Protocol problems are answered in
    /// the returned bytes; errors are reserved for failing to read the input
    /// or to encode a response.
    pub async fn handle_reader<R>(&self, ctx: &RequestContext, reader: R) -> crate::Result<Option<Vec<u8>>>
    where
        R: AsyncRead + Unpin,
    {
        let reply = match decode::read_envelope(reader, self.config.read_buffer_size).await? {
            Envelope::Batch(elements) => {
                return batch::execute(&self.dispatcher, &self.pool, ctx, elements).await;
            }
            Envelope::Rejected(error) => Some(JsonRpcMessage::Error(error)),
            Envelope::Single(request) => match self.dispatcher.dispatch(ctx, &request).await {
                Ok(reply) => reply,
                Err(DispatchError::Sanity(err)) => Some(dispatch::sanity_failure(&request, &err)),
                Err(DispatchError::Encode { source, .. }) => return Err(Error::Encode(source)),
            },
        };

        match reply {
            Some(reply) => Ok(Some(serde_json::to_vec(&reply)?)),
            None => Ok(None),
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("methods", &self.registered_methods())
            .field("config", &self.config)
            .finish()
    }
}
