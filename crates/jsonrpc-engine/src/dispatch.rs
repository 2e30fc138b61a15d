//! Single-request dispatch: sanity check, lookup, bind, invoke, respond.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{RpcError, SanityError};
use crate::handler::HandlerFailure;
use crate::listener::{EventListener, SelectiveListener};
use crate::registry::Registry;
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcMessage;
use crate::types::RequestId;
use crate::validate::Validator;

/// Outcomes of [`Dispatcher::dispatch`] that are not a response object.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The envelope failed a sanity check; no handler was involved
    #[error(transparent)]
    Sanity(#[from] SanityError),

    /// The handler succeeded but its result could not be encoded
    #[error("failed to encode result of {method}: {source}")]
    Encode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid Request response for a request that failed its sanity checks.
/// The id is echoed unless the id itself was the problem.
pub fn sanity_failure(request: &JsonRpcRequest, err: &SanityError) -> JsonRpcMessage {
    let id = if err.echoes_id() {
        request.request_id()
    } else {
        None
    };
    JsonRpcMessage::error(id, RpcError::invalid_request(Some(err.to_string().into())))
}

/// Resolves requests against a read-only snapshot of the method registry.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) registry: Registry,
    pub(crate) validator: Option<Arc<dyn Validator>>,
    pub(crate) listener: Arc<dyn EventListener>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            registry: Registry::new(),
            validator: None,
            listener: Arc::new(SelectiveListener::default()),
        }
    }
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle one decoded request.
    ///
    /// `Ok(None)` means nothing is sent back: the request was a notification
    /// that reached its handler.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        request: &JsonRpcRequest,
    ) -> Result<Option<JsonRpcMessage>, DispatchError> {
        debug!(request = ?request, "Serving RPC request");

        let call = request.check()?;

        let Some(method) = self.registry.get(&call.method) else {
            return Ok(Some(JsonRpcMessage::error(
                call.id,
                RpcError::method_not_found(),
            )));
        };

        let started = Instant::now();
        self.listener.on_new_request(&call.method);

        let pending = match method.invoke(
            ctx.clone(),
            call.params.as_ref(),
            self.validator.as_deref(),
        ) {
            Ok(pending) => pending,
            Err(err) => {
                let error = RpcError::invalid_params(Some(err.to_string().into()));
                self.listener.on_request_failed(&call.method, &error);
                return Ok(Some(JsonRpcMessage::error(call.id, error)));
            }
        };

        let _handled = HandledGuard {
            listener: self.listener.as_ref(),
            method: &call.method,
            id: call.id.as_ref(),
            started,
        };

        let outcome = pending.await;
        let Some(id) = call.id.clone() else {
            return Ok(None);
        };

        match outcome {
            Ok(result) => Ok(Some(JsonRpcMessage::success(id, result))),
            Err(HandlerFailure::Rpc(error)) => {
                self.listener.on_request_failed(&call.method, &error);
                Ok(Some(JsonRpcMessage::error(Some(id), error)))
            }
            Err(HandlerFailure::Encode(source)) => Err(DispatchError::Encode {
                method: call.method.clone(),
                source,
            }),
        }
    }
}

/// Reports handling time on every exit path once the handler has started.
struct HandledGuard<'a> {
    listener: &'a dyn EventListener,
    method: &'a str,
    id: Option<&'a RequestId>,
    started: Instant,
}

impl Drop for HandledGuard<'_> {
    fn drop(&mut self) {
        let took = self.started.elapsed();
        self.listener.on_request_handled(self.method, took);
        debug!(method = self.method, id = ?self.id, took = ?took, "Responding to RPC request");
    }
}
