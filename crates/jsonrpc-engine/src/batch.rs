//! Batch execution on the bounded worker pool.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::value::{RawValue, to_raw_value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use crate::context::RequestContext;
use crate::dispatch::{self, DispatchError, Dispatcher};
use crate::error::JsonRpcError;
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcMessage;

type Responses = Arc<Mutex<Vec<Box<RawValue>>>>;

/// Run every element of a batch and collect the responses.
///
/// Each decoded element waits for a pool permit before it is spawned, so at
/// most `pool`'s permit count run at once and the rest queue. Responses are
/// gathered in completion order. Returns `None` when no element produced a
/// response.
pub async fn execute(
    dispatcher: &Arc<Dispatcher>,
    pool: &Arc<Semaphore>,
    ctx: &RequestContext,
    elements: Vec<Box<RawValue>>,
) -> crate::Result<Option<Vec<u8>>> {
    let batch_ctx = ctx.child();
    let responses: Responses = Arc::new(Mutex::new(Vec::with_capacity(elements.len())));
    let mut workers = JoinSet::new();

    for element in elements {
        let request: JsonRpcRequest = match serde_json::from_str(element.get()) {
            Ok(request) => request,
            Err(err) => {
                append(&responses, &JsonRpcError::invalid_request(None, err).into());
                continue;
            }
        };

        let permit = Arc::clone(pool).acquire_owned().await?;
        let dispatcher = Arc::clone(dispatcher);
        let responses = Arc::clone(&responses);
        let ctx = batch_ctx.clone();

        workers.spawn(async move {
            let _permit = permit;
            let reply = match dispatcher.dispatch(&ctx, &request).await {
                Ok(Some(reply)) => reply,
                Ok(None) => return,
                Err(DispatchError::Sanity(err)) => dispatch::sanity_failure(&request, &err),
                Err(err @ DispatchError::Encode { .. }) => {
                    error!(error = %err, "Dropping batch response");
                    return;
                }
            };
            append(&responses, &reply);
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "Batch worker failed");
        }
    }
    batch_ctx.cancel();

    let responses = std::mem::take(&mut *responses.lock());
    if responses.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_vec(&responses)?))
}

fn append(responses: &Mutex<Vec<Box<RawValue>>>, reply: &JsonRpcMessage) {
    match to_raw_value(reply) {
        Ok(value) => responses.lock().push(value),
        Err(err) => error!(error = %err, id = ?reply.id(), "Dropping batch response"),
    }
}
