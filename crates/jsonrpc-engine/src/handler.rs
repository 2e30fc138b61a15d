//! Typed handler functions.
//!
//! Any async function or closure taking up to eight JSON-convertible
//! arguments, optionally preceded by a [`RequestContext`], and returning
//! `Result<R, RpcError>` is a [`Handler`]. The marker type `M` only exists to
//! keep the two families of impls apart; it is always inferred.
//!
//! ```rust
//! use jsonrpc_engine::{Method, Parameter, RequestContext, RpcError};
//!
//! async fn echo(msg: String) -> Result<String, RpcError> {
//!     Ok(msg)
//! }
//!
//! async fn sleep_for(ctx: RequestContext, millis: u64) -> Result<bool, RpcError> {
//!     tokio::select! {
//!         _ = ctx.cancelled() => Ok(false),
//!         _ = tokio::time::sleep(std::time::Duration::from_millis(millis)) => Ok(true),
//!     }
//! }
//!
//! let echo = Method::new("echo", vec![Parameter::required("msg")], echo);
//! let sleep = Method::new("sleep", vec![Parameter::required("millis")], sleep_for);
//! assert!(!echo.needs_context());
//! assert!(sleep.needs_context());
//! ```

use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::binder::Arguments;
use crate::context::RequestContext;
use crate::error::{BindError, RpcError};

/// What a handler future resolves to once its result has been encoded.
pub type HandlerFuture = BoxFuture<'static, Result<Value, HandlerFailure>>;

/// Ways an invoked handler can fail to produce a result value.
#[derive(Debug)]
pub enum HandlerFailure {
    /// The handler returned an error; it goes out verbatim
    Rpc(RpcError),
    /// The handler's result could not be encoded as JSON
    Encode(serde_json::Error),
}

/// Marker for handlers without a leading context argument.
#[derive(Debug)]
pub enum WithoutContext {}

/// Marker for handlers whose first argument is a [`RequestContext`].
#[derive(Debug)]
pub enum WithContext {}

/// A callable that can be registered as a JSON-RPC method.
pub trait Handler<M>: Send + Sync + 'static {
    /// The first argument is a [`RequestContext`]
    const NEEDS_CONTEXT: bool;
    /// Number of arguments, not counting the context
    const ARITY: usize;

    /// For each argument, whether its type can be bound from JSON `null`.
    fn zero_values() -> Vec<bool>;

    /// Convert the bound arguments and start the call.
    fn call(&self, ctx: RequestContext, args: Arguments<'_>) -> Result<HandlerFuture, BindError>;
}

fn binds_null<T: DeserializeOwned>() -> bool {
    serde_json::from_value::<T>(Value::Null).is_ok()
}

fn finish<Fut, R>(fut: Fut) -> HandlerFuture
where
    Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
    R: Serialize,
{
    async move {
        let result = fut.await.map_err(HandlerFailure::Rpc)?;
        serde_json::to_value(result).map_err(HandlerFailure::Encode)
    }
    .boxed()
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, $($ty,)*> Handler<(WithoutContext, ($($ty,)*))> for F
        where
            F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
            R: Serialize + Send + 'static,
            $($ty: DeserializeOwned + Serialize + Send + 'static,)*
        {
            const NEEDS_CONTEXT: bool = false;
            const ARITY: usize = <[&str]>::len(&[$(stringify!($ty)),*]);

            fn zero_values() -> Vec<bool> {
                vec![$(binds_null::<$ty>()),*]
            }

            fn call(&self, ctx: RequestContext, mut args: Arguments<'_>) -> Result<HandlerFuture, BindError> {
                $(let $ty = args.next::<$ty>()?;)*
                Ok(finish((self)($($ty),*)))
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, $($ty,)*> Handler<(WithContext, ($($ty,)*))> for F
        where
            F: Fn(RequestContext, $($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, RpcError>> + Send + 'static,
            R: Serialize + Send + 'static,
            $($ty: DeserializeOwned + Serialize + Send + 'static,)*
        {
            const NEEDS_CONTEXT: bool = true;
            const ARITY: usize = <[&str]>::len(&[$(stringify!($ty)),*]);

            fn zero_values() -> Vec<bool> {
                vec![$(binds_null::<$ty>()),*]
            }

            fn call(&self, ctx: RequestContext, mut args: Arguments<'_>) -> Result<HandlerFuture, BindError> {
                $(let $ty = args.next::<$ty>()?;)*
                Ok(finish((self)(ctx, $($ty),*)))
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::registry::Parameter;
    use serde_json::json;

    async fn add(a: i64, b: i64) -> Result<i64, RpcError> {
        Ok(a + b)
    }

    async fn with_ctx(ctx: RequestContext, name: Option<String>) -> Result<String, RpcError> {
        if ctx.is_cancelled() {
            return Err(RpcError::new(1, "cancelled", None));
        }
        Ok(name.unwrap_or_else(|| "anonymous".to_string()))
    }

    async fn nothing() -> Result<(), RpcError> {
        Ok(())
    }

    fn arity<H: Handler<M>, M>(_: &H) -> (usize, bool) {
        (<H as Handler<M>>::ARITY, <H as Handler<M>>::NEEDS_CONTEXT)
    }

    fn zeros<H: Handler<M>, M>(_: &H) -> Vec<bool> {
        <H as Handler<M>>::zero_values()
    }

    #[test]
    fn test_signature_metadata() {
        assert_eq!(arity(&add), (2, false));
        assert_eq!(arity(&with_ctx), (1, true));
        assert_eq!(arity(&nothing), (0, false));
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(zeros(&add), vec![false, false]);
        assert_eq!(zeros(&with_ctx), vec![true]);
        assert!(zeros(&nothing).is_empty());
    }

    #[tokio::test]
    async fn test_call_converts_and_encodes() {
        let params = [Parameter::required("a"), Parameter::required("b")];
        let args = Arguments::new(vec![json!(2), json!(40)], &params, None);

        let value = Handler::call(&add, RequestContext::new(), args).unwrap().await.unwrap();
        assert_eq!(value, json!(42));
    }

    #[tokio::test]
    async fn test_call_passes_context() {
        let params = [Parameter::optional("name")];
        let ctx = RequestContext::new();
        ctx.cancel();

        let args = Arguments::new(vec![Value::Null], &params, None);
        let outcome = Handler::call(&with_ctx, ctx, args).unwrap().await;
        assert!(matches!(outcome, Err(HandlerFailure::Rpc(e)) if e.code == 1));
    }

    #[tokio::test]
    async fn test_unit_result_encodes_null() {
        let args = Arguments::new(vec![], &[], None);
        let value = Handler::call(&nothing, RequestContext::new(), args).unwrap().await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_conversion_failure_names_param() {
        let params = [Parameter::required("a"), Parameter::required("b")];
        let args = Arguments::new(vec![json!(1), json!("two")], &params, None);

        match Handler::call(&add, RequestContext::new(), args) {
            Err(BindError::Conversion { param, .. }) => assert_eq!(param, "b"),
            other => panic!("expected conversion error, got {:?}", other.map(|_| ())),
        }
    }
}
