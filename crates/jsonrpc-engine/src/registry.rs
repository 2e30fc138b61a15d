//! Method metadata and the name → method registry.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::binder::{self, Arguments};
use crate::context::RequestContext;
use crate::error::{BindError, RegistrationError};
use crate::handler::{Handler, HandlerFuture};
use crate::request::RequestParams;
use crate::validate::Validator;

/// A declared handler parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

impl Parameter {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// Type-erased "convert arguments and call" entry point of one handler.
trait ErasedHandler: Send + Sync {
    fn invoke(&self, ctx: RequestContext, args: Arguments<'_>) -> Result<HandlerFuture, BindError>;
}

struct Erased<H, M> {
    handler: H,
    _marker: PhantomData<fn() -> M>,
}

impl<H, M> ErasedHandler for Erased<H, M>
where
    H: Handler<M>,
{
    fn invoke(&self, ctx: RequestContext, args: Arguments<'_>) -> Result<HandlerFuture, BindError> {
        Handler::call(&self.handler, ctx, args)
    }
}

/// A method the server can dispatch to.
///
/// Built once from a typed handler; the signature is inspected here and
/// never again on the request path.
#[derive(Clone)]
pub struct Method {
    name: String,
    params: Vec<Parameter>,
    needs_context: bool,
    arity: usize,
    zero_values: Vec<bool>,
    handler: Arc<dyn ErasedHandler>,
}

impl Method {
    /// `params` names the handler's arguments in order, not counting a
    /// leading [`RequestContext`].
    pub fn new<H, M>(name: impl Into<String>, params: Vec<Parameter>, handler: H) -> Self
    where
        H: Handler<M>,
        M: 'static,
    {
        Self {
            name: name.into(),
            params,
            needs_context: <H as Handler<M>>::NEEDS_CONTEXT,
            arity: <H as Handler<M>>::ARITY,
            zero_values: <H as Handler<M>>::zero_values(),
            handler: Arc::new(Erased {
                handler,
                _marker: PhantomData,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn needs_context(&self) -> bool {
        self.needs_context
    }

    /// Number of handler arguments, excluding the context
    pub fn arity(&self) -> usize {
        self.arity
    }

    fn check(&self) -> Result<(), RegistrationError> {
        if self.name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.arity != self.params.len() {
            return Err(RegistrationError::ArityMismatch {
                method: self.name.clone(),
                declared: self.params.len(),
                handler: self.arity,
            });
        }
        if let Some(param) = self
            .params
            .iter()
            .zip(&self.zero_values)
            .find_map(|(param, zero)| (param.optional && !zero).then_some(param))
        {
            return Err(RegistrationError::NoZeroValue {
                method: self.name.clone(),
                param: param.name.clone(),
            });
        }
        Ok(())
    }

    /// Bind `params`, convert them and start the handler.
    pub(crate) fn invoke(
        &self,
        ctx: RequestContext,
        params: Option<&RequestParams>,
        validator: Option<&dyn Validator>,
    ) -> Result<HandlerFuture, BindError> {
        let values = binder::bind_params(&self.params, params)?;
        let args = Arguments::new(values, &self.params, validator);
        self.handler.invoke(ctx, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("needs_context", &self.needs_context)
            .finish_non_exhaustive()
    }
}

/// Registered methods keyed by name.
///
/// Filled during setup and only read while serving.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    methods: HashMap<String, Method>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store `method`, replacing any method of the same name.
    /// An invalid method is not added.
    pub fn register(&mut self, method: Method) -> Result<(), RegistrationError> {
        method.check()?;
        let name = method.name.clone();
        if self.methods.insert(name.clone(), method).is_some() {
            warn!(method = %name, "Replaced previously registered method");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
