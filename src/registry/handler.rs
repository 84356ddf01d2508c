//! The uniform handler abstraction.
//!
//! Every capability, whatever its kind, is served by a [`Handler`]: it gets
//! the validated [`Arguments`] and the invocation's [`CallContext`], and
//! returns an [`Output`] or a [`HandlerError`]. Synchronous closures can be
//! registered through [`handler_fn`].

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::registry::context::CallContext;
use crate::registry::envelope::Output;
use crate::registry::validator::Arguments;

/// Executes one capability.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs the capability against validated arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the input is structurally valid but
    /// cannot be served.
    async fn call(&self, ctx: &CallContext, args: Arguments) -> Result<Output, HandlerError>;
}

/// Adapter turning a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&Arguments) -> Result<Output, HandlerError> + Send + Sync,
{
    async fn call(&self, _ctx: &CallContext, args: Arguments) -> Result<Output, HandlerError> {
        (self.0)(&args)
    }
}

/// Wraps a synchronous closure as a [`Handler`].
pub const fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Arguments) -> Result<Output, HandlerError> + Send + Sync,
{
    FnHandler(f)
}
