//! Handler and middleware traits, type erasure, and the [`Chain`] type.
//!
//! # The stage model
//!
//! Every piece of request-processing code is a *step*: an async stage that
//! receives the [`Request`] by value and returns a [`Flow`] telling the
//! pipeline what to do next. Returning the `Flow` is the completion signal;
//! a later step never runs before an earlier one has returned for the same
//! request, and a step can suspend on I/O as long as it likes first.
//!
//! Two kinds of user code become steps:
//!
//! - **Middleware** — `async fn(Request) -> Flow`. Decorates the request
//!   (or short-circuits with a response) and forwards it.
//! - **Handlers** — `async fn(Request) -> impl IntoResponse`. Terminal
//!   stages; their return value always ends the chain.
//!
//! # How steps are stored
//!
//! Route tables hold steps of *different* concrete types in one structure,
//! so each is erased behind `Arc<dyn ErasedStep>`. The chain from user code
//! to vtable call is:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ server.get("/", hello)
//! hello.into_step()                                ← Handler blanket impl
//!        ↓
//! Arc::new(HandlerStep(hello))                     ← heap-allocated wrapper
//!        ↓  stored as BoxedStep = Arc<dyn ErasedStep>
//! step.call(req)  at request time                  ← one vtable dispatch
//!        ↓
//! Box::pin(async { Flow::Respond(hello(req).await.into_response()) })
//! ```
//!
//! The only runtime cost per request is one Arc clone (atomic inc) plus
//! one virtual call per step, negligible next to network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Flow ──────────────────────────────────────────────────────────────────────

/// What a step tells the pipeline to do once it has finished.
///
/// A step returns exactly one `Flow`; single-fire completion is guaranteed
/// by construction rather than by convention.
pub enum Flow {
    /// This step is done; continue with the (possibly modified) request.
    Forward(Request),
    /// Short-circuit: send this response, skip every remaining step.
    Respond(Response),
}

impl Flow {
    /// Shorthand for short-circuiting with any [`IntoResponse`] value.
    pub fn respond(value: impl IntoResponse) -> Self {
        Self::Respond(value.into_response())
    }
}

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Pin<Box<…>>` because the runtime polls the future in-place; it must not
/// move in memory after the first poll. `Send + 'static` let tokio move it
/// across worker threads.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// [`BoxedStep`] alias used by the public [`Backend`](crate::Backend) trait.
#[doc(hidden)]
pub trait ErasedStep {
    fn call(&self, req: Request) -> BoxFuture<Flow>;
}

/// A heap-allocated, type-erased step shared across concurrent requests.
pub type BoxedStep = Arc<dyn ErasedStep + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid middleware function.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn name(req: Request) -> Flow`. The trait is sealed: only the
/// blanket impl below can satisfy it, which keeps the API surface stable.
pub trait Middleware: private::SealedMiddleware + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_step(self) -> BoxedStep;
}

/// Implemented for every valid terminal route handler.
///
/// Automatically satisfied for any
/// `async fn name(req: Request) -> impl IntoResponse`. Sealed, like
/// [`Middleware`].
pub trait Handler: private::SealedHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_step(self) -> BoxedStep;
}

/// The sealing module. The traits are private, so external crates cannot
/// name them and therefore cannot implement `Middleware` or `Handler` on
/// arbitrary types.
mod private {
    pub trait SealedMiddleware {}
    pub trait SealedHandler {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::SealedMiddleware for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    fn into_step(self) -> BoxedStep {
        Arc::new(MiddlewareStep(self))
    }
}

impl<F, Fut, R> private::SealedHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_step(self) -> BoxedStep {
        Arc::new(HandlerStep(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Newtype holding a concrete middleware `F`, bridging the typed world to
/// the trait-object world.
struct MiddlewareStep<F>(F);

impl<F, Fut> ErasedStep for MiddlewareStep<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Flow> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Flow> {
        Box::pin((self.0)(req))
    }
}

/// Newtype holding a concrete handler `F`. Handlers always terminate the
/// chain, so their result is mapped straight into [`Flow::Respond`].
struct HandlerStep<F>(F);

impl<F, Fut, R> ErasedStep for HandlerStep<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Flow> {
        let fut = (self.0)(req);
        Box::pin(async move { Flow::Respond(fut.await.into_response()) })
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered sequence of steps registered under one route.
///
/// Most routes are a single handler, passed bare:
///
/// ```rust,no_run
/// # use podium::{Request, Response};
/// # fn register(_: podium::Chain) {}
/// async fn get_user(req: Request) -> Response {
///     Response::text(req.param("id").unwrap_or("unknown").to_owned())
/// }
/// register(podium::Chain::new().handler(get_user));
/// ```
///
/// Routes with per-route middleware build the chain explicitly:
///
/// ```rust,no_run
/// # use podium::{Chain, Flow, Request, Response};
/// # async fn check_auth(req: Request) -> Flow { Flow::Forward(req) }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// Chain::new().stage(check_auth).handler(create_user);
/// ```
pub struct Chain {
    steps: Vec<BoxedStep>,
}

impl Chain {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a middleware stage.
    pub fn stage(mut self, mw: impl Middleware) -> Self {
        self.steps.push(mw.into_step());
        self
    }

    /// Appends a terminal handler. Steps after a handler never run.
    pub fn handler(mut self, h: impl Handler) -> Self {
        self.steps.push(h.into_step());
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Installs a step ahead of everything already in the chain. Used by
    /// the `*_with_body_parser` registration family.
    pub(crate) fn prepend(&mut self, step: BoxedStep) {
        self.steps.insert(0, step);
    }

    pub(crate) fn into_steps(self) -> Arc<[BoxedStep]> {
        self.steps.into()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversion into a [`Chain`], so registration methods accept either a
/// bare handler or an explicitly built chain.
pub trait IntoChain {
    fn into_chain(self) -> Chain;
}

impl IntoChain for Chain {
    fn into_chain(self) -> Chain {
        self
    }
}

impl<H: Handler> IntoChain for H {
    fn into_chain(self) -> Chain {
        Chain::new().handler(self)
    }
}

// ── Step execution ────────────────────────────────────────────────────────────

/// Runs `steps` in order, threading the request through each stage.
///
/// Returns [`Flow::Respond`] as soon as any step short-circuits, or
/// [`Flow::Forward`] with the final request when every step forwarded.
pub(crate) async fn run_steps(steps: &[BoxedStep], mut req: Request) -> Flow {
    for step in steps {
        match step.call(req).await {
            Flow::Forward(next) => req = next,
            done @ Flow::Respond(_) => return done,
        }
    }
    Flow::Forward(req)
}
