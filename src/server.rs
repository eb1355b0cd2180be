//! The validating service-server contract.
//!
//! [`ServiceServer`] is the layer host code talks to. It owns exactly one
//! [`Backend`], validates every registration before the backend sees it,
//! and tracks the lifecycle state (`active`, `port`).
//!
//! # Validation contract
//!
//! Registration methods return `bool`, not `Result`: a malformed
//! registration (empty path, empty chain, pattern the router rejects) logs
//! an error and returns `false`, with no partial side effect — the backend
//! is never invoked for input that fails validation. Lifecycle methods
//! return `Result`, because a failed bind or shutdown is an infrastructure
//! fault the caller must handle.
//!
//! # Lifecycle
//!
//! ```text
//! constructed ── listen() ok ──▶ active ── close() ──▶ inactive
//! ```
//!
//! `active` flips to true only after the backend confirms the bind, and
//! `port` records the port actually bound (ask for port 0 and read back
//! the kernel's choice). A bind failure leaves both untouched. `close`
//! resets `active` unconditionally, even when the backend reports a
//! shutdown error.

use tracing::{error, info};

use crate::backend::Backend;
use crate::config::{Settings, SettingsLayer};
use crate::error::Error;
use crate::handler::{BoxedStep, Chain, IntoChain, Middleware};
use crate::hyper_backend::HyperBackend;
use crate::verb::Verb;

/// A service server: one backend, one lifecycle, a validated registration
/// surface.
///
/// ```rust,no_run
/// use podium::{Request, Response, ServiceServer, SettingsLayer};
///
/// #[tokio::main]
/// async fn main() {
///     let mut server = ServiceServer::hyper(&SettingsLayer::default(), SettingsLayer::default());
///
///     server.get("/users/{id}", get_user);
///     server.post_with_body_parser("/users", create_user);
///
///     server.listen(3000).await.expect("bind failed");
/// }
///
/// async fn get_user(req: Request) -> Response {
///     let id = req.param("id").unwrap_or("unknown");
///     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
/// }
///
/// async fn create_user(req: Request) -> Response {
///     Response::json(req.parsed_body().cloned().unwrap_or_default().to_string().into_bytes())
/// }
/// ```
pub struct ServiceServer {
    backend: Box<dyn Backend>,
    settings: Settings,
    active: bool,
    port: Option<u16>,
}

impl ServiceServer {
    /// Resolves configuration from the shared and per-instance layers,
    /// then constructs the backend from the resolved settings.
    ///
    /// The factory is called exactly once. Construction never binds a
    /// socket; that happens in [`listen`](ServiceServer::listen).
    pub fn new<F>(shared: &SettingsLayer, options: SettingsLayer, factory: F) -> Self
    where
        F: FnOnce(&Settings) -> Box<dyn Backend>,
    {
        let settings = Settings::resolve(shared, options);
        let backend = factory(&settings);
        Self { backend, settings, active: false, port: None }
    }

    /// Constructs a server over the built-in hyper backend.
    pub fn hyper(shared: &SettingsLayer, options: SettingsLayer) -> Self {
        Self::new(shared, options, |settings| {
            Box::new(HyperBackend::new(settings.clone()))
        })
    }

    // ── State ─────────────────────────────────────────────────────────────

    /// Tag identifying the wrapped backend (`"hyper"` for the built-in one).
    pub fn server_type(&self) -> &'static str {
        self.backend.kind()
    }

    /// True only between a successful `listen` and the next `close`.
    pub fn active(&self) -> bool {
        self.active
    }

    /// The bound port, once active. `None` before the first successful listen.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The configuration this server was constructed with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Route registration ────────────────────────────────────────────────

    pub fn get(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Get, path, chain.into_chain())
    }

    pub fn put(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Put, path, chain.into_chain())
    }

    pub fn post(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Post, path, chain.into_chain())
    }

    pub fn del(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Del, path, chain.into_chain())
    }

    pub fn patch(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Patch, path, chain.into_chain())
    }

    pub fn opts(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Opts, path, chain.into_chain())
    }

    pub fn head(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.register(Verb::Head, path, chain.into_chain())
    }

    /// Raw forwarding: hands the chain to the backend with **no**
    /// validation. The validating verb methods above are the normal entry
    /// points; this exists for callers that have already validated.
    pub fn raw(&mut self, verb: Verb, path: &str, chain: impl IntoChain) -> bool {
        self.backend.route(verb, path, chain.into_chain())
    }

    /// Shared validation + forwarding behind the seven verb methods.
    fn register(&mut self, verb: Verb, path: &str, chain: Chain) -> bool {
        if path.is_empty() {
            error!(%verb, "route registration rejected: empty path");
            return false;
        }
        if chain.is_empty() {
            error!(%verb, path, "route registration rejected: no handlers supplied");
            return false;
        }
        self.backend.route(verb, path, chain)
    }

    // ── Middleware registration ───────────────────────────────────────────

    /// Registers request-scoped middleware, run on every routed request in
    /// registration order. One middleware per call; there is no implicit
    /// flattening of collections — register each step separately, in the
    /// order it should run.
    pub fn middleware(&mut self, mw: impl Middleware) -> bool {
        self.backend.middleware(mw.into_step());
        true
    }

    /// Registers pre-routing middleware, run before route matching for
    /// every incoming request, in registration order.
    pub fn pre(&mut self, mw: impl Middleware) -> bool {
        self.backend.pre(mw.into_step());
        true
    }

    /// The backend's body-parsing step, for callers that want to install
    /// it somewhere the `*_with_body_parser` family does not cover.
    pub fn body_parser(&self) -> BoxedStep {
        self.backend.body_parser()
    }

    // ── Body-parser convenience family ────────────────────────────────────

    pub fn get_with_body_parser(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.with_body_parser(Verb::Get, path, chain.into_chain())
    }

    pub fn put_with_body_parser(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.with_body_parser(Verb::Put, path, chain.into_chain())
    }

    pub fn post_with_body_parser(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.with_body_parser(Verb::Post, path, chain.into_chain())
    }

    pub fn del_with_body_parser(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.with_body_parser(Verb::Del, path, chain.into_chain())
    }

    pub fn patch_with_body_parser(&mut self, path: &str, chain: impl IntoChain) -> bool {
        self.with_body_parser(Verb::Patch, path, chain.into_chain())
    }

    /// Prepends the backend's body parser to the chain, then goes through
    /// the plain validating registration. Equivalent to installing the
    /// parser via [`middleware`](ServiceServer::middleware), but scoped to
    /// this one route. Generic over the backend: every adapter gets the
    /// convenience family for free.
    fn with_body_parser(&mut self, verb: Verb, path: &str, mut chain: Chain) -> bool {
        // Validate before composing, so an invalid registration does not
        // pointlessly construct a parser step.
        if path.is_empty() || chain.is_empty() {
            error!(%verb, path, "route registration rejected: empty path or no handlers");
            return false;
        }
        chain.prepend(self.backend.body_parser());
        self.register(verb, path, chain)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Binds and begins accepting connections on `port`.
    ///
    /// `active` and `port` are set only after the backend confirms the
    /// bind; a failed bind leaves the server inactive. Calling `listen` on
    /// an active server is a caller error and is rejected.
    pub async fn listen(&mut self, port: u16) -> Result<(), Error> {
        if self.active {
            return Err(Error::AlreadyActive);
        }

        match self.backend.listen(port).await {
            Ok(bound) => {
                self.active = true;
                self.port = Some(bound);
                info!(server = %self.settings.name, port = bound, "service server active");
                Ok(())
            }
            Err(e) => {
                error!(server = %self.settings.name, port, "listen failed: {e}");
                Err(e)
            }
        }
    }

    /// Stops accepting, drains in-flight requests, and releases the socket.
    ///
    /// `active` is reset unconditionally, even when the backend reports a
    /// shutdown error: after `close` returns, the server is not serving.
    pub async fn close(&mut self) -> Result<(), Error> {
        let result = self.backend.close().await;
        self.active = false;
        match &result {
            Ok(()) => info!(server = %self.settings.name, "service server closed"),
            Err(e) => error!(server = %self.settings.name, "close failed: {e}"),
        }
        result
    }
}
