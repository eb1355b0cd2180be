//! The hyper-backed service-server backend.
//!
//! Binds the [`Backend`] contract onto the hyper ecosystem: tokio owns the
//! sockets, hyper parses the wire, [`matchit`] matches routes. This module
//! only translates validated registrations into those libraries' calls and
//! drives the request pipeline:
//!
//! ```text
//! collect body → pre steps → route lookup → use steps → route chain
//! ```
//!
//! A miss at route lookup answers `404` without invoking any handler; a
//! route chain that ends without responding answers `500`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use matchit::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::backend::Backend;
use crate::body;
use crate::config::Settings;
use crate::error::Error;
use crate::handler::{BoxedStep, Chain, Flow, run_steps};
use crate::request::Request;
use crate::response::Response;
use crate::verb::Verb;

/// Tag reported by [`Backend::kind`] for this adapter.
pub const BACKEND_KIND: &str = "hyper";

/// A [`Backend`] implementation on top of hyper + tokio + matchit.
///
/// Construction only allocates tables; nothing touches a socket until
/// [`listen`](Backend::listen). Routes and middleware registered after
/// `listen` are visible to subsequent requests.
pub struct HyperBackend {
    settings: Settings,
    inner: Arc<Inner>,
    running: Option<Running>,
}

/// State shared between the registration side and the accept loop.
struct Inner {
    settings: Settings,
    routes: RwLock<HashMap<Verb, Router<Arc<[BoxedStep]>>>>,
    pres: RwLock<Vec<BoxedStep>>,
    middlewares: RwLock<Vec<BoxedStep>>,
}

/// Handles for a live accept loop, held between `listen` and `close`.
struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HyperBackend {
    /// The server factory: called exactly once per provider instance, with
    /// the already-resolved configuration.
    pub fn new(settings: Settings) -> Self {
        let inner = Arc::new(Inner {
            settings: settings.clone(),
            routes: RwLock::new(HashMap::new()),
            pres: RwLock::new(Vec::new()),
            middlewares: RwLock::new(Vec::new()),
        });
        Self { settings, inner, running: None }
    }
}

#[async_trait::async_trait]
impl Backend for HyperBackend {
    fn kind(&self) -> &'static str {
        BACKEND_KIND
    }

    fn route(&mut self, verb: Verb, path: &str, chain: Chain) -> bool {
        let mut routes = self.inner.routes.write().unwrap();
        match routes.entry(verb).or_default().insert(path, chain.into_steps()) {
            Ok(()) => true,
            Err(e) => {
                error!(%verb, path, "route rejected by router: {e}");
                false
            }
        }
    }

    fn middleware(&mut self, step: BoxedStep) {
        self.inner.middlewares.write().unwrap().push(step);
    }

    fn pre(&mut self, step: BoxedStep) {
        self.inner.pres.write().unwrap().push(step);
    }

    fn body_parser(&self) -> BoxedStep {
        body::parser_step()
    }

    async fn listen(&mut self, port: u16) -> Result<u16, Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyActive);
        }

        let addr = format!("{}:{}", self.settings.host, port);
        let listener = TcpListener::bind(&addr).await.map_err(Error::Bind)?;
        let bound = listener.local_addr().map_err(Error::Bind)?.port();

        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(serve(listener, Arc::clone(&self.inner), signal));
        self.running = Some(Running { shutdown, task });

        info!(server = %self.settings.name, %addr, bound, "hyper backend listening");
        Ok(bound)
    }

    async fn close(&mut self) -> Result<(), Error> {
        let Some(running) = self.running.take() else {
            return Err(Error::NotListening);
        };

        // Ignore the send result: a loop that already exited is still closed.
        let _ = running.shutdown.send(true);
        running
            .task
            .await
            .map_err(|e| Error::Shutdown(std::io::Error::other(e)))?;

        info!(server = %self.settings.name, "hyper backend closed");
        Ok(())
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections until the shutdown signal fires, then drains every
/// in-flight connection before returning.
async fn serve(listener: TcpListener, inner: Arc<Inner>, mut signal: watch::Receiver<bool>) {
    // JoinSet tracks every spawned connection task so the drain below can
    // wait for them all.
    let mut tasks = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            // `biased` makes select! check arms top-to-bottom. Shutdown is
            // checked first so `close` stops new connections immediately,
            // even if more are queued.
            biased;

            _ = signal.changed() => {
                info!(in_flight = tasks.len(), "close requested, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let inner = Arc::clone(&inner);
                let mut conn_signal = signal.clone();
                // TokioIo adapts tokio's AsyncRead/AsyncWrite to the hyper
                // IO traits.
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // `service_fn` turns a plain async function into a hyper
                    // `Service`, called once per request on the connection.
                    let http2 = inner.settings.http2;
                    let svc = service_fn(move |req| {
                        let inner = Arc::clone(&inner);
                        async move { dispatch(inner, req).await }
                    });

                    // `auto::Builder` transparently serves both HTTP/1.1 and
                    // HTTP/2, whatever the client negotiates.
                    let mut builder = ConnBuilder::new(TokioExecutor::new());
                    if !http2 {
                        builder = builder.http1_only();
                    }
                    let conn = builder.serve_connection(io, svc);
                    tokio::pin!(conn);

                    let mut draining = false;
                    loop {
                        tokio::select! {
                            res = conn.as_mut() => {
                                if let Err(e) = res {
                                    error!(peer = %remote_addr, "connection error: {e}");
                                }
                                break;
                            }
                            // On close, ask hyper to finish the in-flight
                            // request and stop keep-alive, rather than waiting
                            // for the peer to hang up on an idle connection.
                            _ = conn_signal.changed(), if !draining => {
                                draining = true;
                                conn.as_mut().graceful_shutdown();
                            }
                        }
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    // Drain: wait for every in-flight connection to finish.
    while tasks.join_next().await.is_some() {}
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hot path wrapper. The error type is [`Infallible`]: every failure is
/// handled internally (404, 400, 500) so hyper never sees an error.
async fn dispatch(
    inner: Arc<Inner>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    Ok(handle(inner, req).await.into_http())
}

async fn handle(inner: Arc<Inner>, req: hyper::Request<hyper::body::Incoming>) -> Response {
    let (parts, body) = req.into_parts();

    // Methods outside the registerable verb set can never match a route.
    let Some(verb) = Verb::from_method(&parts.method) else {
        return Response::status(StatusCode::NOT_FOUND);
    };

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("failed to read request body: {e}");
            return Response::status(StatusCode::BAD_REQUEST);
        }
    };

    let request = Request::new(verb, parts.uri.path().to_owned(), parts.headers, body);

    // Pre-routing steps run before the route lookup, in registration order.
    // The step lists are cloned out of their locks before any await.
    let pres: Vec<BoxedStep> = inner.pres.read().unwrap().clone();
    let mut request = match run_steps(&pres, request).await {
        Flow::Forward(req) => req,
        Flow::Respond(resp) => return resp,
    };

    let Some((chain, params)) = inner.lookup(verb, request.path()) else {
        return Response::status(StatusCode::NOT_FOUND);
    };
    request.params = params;

    let middlewares: Vec<BoxedStep> = inner.middlewares.read().unwrap().clone();
    let request = match run_steps(&middlewares, request).await {
        Flow::Forward(req) => req,
        Flow::Respond(resp) => return resp,
    };

    match run_steps(&chain, request).await {
        Flow::Respond(resp) => resp,
        Flow::Forward(req) => {
            error!(verb = %req.verb(), path = req.path(), "route chain ended without a response");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

impl Inner {
    fn lookup(&self, verb: Verb, path: &str) -> Option<(Arc<[BoxedStep]>, HashMap<String, String>)> {
        let routes = self.routes.read().unwrap();
        let tree = routes.get(&verb)?;
        let matched = tree.at(path).ok()?;
        let chain = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((chain, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HyperBackend {
        HyperBackend::new(Settings::default())
    }

    async fn ok(_req: Request) -> Response {
        Response::text("ok")
    }

    #[test]
    fn conflicting_route_patterns_are_reported_not_panicked() {
        let mut backend = backend();
        assert!(backend.route(Verb::Get, "/users/{id}", Chain::new().handler(ok)));
        // Same pattern twice: matchit rejects the second insertion.
        assert!(!backend.route(Verb::Get, "/users/{id}", Chain::new().handler(ok)));
    }

    #[test]
    fn the_same_path_registers_independently_per_verb() {
        let mut backend = backend();
        assert!(backend.route(Verb::Get, "/users", Chain::new().handler(ok)));
        assert!(backend.route(Verb::Post, "/users", Chain::new().handler(ok)));
    }

    #[tokio::test]
    async fn close_without_listen_is_an_error() {
        let mut backend = backend();
        assert!(matches!(backend.close().await, Err(Error::NotListening)));
    }

    #[tokio::test]
    async fn listen_twice_is_rejected() {
        let mut backend = backend();
        backend.settings.host = "127.0.0.1".to_owned();
        backend.listen(0).await.unwrap();
        assert!(matches!(backend.listen(0).await, Err(Error::AlreadyActive)));
        backend.close().await.unwrap();
    }

    #[tokio::test]
    async fn listen_reports_the_kernel_assigned_port() {
        let mut backend = backend();
        backend.settings.host = "127.0.0.1".to_owned();
        let bound = backend.listen(0).await.unwrap();
        assert_ne!(bound, 0);
        backend.close().await.unwrap();
    }
}
