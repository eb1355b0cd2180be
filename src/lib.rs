//! # podium
//!
//! A pluggable HTTP service-server layer: one validating contract,
//! swappable backends.
//!
//! ## The contract
//!
//! Host code depends on [`ServiceServer`], not on an HTTP library. The
//! server validates every registration, tracks lifecycle state, and
//! forwards to whichever [`Backend`] it was constructed over. The backend
//! owns the sockets, the wire parsing, and the route matching — the
//! built-in [`HyperBackend`] delegates those to hyper, tokio, and matchit.
//! Swap the backend and the host code does not change.
//!
//! What the layer enforces, independent of backend:
//!
//! - **Validation** — malformed registrations (empty path, no handlers)
//!   return `false` and log; the backend is never invoked for them.
//! - **Lifecycle** — `active` flips true only after a verified bind, and
//!   back to false on close. A bind failure leaves the server inactive.
//! - **Configuration precedence** — per-instance options over shared
//!   settings over defaults, resolved once at construction.
//! - **Composition** — the `*_with_body_parser` registration family
//!   prepends the backend's body parser to any route's chain.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use podium::{Flow, Request, Response, ServiceServer, SettingsLayer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ServiceServer::hyper(
//!         &SettingsLayer::default(),
//!         SettingsLayer { name: Some("users-api".into()), ..Default::default() },
//!     );
//!
//!     server.pre(request_id);
//!     server.get("/users/{id}", get_user);
//!     server.post_with_body_parser("/users", create_user);
//!
//!     server.listen(3000).await.expect("bind failed");
//!     // ... later, from a shutdown path:
//!     server.close().await.expect("close failed");
//! }
//!
//! async fn request_id(req: Request) -> Flow {
//!     // decorate req.extensions_mut() here
//!     Flow::Forward(req)
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     match req.parsed_body() {
//!         Some(body) => Response::json(body.to_string().into_bytes()),
//!         None => Response::status(http::StatusCode::BAD_REQUEST),
//!     }
//! }
//! ```

mod backend;
mod body;
mod config;
mod error;
mod handler;
mod hyper_backend;
mod request;
mod response;
mod server;
mod verb;

pub use backend::Backend;
pub use body::{BodyDigest, ParsedBody};
pub use config::{Settings, SettingsLayer};
pub use error::Error;
pub use handler::{BoxedStep, Chain, Flow, Handler, IntoChain, Middleware};
pub use hyper_backend::{BACKEND_KIND, HyperBackend};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::ServiceServer;
pub use verb::Verb;
