//! The backend contract every concrete service-server provider satisfies.

use async_trait::async_trait;

use crate::error::Error;
use crate::handler::{BoxedStep, Chain};
use crate::verb::Verb;

/// Capability set of a concrete service-server backend: lifecycle, raw
/// route registration, middleware registration, and a body-parser factory.
///
/// A backend is selected once, at [`ServiceServer`](crate::ServiceServer)
/// construction, and is exclusively owned by that instance. It does all
/// socket and routing work through its underlying HTTP library; the
/// validating layer above it never touches the wire.
///
/// Implementations do **not** validate inputs. Validation (non-empty path,
/// non-empty chain) happens in the layer above, before any of these
/// methods are reached.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fixed tag identifying which library this backend wraps.
    fn kind(&self) -> &'static str;

    /// Hands an already-validated registration to the underlying router.
    ///
    /// Returns `false` only when the router itself rejects the path
    /// pattern (e.g. a conflicting wildcard); the rejection is logged, not
    /// panicked, so a bad registration never takes the process down.
    fn route(&mut self, verb: Verb, path: &str, chain: Chain) -> bool;

    /// Appends a request-scoped middleware step, run on every routed
    /// request in registration order.
    fn middleware(&mut self, step: BoxedStep);

    /// Appends a pre-routing middleware step, run before route matching in
    /// registration order.
    fn pre(&mut self, step: BoxedStep);

    /// Returns this backend's body-parsing middleware.
    ///
    /// The returned step is opaque to the validating layer; it is
    /// installed per-route by the `*_with_body_parser` family, or globally
    /// through [`middleware`](Backend::middleware).
    fn body_parser(&self) -> BoxedStep;

    /// Binds and begins accepting connections.
    ///
    /// Returns the actually bound port, which differs from `port` when the
    /// caller asked for `0`. Never called while already listening; the
    /// validating layer rejects that transition first.
    async fn listen(&mut self, port: u16) -> Result<u16, Error>;

    /// Stops accepting, drains in-flight connections, releases the socket.
    async fn close(&mut self) -> Result<(), Error>;
}
