//! Minimal podium example — CRUD-style JSON endpoints over the hyper backend.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42

use http::StatusCode;
use podium::{Flow, Request, Response, ServiceServer, SettingsLayer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let shared = SettingsLayer { host: Some("0.0.0.0".into()), ..Default::default() };
    let options = SettingsLayer { name: Some("users-api".into()), ..Default::default() };
    let mut server = ServiceServer::hyper(&shared, options);

    server.pre(trace_path);
    server.get("/users/{id}", get_user);
    server.post_with_body_parser("/users", create_user);
    server.del("/users/{id}", delete_user);

    server.listen(3000).await.expect("bind failed");

    tokio::signal::ctrl_c().await.expect("signal handler failed");
    server.close().await.expect("close failed");
}

// Runs before routing for every request.
async fn trace_path(req: Request) -> Flow {
    tracing::info!(verb = %req.verb(), path = req.path(), "incoming");
    Flow::Forward(req)
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users — the body parser ran first; read the structured body.
async fn create_user(req: Request) -> Response {
    let Some(body) = req.parsed_body() else {
        return Response::status(StatusCode::BAD_REQUEST);
    };
    let name = body.get("name").and_then(|n| n.as_str()).unwrap_or("anonymous");
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(format!(r#"{{"id":"99","name":"{name}"}}"#).into_bytes())
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> Response {
    Response::status(StatusCode::NO_CONTENT)
}
