//! End-to-end tests: a live hyper backend on an ephemeral port, driven
//! over real sockets.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::StatusCode;
use podium::{Chain, Flow, Request, Response, ServiceServer, SettingsLayer};
use serde_json::json;

/// A server bound to 127.0.0.1 on a kernel-assigned port.
fn local_server() -> ServiceServer {
    ServiceServer::hyper(
        &SettingsLayer { host: Some("127.0.0.1".into()), ..Default::default() },
        SettingsLayer::default(),
    )
}

fn url(server: &ServiceServer, path: &str) -> String {
    format!("http://127.0.0.1:{}{path}", server.port().expect("server not listening"))
}

#[tokio::test]
async fn lifecycle_routing_and_not_found() {
    let mut server = local_server();
    assert_eq!(server.server_type(), "hyper");
    assert!(!server.active());

    let hits = Arc::new(AtomicUsize::new(0));
    let handler = {
        let hits = Arc::clone(&hits);
        move |_req: Request| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Response::text("pong")
            }
        }
    };
    assert!(server.get("/ping", handler));

    server.listen(0).await.unwrap();
    assert!(server.active());
    let port = server.port().unwrap();
    assert_ne!(port, 0);

    let resp = reqwest::get(url(&server, "/ping")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "pong");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Unregistered path: 404, and no registered handler runs.
    let resp = reqwest::get(url(&server, "/missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    server.close().await.unwrap();
    assert!(!server.active());
    assert!(reqwest::get(format!("http://127.0.0.1:{port}/ping")).await.is_err());
}

#[tokio::test]
async fn routes_registered_after_listen_are_served() {
    let mut server = local_server();
    server.listen(0).await.unwrap();

    assert!(server.get("/late", |_req: Request| async { Response::text("late") }));

    let resp = reqwest::get(url(&server, "/late")).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "late");

    server.close().await.unwrap();
}

#[tokio::test]
async fn path_params_reach_the_handler() {
    let mut server = local_server();
    server.get("/users/{id}", |req: Request| async move {
        Response::text(req.param("id").unwrap_or("none").to_owned())
    });
    server.listen(0).await.unwrap();

    let resp = reqwest::get(url(&server, "/users/42")).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "42");

    server.close().await.unwrap();
}

#[tokio::test]
async fn post_with_body_parser_exposes_the_parsed_payload() {
    let mut server = local_server();
    server.post_with_body_parser("/users", |req: Request| async move {
        match req.parsed_body() {
            Some(body) => {
                // The digest rides along with the parsed value.
                assert_eq!(req.body_digest().map(str::len), Some(64));
                Response::json(body.to_string().into_bytes())
            }
            None => Response::status(StatusCode::BAD_REQUEST),
        }
    });
    server.listen(0).await.unwrap();

    let payload = json!({"name": "alice", "roles": ["admin", "dev"]});
    let resp = reqwest::Client::new()
        .post(url(&server, "/users"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<serde_json::Value>().await.unwrap(), payload);

    server.close().await.unwrap();
}

#[tokio::test]
async fn malformed_json_is_rejected_before_the_handler() {
    let mut server = local_server();
    fn must_not_run() -> Response {
        panic!("handler must not run for a malformed body")
    }
    server.post_with_body_parser("/users", |_req: Request| async { must_not_run() });
    server.listen(0).await.unwrap();

    let resp = reqwest::Client::new()
        .post(url(&server, "/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.close().await.unwrap();
}

#[derive(Clone, Default)]
struct Tags(Vec<&'static str>);

fn tag(name: &'static str) -> impl Fn(Request) -> Pin<Box<dyn Future<Output = Flow> + Send>> + Send + Sync + 'static {
    move |mut req: Request| {
        Box::pin(async move {
            req.extensions_mut().get_or_insert_default::<Tags>().0.push(name);
            Flow::Forward(req)
        })
    }
}

#[tokio::test]
async fn middleware_runs_in_registration_order_for_every_request() {
    let mut server = local_server();
    server.middleware(tag("a"));
    server.middleware(tag("b"));
    server.middleware(tag("c"));
    server.get("/tags", |req: Request| async move {
        let tags = req.extensions().get::<Tags>().cloned().unwrap_or_default();
        Response::text(tags.0.join(","))
    });
    server.listen(0).await.unwrap();

    for _ in 0..3 {
        let resp = reqwest::get(url(&server, "/tags")).await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "a,b,c");
    }

    server.close().await.unwrap();
}

#[tokio::test]
async fn pre_middleware_runs_before_routing() {
    let mut server = local_server();
    // A pre step may rewrite the path; routing sees the rewritten one.
    server.pre(|mut req: Request| async move {
        if req.path() == "/old" {
            req.set_path("/new");
        }
        Flow::Forward(req)
    });
    // And it may short-circuit paths that never match any route.
    server.pre(|req: Request| async move {
        if req.path() == "/blocked" {
            Flow::respond(StatusCode::SERVICE_UNAVAILABLE)
        } else {
            Flow::Forward(req)
        }
    });
    server.get("/new", |_req: Request| async { Response::text("routed") });
    server.listen(0).await.unwrap();

    let resp = reqwest::get(url(&server, "/old")).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "routed");

    let resp = reqwest::get(url(&server, "/blocked")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    server.close().await.unwrap();
}

#[tokio::test]
async fn per_route_chains_run_their_stages_first() {
    async fn require_token(req: Request) -> Flow {
        match req.header("x-token") {
            Some("secret") => Flow::Forward(req),
            _ => Flow::respond(StatusCode::UNAUTHORIZED),
        }
    }

    let mut server = local_server();
    server.get(
        "/private",
        Chain::new().stage(require_token).handler(|_req: Request| async { Response::text("in") }),
    );
    server.listen(0).await.unwrap();

    let client = reqwest::Client::new();
    let resp = client.get(url(&server, "/private")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(url(&server, "/private"))
        .header("x-token", "secret")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "in");

    server.close().await.unwrap();
}

#[tokio::test]
async fn a_failed_bind_leaves_the_server_inactive() {
    // Occupy a port first; podium's bind on the same port must then fail.
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut server = local_server();
    let err = server.listen(port).await.unwrap_err();
    assert!(matches!(err, podium::Error::Bind(_)));
    assert!(!server.active());
    assert_eq!(server.port(), None);
}
