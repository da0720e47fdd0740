// Scripted stub of the message store for driving the client flows.
// An axum router on a private tokio runtime answers from a route table
// and records every request it sees.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;

use secret_post_cli::api::ApiClient;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Request path exactly as it appeared on the request line.
    pub path: String,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Fixed(u16, String),
    /// 200 with the body of the most recent POST.
    EchoLastPost,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: &'static str,
    pub path: String,
    pub reply: Reply,
}

pub fn route(method: &'static str, path: &str, status: u16, body: &str) -> Route {
    Route {
        method,
        path: path.to_string(),
        reply: Reply::Fixed(status, body.to_string()),
    }
}

pub fn echo(path: &str) -> Route {
    Route {
        method: "GET",
        path: path.to_string(),
        reply: Reply::EchoLastPost,
    }
}

#[derive(Clone)]
struct StubState {
    routes: Arc<Vec<Route>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub fn start(routes: Vec<Route>) -> Self {
        // Bound up front so the address is known before the runtime starts;
        // connections made in between wait in the backlog.
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        listener.set_nonblocking(true).expect("non-blocking listener");
        let addr = listener.local_addr().expect("stub server address");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            routes: Arc::new(routes),
            requests: Arc::clone(&requests),
        };

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                let app = Router::new().fallback(handle).with_state(state);
                let _ = axum::serve(listener, app).await;
            });
        });

        StubServer { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.url(), Duration::from_secs(5)).expect("client for stub server")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let request = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body,
    };

    let (status, body) = {
        let mut log = state.requests.lock().unwrap();
        let reply = reply_for(&state.routes, &request, &log);
        log.push(request);
        reply
    };

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
}

fn reply_for(routes: &[Route], request: &Recorded, log: &[Recorded]) -> (u16, String) {
    let matched = routes
        .iter()
        .find(|r| r.method == request.method && r.path == request.path);
    match matched.map(|r| &r.reply) {
        Some(Reply::Fixed(status, body)) => (*status, body.clone()),
        Some(Reply::EchoLastPost) => {
            let last = log.iter().rev().find(|r| r.method == "POST");
            (200, last.map(|r| r.body.clone()).unwrap_or_default())
        }
        None => (404, "no route".to_string()),
    }
}

/// Address nobody listens on.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind unused port");
    let addr = listener.local_addr().expect("unused port address");
    drop(listener);
    format!("http://{addr}")
}
