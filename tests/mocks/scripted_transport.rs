use async_trait::async_trait;
use hubspot_mcp_server::client::{ApiRequest, ApiResponse, HttpMethod, RetryPolicy, Transport};
use hubspot_mcp_server::error::TransportError;
use hubspot_mcp_server::CrmClient;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted outcome for a route.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Scripted {
    Response(u16, String),
    Error(TransportError),
    /// Never completes; only the per-attempt timeout ends it
    Hang,
}

/// A request seen by the transport, with the (tokio) time it arrived.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ApiRequest,
    pub at: Instant,
}

struct Route {
    method: HttpMethod,
    path: String,
    outcomes: VecDeque<Scripted>,
}

/// Transport that replays scripted outcomes per `METHOD path` and records
/// every call. The last outcome of a route repeats once the queue drains.
/// Unscripted routes answer 404.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: HttpMethod, path: &str, outcome: Scripted) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.outcomes.push_back(outcome),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                outcomes: VecDeque::from(vec![outcome]),
            }),
        }
        self
    }

    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        self.on(method, path, Scripted::Response(status, body.to_string()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, method: HttpMethod, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.request.method == method && c.request.path == path)
            .collect()
    }

    /// Client over this transport with a 1s base delay and 30s attempt timeout.
    pub fn client(&self, max_attempts: u32) -> CrmClient {
        let policy = RetryPolicy {
            max_attempts,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        };
        CrmClient::with_transport(Arc::new(self.clone()) as Arc<dyn Transport>, policy)
    }

    fn next_outcome(&self, request: &ApiRequest) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.path == request.path);
        match route {
            Some(route) if route.outcomes.len() > 1 => route.outcomes.pop_front().unwrap(),
            Some(route) => route.outcomes.front().cloned().unwrap(),
            None => Scripted::Response(404, r#"{"message":"no scripted route"}"#.to_string()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            at: Instant::now(),
        });

        match self.next_outcome(request) {
            Scripted::Response(status, body) => Ok(ApiResponse::new(status, body)),
            Scripted::Error(error) => Err(error),
            Scripted::Hang => {
                std::future::pending::<()>().await;
                Err(TransportError::Timeout)
            }
        }
    }
}
