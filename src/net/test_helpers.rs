//! Shared fixtures for client tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::Notify;

use super::auth::{AuthClient, AuthEndpoints};
use super::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use super::types::{Session, UserProfile};
use crate::state::session::{MemoryStorage, SessionStorage, SessionStore, StorageError};

pub const LOGIN_URL: &str = "http://api.test/api/auth/login";
pub const REFRESH_URL: &str = "http://api.test/api/auth/refresh-token";
pub const PRODUCTS_URL: &str = "http://api.test/api/products";
pub const USERS_URL: &str = "http://api.test/api/users";

pub type Outcome = Result<HttpResponse, TransportError>;

/// Replays canned outcomes in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: RefCell<VecDeque<Outcome>>,
    requests: RefCell<Vec<HttpRequest>>,
    /// Yield once before answering so concurrent callers can interleave.
    pub yield_first: bool,
    /// When set, every answer waits for one permit from this gate.
    pub gate: Option<Rc<Notify>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }
}

#[async_trait::async_trait(?Send)]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        if self.yield_first {
            tokio::task::yield_now().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.outcomes.borrow_mut().pop_front() {
            Some(outcome) => outcome,
            None => Err(TransportError::Request("script exhausted".to_owned())),
        }
    }
}

/// Memory storage that rejects writes to `reject_key` once one is set.
#[derive(Default)]
pub struct RejectingStorage {
    inner: MemoryStorage,
    pub reject_key: Cell<Option<&'static str>>,
}

impl RejectingStorage {
    pub fn rejecting(key: &'static str) -> Rc<Self> {
        let storage = Rc::new(Self::default());
        storage.reject_key.set(Some(key));
        storage
    }
}

impl SessionStorage for RejectingStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_key.get() == Some(key) {
            return Err(StorageError::Write("quota exceeded".to_owned()));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) {
        self.inner.remove_item(key);
    }
}

/// A completed exchange with `status` and `body`.
pub fn reply(status: u16, body: impl Into<String>) -> Outcome {
    Ok(HttpResponse::new(status, body))
}

pub fn user() -> UserProfile {
    UserProfile {
        id: "u1".to_owned(),
        name: "Ana".to_owned(),
        email: "ana@example.com".to_owned(),
        role: "admin".to_owned(),
    }
}

pub fn session(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.to_owned(),
        refresh_token: refresh.to_owned(),
        user: user(),
    }
}

pub fn session_body(access: &str, refresh: &str) -> String {
    serde_json::to_string(&session(access, refresh)).unwrap()
}

pub fn endpoints() -> AuthEndpoints {
    AuthEndpoints {
        login_url: LOGIN_URL.to_owned(),
        refresh_url: REFRESH_URL.to_owned(),
    }
}

/// Client over `transport` with session `A1`/`R1` already stored.
pub fn logged_in_client_with(transport: ScriptedTransport) -> AuthClient<ScriptedTransport> {
    let store = SessionStore::in_memory();
    store.begin(&session("A1", "R1")).unwrap();
    AuthClient::new(transport, store, endpoints())
}

pub fn logged_in_client(outcomes: Vec<Outcome>) -> AuthClient<ScriptedTransport> {
    logged_in_client_with(ScriptedTransport::new(outcomes))
}

pub fn logged_out_client(outcomes: Vec<Outcome>) -> AuthClient<ScriptedTransport> {
    AuthClient::new(
        ScriptedTransport::new(outcomes),
        SessionStore::in_memory(),
        endpoints(),
    )
}
