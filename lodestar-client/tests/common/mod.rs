//! Shared test utilities for navigation integration tests
//!
//! Provides scripted collaborators (fetcher, prompter, credential provider)
//! and a `TestEnv` that wires them to stores in a temporary directory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lodestar_client::identity::GeneratedIdentity;
use lodestar_client::prompt::{
    InputRequest, RepairAction, RepairRequest, SelectionChoice, SelectionRequest,
};
use lodestar_client::{
    CredentialProvider, FetchRequest, Fetcher, Identity, IdentityStore, NavigationController,
    Prompter, SessionIdentityCache, Settings, TransportError,
};
use lodestar_common::hash::fingerprint_file;
use lodestar_common::protocol::Response;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Install a test logger (idempotent)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Credential Provider
// =============================================================================

/// Deterministic provider writing unique fake PEM text
#[derive(Default)]
pub struct TestProvider {
    counter: AtomicU64,
    expired: Mutex<HashSet<String>>,
}

impl TestProvider {
    /// Report the certificate currently at `cert_path` as expired
    pub fn mark_expired(&self, cert_path: &Path) {
        let fingerprint = fingerprint_file(cert_path).unwrap();
        self.expired.lock().unwrap().insert(fingerprint);
    }
}

impl CredentialProvider for TestProvider {
    fn generate_identity(
        &self,
        host: &str,
        key_size: u32,
        valid_days: u32,
    ) -> Result<GeneratedIdentity, String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedIdentity {
            cert_pem: format!("CERT {host} {key_size} {valid_days} {n}").into_bytes(),
            key_pem: format!("KEY {n}").into_bytes(),
        })
    }

    fn fingerprint(&self, cert_path: &Path) -> Result<String, String> {
        fingerprint_file(cert_path).map_err(|e| e.to_string())
    }

    fn is_expired(&self, cert_path: &Path) -> bool {
        match fingerprint_file(cert_path) {
            Ok(fingerprint) => self.expired.lock().unwrap().contains(&fingerprint),
            Err(_) => true,
        }
    }
}

// =============================================================================
// Fetcher
// =============================================================================

/// Holds a fetch until released
#[derive(Default)]
pub struct Gate {
    /// Signalled when the gated fetch starts
    pub started: Notify,
    /// Notify to let the gated fetch return
    pub release: Notify,
}

/// Fetcher answering from per-URL scripts
///
/// Each URL has a queue of results; the last one repeats. Unknown URLs
/// answer `51 Not found`.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<Response, TransportError>>>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    /// Queue a response for `url`
    pub fn respond(&self, url: &str, response: Response) {
        self.push(url, Ok(response));
    }

    /// Queue a transport failure for `url`
    pub fn fail(&self, url: &str, error: TransportError) {
        self.push(url, Err(error));
    }

    /// Make fetches of `url` wait until the gate is released
    pub fn gate(&self, url: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), gate.clone());
        gate
    }

    /// Every request issued so far
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// URLs requested so far
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Identity presented on the most recent request
    pub fn last_identity(&self) -> Option<uuid::Uuid> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.identity.as_ref().map(|m| m.id))
    }

    fn push(&self, url: &str, result: Result<Response, TransportError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    fn next(&self, url: &str) -> Result<Response, TransportError> {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(Response::new(51, "Not found")),
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<Response, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let gate = self.gates.lock().unwrap().get(&url).cloned();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        self.next(&url)
    }
}

// =============================================================================
// Prompter
// =============================================================================

/// Prompter answering from queues and recording every request
///
/// An empty queue answers `None` (dismissed).
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: Mutex<VecDeque<Option<String>>>,
    selections: Mutex<VecDeque<Option<SelectionChoice>>>,
    repairs: Mutex<VecDeque<Option<RepairAction>>>,
    hang: AtomicBool,
    /// Signalled whenever a prompt is shown
    pub prompt_started: Notify,
    pub input_requests: Mutex<Vec<InputRequest>>,
    pub selection_requests: Mutex<Vec<SelectionRequest>>,
    pub repair_requests: Mutex<Vec<RepairRequest>>,
}

impl ScriptedPrompter {
    pub fn answer_input(&self, answer: Option<&str>) {
        self.inputs
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_string));
    }

    pub fn answer_selection(&self, answer: Option<SelectionChoice>) {
        self.selections.lock().unwrap().push_back(answer);
    }

    pub fn answer_repair(&self, answer: Option<RepairAction>) {
        self.repairs.lock().unwrap().push_back(answer);
    }

    /// Make every prompt wait forever
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn selection_count(&self) -> usize {
        self.selection_requests.lock().unwrap().len()
    }

    async fn shown(&self) {
        self.prompt_started.notify_one();
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask_input(&self, request: InputRequest) -> Option<String> {
        self.input_requests.lock().unwrap().push(request);
        self.shown().await;
        self.inputs.lock().unwrap().pop_front().flatten()
    }

    async fn ask_identity_selection(&self, request: SelectionRequest) -> Option<SelectionChoice> {
        self.selection_requests.lock().unwrap().push(request);
        self.shown().await;
        self.selections.lock().unwrap().pop_front().flatten()
    }

    async fn ask_identity_repair(&self, request: RepairRequest) -> Option<RepairAction> {
        self.repair_requests.lock().unwrap().push(request);
        self.shown().await;
        self.repairs.lock().unwrap().pop_front().flatten()
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Stores in a temporary directory plus scripted collaborators
pub struct TestEnv {
    pub dir: TempDir,
    pub provider: Arc<TestProvider>,
    pub identities: Arc<Mutex<IdentityStore>>,
    pub session: Arc<Mutex<SessionIdentityCache>>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub prompter: Arc<ScriptedPrompter>,
}

impl TestEnv {
    pub fn new() -> Self {
        init_logging();

        let dir = TempDir::new().unwrap();
        let provider = Arc::new(TestProvider::default());
        let identities = IdentityStore::open(dir.path(), provider.clone());
        let session = SessionIdentityCache::load(&dir.path().join("session_identities.json"));

        Self {
            dir,
            provider,
            identities: Arc::new(Mutex::new(identities)),
            session: Arc::new(Mutex::new(session)),
            fetcher: Arc::new(ScriptedFetcher::default()),
            prompter: Arc::new(ScriptedPrompter::default()),
        }
    }

    pub fn controller(&self, settings: Settings) -> NavigationController {
        NavigationController::new(
            settings,
            self.identities.clone(),
            self.session.clone(),
            self.fetcher.clone(),
            self.prompter.clone(),
        )
    }

    /// Create an identity bound to `prefixes`
    pub fn identity(&self, name: &str, prefixes: &[&str]) -> Identity {
        let mut store = self.identities.lock().unwrap();
        let identity = store.create(name, "a.com", 2048, 365).unwrap();
        for prefix in prefixes {
            store.add_prefix(identity.id, prefix).unwrap();
        }
        store.get(identity.id).unwrap().clone()
    }

    /// Number of remembered session choices
    pub fn session_len(&self) -> usize {
        self.session.lock().unwrap().len()
    }
}

/// A `20 text/gemini` response with `body`
pub fn page(body: &str) -> Response {
    Response::success("text/gemini", body)
}
