//! Test support: logging setup and in-memory fakes for the external seams.

use std::collections::{BTreeMap, VecDeque};
use std::env;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::services::{LinkEvent, LinkProgress};
use crate::config::Settings;
use crate::domain::{ExchangedItem, LinkSession};
use crate::infrastructure::browser::BrowserLauncher;
use crate::infrastructure::callback::{AuthorizationListener, PendingAuthorization};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::plaid::{LinkTokenRequest, PlaidApi, PlaidApiError};
use crate::infrastructure::secrets::SecretStore;
use crate::infrastructure::traits::{Prompter, RealFileSystem};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let noisy_modules = ["hyper", "reqwest", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Settings rooted at `storage_dir` with dummy Plaid credentials.
pub fn test_settings(storage_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.storage_dir = storage_dir.to_path_buf();
    settings.banner = false;
    settings.plaid.client_id = Some("test-client".into());
    settings.plaid.secret = Some("test-secret".into());
    settings.callback.timeout_secs = 1;
    settings
}

/// Plaid double that answers from canned values and records every call.
pub struct FakePlaidApi {
    pub calls: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<LinkTokenRequest>>,
    session: LinkSession,
    public_token: Option<String>,
    items: Mutex<VecDeque<ExchangedItem>>,
    fail_create: bool,
}

impl FakePlaidApi {
    pub fn new(item_id: &str, access_token: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            session: LinkSession {
                link_token: "link-sandbox-token".into(),
                hosted_link_url: "https://hosted.plaid.com/link/abc".into(),
            },
            public_token: Some("public-sandbox-token".into()),
            items: Mutex::new(VecDeque::from([ExchangedItem {
                access_token: access_token.into(),
                item_id: item_id.into(),
            }])),
            fail_create: false,
        }
    }

    /// Link session completes without any item.
    pub fn without_public_token(mut self) -> Self {
        self.public_token = None;
        self
    }

    /// Queue the item returned by the following exchange.
    ///
    /// Exchanges consume queued items in order; the last one repeats.
    pub fn with_next_item(self, item_id: &str, access_token: &str) -> Self {
        self.items.lock().unwrap().push_back(ExchangedItem {
            access_token: access_token.into(),
            item_id: item_id.into(),
        });
        self
    }

    pub fn failing_link_token(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl PlaidApi for FakePlaidApi {
    fn create_link_token(&self, request: &LinkTokenRequest) -> Result<LinkSession, PlaidApiError> {
        self.record("create_link_token");
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_create {
            return Err(PlaidApiError::Api {
                status: 400,
                code: "INVALID_FIELD".into(),
                message: "bad request".into(),
            });
        }
        Ok(self.session.clone())
    }

    fn get_public_token(&self, link_token: &str) -> Result<Option<String>, PlaidApiError> {
        self.record(&format!("get_public_token:{link_token}"));
        Ok(self.public_token.clone())
    }

    fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedItem, PlaidApiError> {
        self.record(&format!("exchange_public_token:{public_token}"));
        let mut items = self.items.lock().unwrap();
        let item = if items.len() > 1 {
            items.pop_front()
        } else {
            items.front().cloned()
        };
        item.ok_or_else(|| PlaidApiError::Api {
            status: 400,
            code: "INVALID_PUBLIC_TOKEN".into(),
            message: "no item".into(),
        })
    }
}

/// Records opened URLs; optionally fails like a headless machine.
#[derive(Default)]
pub struct RecordingBrowser {
    pub opened: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingBrowser {
    pub fn failing() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no display"));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Listener whose authorization either arrives immediately or never.
pub struct FakeListener {
    authorized: bool,
}

impl FakeListener {
    pub fn authorized() -> Self {
        Self { authorized: true }
    }

    pub fn never_authorized() -> Self {
        Self { authorized: false }
    }
}

struct FakePending {
    authorized: bool,
}

impl PendingAuthorization for FakePending {
    fn wait(&self, _timeout: Duration) -> bool {
        self.authorized
    }

    fn is_complete(&self) -> bool {
        self.authorized
    }
}

impl AuthorizationListener for FakeListener {
    fn listen(&self) -> io::Result<Box<dyn PendingAuthorization>> {
        Ok(Box::new(FakePending {
            authorized: self.authorized,
        }))
    }
}

/// Answers prompts from a queue; an empty queue behaves like a closed stdin.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, message: &str) -> io::Result<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }
}

#[derive(Default)]
pub struct MemorySecretStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySecretStore {
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.lock().unwrap().clone()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<bool> {
        Ok(self.values.lock().unwrap().remove(key).is_some())
    }
}

/// Collects reported Link events.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<LinkEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<LinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LinkProgress for RecordingProgress {
    fn report(&self, event: LinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Fakes wired into a `ServiceContainer` over a real filesystem.
pub struct TestHarness {
    pub container: ServiceContainer,
    pub plaid: Arc<FakePlaidApi>,
    pub browser: Arc<RecordingBrowser>,
    pub secrets: Arc<MemorySecretStore>,
    pub prompter: Arc<ScriptedPrompter>,
}

impl TestHarness {
    pub fn new(storage_dir: &Path, answers: &[&str]) -> Self {
        Self::with(
            storage_dir,
            FakePlaidApi::new("item-1", "access-sandbox-1"),
            RecordingBrowser::default(),
            FakeListener::authorized(),
            answers,
        )
    }

    pub fn with(
        storage_dir: &Path,
        plaid: FakePlaidApi,
        browser: RecordingBrowser,
        listener: FakeListener,
        answers: &[&str],
    ) -> Self {
        let plaid = Arc::new(plaid);
        let browser = Arc::new(browser);
        let secrets = Arc::new(MemorySecretStore::default());
        let prompter = Arc::new(ScriptedPrompter::new(answers));
        let container = ServiceContainer::with_deps(
            test_settings(storage_dir),
            Arc::new(RealFileSystem),
            secrets.clone(),
            plaid.clone(),
            browser.clone(),
            Arc::new(listener),
            prompter.clone(),
        );
        Self {
            container,
            plaid,
            browser,
            secrets,
            prompter,
        }
    }
}
