//! Browser login through a loopback callback.
//!
//! [`Authenticator::authenticate`] binds `127.0.0.1:{port}`, asks the
//! authorization server for a login URL that redirects back to
//! `http://localhost:{port}/callback`, opens it in the browser and waits for
//! exactly one of three things: a credential, an error, or the deadline.
//!
//! Each call gets its own listener and router. Two concurrent calls with the
//! same port are not supported; the second fails with
//! [`AuthError::ListenFailed`].

use std::{
    collections::HashMap,
    io,
    net::Ipv4Addr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use tokio::{
    net::TcpListener,
    sync::{Notify, oneshot},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::config::AuthenticatorOptions;

pub mod browser;
pub mod credential;
pub mod error;
pub mod page;
pub mod remote;

pub use browser::{BrowserLauncher, NoBrowser, SystemBrowser};
pub use credential::{Credential, mask_key};
pub use error::AuthError;
pub use remote::{AuthServer, ExchangeResponse};

/// Upper bound on waiting for the callback server to stop after the
/// session resolved.
const SERVER_DRAIN_LIMIT: Duration = Duration::from_secs(5);

type Outcome = Result<Credential, AuthError>;

/// Log in against `server_url` with default options and the system browser.
///
/// An empty `server_url` selects [`crate::config::DEFAULT_SERVER_URL`].
pub async fn authenticate(server_url: &str) -> Result<Credential, AuthError> {
    let options = AuthenticatorOptions::new(server_url)
        .map_err(|e| AuthError::AuthUrlRequestFailed(format!("invalid server URL: {e}")))?;
    Authenticator::new(options).authenticate().await
}

pub struct Authenticator {
    options: AuthenticatorOptions,
    server: AuthServer,
    browser: Box<dyn BrowserLauncher>,
}

impl Authenticator {
    pub fn new(options: AuthenticatorOptions) -> Self {
        let server = AuthServer::new(options.server_url.clone());
        Self { options, server, browser: Box::new(SystemBrowser) }
    }

    pub fn with_browser(mut self, browser: impl BrowserLauncher + 'static) -> Self {
        self.browser = Box::new(browser);
        self
    }

    pub fn options(&self) -> &AuthenticatorOptions {
        &self.options
    }

    /// Run one login and return the issued credential.
    ///
    /// The callback port is released before this returns, on every path.
    pub async fn authenticate(&self) -> Result<Credential, AuthError> {
        let deadline = Instant::now() + self.options.timeout;
        let mut session = AuthorizationSession::start(&self.options, &self.server, deadline).await?;

        let auth_url = match self.server.request_auth_url(session.callback_port).await {
            Ok(url) => url,
            Err(err) => {
                session.shutdown.notify_one();
                session.close().await;
                return Err(err);
            }
        };

        self.open_browser(&auth_url);
        session.wait().await
    }

    fn open_browser(&self, url: &str) {
        info!(%url, "opening browser for authentication");
        eprintln!("Opening browser for GitHub authentication...");

        if let Err(err) = self.browser.open(url) {
            warn!(error = %err, "could not open browser");
            eprintln!("Could not open browser automatically. Please open this URL manually:\n{url}");
        }
    }
}

/// State of one in-flight login: the bound callback server and the slot its
/// outcome is delivered through.
struct AuthorizationSession {
    callback_port: u16,
    deadline: Instant,
    timeout: Duration,
    outcome_rx: oneshot::Receiver<Outcome>,
    shutdown: Arc<Notify>,
    server_task: Option<JoinHandle<()>>,
}

impl AuthorizationSession {
    async fn start(
        options: &AuthenticatorOptions,
        server: &AuthServer,
        deadline: Instant,
    ) -> Result<Self, AuthError> {
        let port = options.callback_port;
        let listen_failed = |source| AuthError::ListenFailed { port, source };

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await.map_err(listen_failed)?;
        let callback_port = listener.local_addr().map_err(listen_failed)?.port();

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());

        let state = CallbackState {
            server: server.clone(),
            callback_port,
            outcome_tx: Arc::new(Mutex::new(Some(outcome_tx))),
            shutdown: shutdown.clone(),
            shutdown_grace: options.shutdown_grace,
        };

        let app = Router::new().route("/callback", get(handle_callback)).with_state(state);

        let signal = shutdown.clone();
        let server_task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.notified().await })
                .await;
            if let Err(err) = result {
                warn!(error = %err, "callback server stopped with an error");
            }
        });

        debug!(port = callback_port, "callback server listening");

        Ok(Self {
            callback_port,
            deadline,
            timeout: options.timeout,
            outcome_rx,
            shutdown,
            server_task: Some(server_task),
        })
    }

    async fn wait(mut self) -> Result<Credential, AuthError> {
        let outcome = match tokio::time::timeout_at(self.deadline, &mut self.outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                self.shutdown.notify_one();
                Err(AuthError::ListenFailed {
                    port: self.callback_port,
                    source: io::Error::other("callback server stopped before a login completed"),
                })
            }
            Err(_) => {
                self.shutdown.notify_one();
                Err(AuthError::Timeout(self.timeout))
            }
        };

        self.close().await;
        outcome
    }

    /// Wait for the callback server to stop, aborting it if it lingers.
    async fn close(&mut self) {
        let Some(mut task) = self.server_task.take() else {
            return;
        };

        if tokio::time::timeout(SERVER_DRAIN_LIMIT, &mut task).await.is_err() {
            warn!(port = self.callback_port, "callback server did not stop in time; aborting");
            task.abort();
            let _ = task.await;
        }
        debug!(port = self.callback_port, "callback server closed");
    }
}

impl Drop for AuthorizationSession {
    fn drop(&mut self) {
        if let Some(task) = self.server_task.take() {
            task.abort();
        }
    }
}

#[derive(Clone)]
struct CallbackState {
    server: AuthServer,
    callback_port: u16,
    outcome_tx: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
    shutdown: Arc<Notify>,
    shutdown_grace: Duration,
}

impl CallbackState {
    /// The first callback takes the outcome slot; later ones get `None`.
    fn claim(&self) -> Option<oneshot::Sender<Outcome>> {
        self.outcome_tx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn resolve(&self, tx: oneshot::Sender<Outcome>, outcome: Outcome) {
        if tx.send(outcome).is_err() {
            debug!("login already gave up waiting; dropping callback outcome");
        }

        let shutdown = self.shutdown.clone();
        let grace = self.shutdown_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            shutdown.notify_one();
        });
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(tx) = state.claim() else {
        warn!("ignoring repeated login callback");
        return (StatusCode::CONFLICT, "This login has already been completed.").into_response();
    };

    let Some(code) = params.get("code").filter(|code| !code.is_empty()).cloned() else {
        state.resolve(tx, Err(AuthError::MissingCode));
        return (StatusCode::BAD_REQUEST, "Authentication failed: No code provided").into_response();
    };

    // The exchange runs in its own task so that a browser hanging up mid-request
    // cannot cancel it and leave the login without an outcome.
    match tokio::spawn(exchange_code(state, code, tx)).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "code exchange task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed.").into_response()
        }
    }
}

async fn exchange_code(
    state: CallbackState,
    code: String,
    tx: oneshot::Sender<Outcome>,
) -> Response {
    match state.server.exchange_code(&code, state.callback_port).await {
        Ok(issued) => {
            let server_url = state.server.base_url().as_str().trim_end_matches('/').to_string();
            let credential =
                Credential::new(issued.api_key, server_url, Utc::now(), issued.github_user);
            let html = page::render_success(
                credential.principal(),
                credential.api_key(),
                credential.server_url(),
                credential.issued_at(),
            );

            info!(user = credential.principal(), "authentication successful");
            state.resolve(tx, Ok(credential));
            Html(html).into_response()
        }
        Err(err) => {
            warn!(error = %err, "code exchange failed");
            state.resolve(tx, Err(err));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication failed. Please check the terminal for details.",
            )
                .into_response()
        }
    }
}
