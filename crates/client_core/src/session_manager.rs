use std::{fmt, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shared::{
    domain::{AccountName, SessionBackend},
    protocol::{ActionDescriptor, TransactResult},
};
use storage::{PendingSsoLogin, Storage, StoredSession};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{config::SessionSettings, error::SessionError};

/// How long a phase-one SSO redirect stays redeemable.
const SSO_PENDING_LOGIN_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactOptions {
    pub broadcast: bool,
}

/// An authenticated identity able to sign and submit transactions.
#[async_trait]
pub trait ChainSession: Send + Sync {
    fn actor(&self) -> &AccountName;
    fn permission(&self) -> &str;
    fn chain_id(&self) -> &str;
    /// Wallet plugin or SSO provider id, recorded for restore.
    fn provider(&self) -> &str;
    /// Opaque provider data needed to restore this session later.
    fn restore_payload(&self) -> Value {
        Value::Null
    }
    async fn transact(
        &self,
        actions: &[ActionDescriptor],
        options: TransactOptions,
    ) -> Result<TransactResult>;
}

/// Interactive wallet login (wallet selection and key approval live behind it).
#[async_trait]
pub trait WalletBackend: Send + Sync {
    async fn login(&self, chain_id: &str) -> Result<Arc<dyn ChainSession>>;
    async fn restore(&self, stored: &StoredSession) -> Result<Option<Arc<dyn ChainSession>>>;
    async fn logout(&self, session: &dyn ChainSession) -> Result<()>;
}

/// Redirect-based SSO identity provider.
#[async_trait]
pub trait SsoProvider: Send + Sync {
    async fn complete(&self, callback: &SsoCallback) -> Result<Arc<dyn ChainSession>>;
    async fn restore(&self, stored: &StoredSession) -> Result<Option<Arc<dyn ChainSession>>>;
    async fn logout(&self, session: &dyn ChainSession) -> Result<()>;
}

/// Page navigation owned by the embedding application.
pub trait Navigator: Send + Sync {
    fn redirect(&self, url: &Url);
    fn leave_session_view(&self);
}

pub struct MissingWalletBackend;

#[async_trait]
impl WalletBackend for MissingWalletBackend {
    async fn login(&self, _chain_id: &str) -> Result<Arc<dyn ChainSession>> {
        Err(anyhow!("wallet backend is unavailable"))
    }

    async fn restore(&self, _stored: &StoredSession) -> Result<Option<Arc<dyn ChainSession>>> {
        Ok(None)
    }

    async fn logout(&self, _session: &dyn ChainSession) -> Result<()> {
        Ok(())
    }
}

pub struct MissingSsoProvider;

#[async_trait]
impl SsoProvider for MissingSsoProvider {
    async fn complete(&self, _callback: &SsoCallback) -> Result<Arc<dyn ChainSession>> {
        Err(anyhow!("sso provider is unavailable"))
    }

    async fn restore(&self, _stored: &StoredSession) -> Result<Option<Arc<dyn ChainSession>>> {
        Ok(None)
    }

    async fn logout(&self, _session: &dyn ChainSession) -> Result<()> {
        Ok(())
    }
}

pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect(&self, url: &Url) {
        debug!(url = url.as_str(), "navigation: redirect ignored");
    }

    fn leave_session_view(&self) {}
}

/// Query parameters the SSO provider appends to the return URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoCallback {
    pub state: String,
    pub account: Option<AccountName>,
    pub permission: Option<String>,
    pub error: Option<String>,
}

impl SsoCallback {
    pub fn from_url(url: &Url) -> Result<Self, SessionError> {
        let mut state = None;
        let mut account = None;
        let mut permission = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "state" => state = Some(value.into_owned()),
                "account" => {
                    account = Some(AccountName::parse(&value).map_err(|err| {
                        SessionError::Sso(format!("callback carries invalid account: {err}"))
                    })?)
                }
                "permission" => permission = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        let state = state
            .filter(|state| !state.is_empty())
            .ok_or_else(|| SessionError::Sso("callback is missing the state parameter".into()))?;
        Ok(Self {
            state,
            account,
            permission,
            error,
        })
    }
}

/// A live session tagged with the backend that produced it.
#[derive(Clone)]
pub struct ActiveSession {
    pub backend: SessionBackend,
    pub session: Arc<dyn ChainSession>,
}

impl ActiveSession {
    fn new(backend: SessionBackend, session: Arc<dyn ChainSession>) -> Self {
        Self { backend, session }
    }

    pub fn actor(&self) -> &AccountName {
        self.session.actor()
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("backend", &self.backend)
            .field("actor", &self.session.actor().as_str())
            .field("permission", &self.session.permission())
            .field("provider", &self.session.provider())
            .finish()
    }
}

/// At most one session per backend.
#[derive(Clone, Default)]
pub struct SessionState {
    wallet: Option<Arc<dyn ChainSession>>,
    sso: Option<Arc<dyn ChainSession>>,
}

impl SessionState {
    pub fn get(&self, backend: SessionBackend) -> Option<ActiveSession> {
        let session = match backend {
            SessionBackend::Wallet => self.wallet.clone(),
            SessionBackend::Sso => self.sso.clone(),
        };
        session.map(|session| ActiveSession::new(backend, session))
    }

    /// The session `transact` submits through: wallet first, then SSO.
    pub fn current(&self) -> Option<ActiveSession> {
        self.get(SessionBackend::Wallet)
            .or_else(|| self.get(SessionBackend::Sso))
    }

    pub fn is_active(&self, backend: SessionBackend) -> bool {
        match backend {
            SessionBackend::Wallet => self.wallet.is_some(),
            SessionBackend::Sso => self.sso.is_some(),
        }
    }

    fn slot_mut(&mut self, backend: SessionBackend) -> &mut Option<Arc<dyn ChainSession>> {
        match backend {
            SessionBackend::Wallet => &mut self.wallet,
            SessionBackend::Sso => &mut self.sso,
        }
    }
}

pub struct SessionManager {
    settings: SessionSettings,
    store: Storage,
    wallet: Arc<dyn WalletBackend>,
    sso: Arc<dyn SsoProvider>,
    navigator: Arc<dyn Navigator>,
    // login, restore, logout and sso completion take it exclusively;
    // transact holds it shared for the whole broadcast
    lifecycle: RwLock<()>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(settings: SessionSettings, store: Storage) -> Self {
        Self::new_with_dependencies(
            settings,
            store,
            Arc::new(MissingWalletBackend),
            Arc::new(MissingSsoProvider),
            Arc::new(NoopNavigator),
        )
    }

    pub fn new_with_dependencies(
        settings: SessionSettings,
        store: Storage,
        wallet: Arc<dyn WalletBackend>,
        sso: Arc<dyn SsoProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            settings,
            store,
            wallet,
            sso,
            navigator,
            lifecycle: RwLock::new(()),
            state,
        }
    }

    pub fn current(&self) -> Option<ActiveSession> {
        self.state.borrow().current()
    }

    pub fn session(&self, backend: SessionBackend) -> Option<ActiveSession> {
        self.state.borrow().get(backend)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Interactive wallet login. Failure or cancellation is returned, never
    /// swallowed. A successful login replaces and logs out any wallet session
    /// that was already active.
    pub async fn login(&self) -> Result<ActiveSession, SessionError> {
        let _guard = self.lifecycle.write().await;

        let session = self
            .wallet
            .login(&self.settings.chain_id)
            .await
            .map_err(|err| {
                warn!(backend = "wallet", error = %err, "session: login failed");
                SessionError::Login(err)
            })?;

        Ok(self.activate(SessionBackend::Wallet, session).await)
    }

    /// Rebuilds sessions saved by earlier runs. A missing or unusable saved
    /// session leaves that backend logged out without reporting an error.
    pub async fn restore_session(&self) -> Option<ActiveSession> {
        let _guard = self.lifecycle.write().await;

        for backend in SessionBackend::ALL {
            if self.state.borrow().is_active(backend) {
                continue;
            }
            match self.restore_backend(backend).await {
                Ok(Some(session)) => {
                    info!(
                        backend = backend.as_str(),
                        actor = session.actor().as_str(),
                        "session: restored"
                    );
                    self.state
                        .send_modify(|state| *state.slot_mut(backend) = Some(session));
                }
                Ok(None) => debug!(backend = backend.as_str(), "session: nothing to restore"),
                Err(err) => {
                    debug!(backend = backend.as_str(), error = %err, "session: restore skipped")
                }
            }
        }

        self.current()
    }

    /// Ends every active session, then leaves session-gated views.
    pub async fn logout(&self) {
        let _guard = self.lifecycle.write().await;

        for backend in SessionBackend::ALL {
            let Some(session) = self.state.borrow().get(backend) else {
                continue;
            };

            self.end_backend_session(&session).await;
            self.state.send_modify(|state| *state.slot_mut(backend) = None);
            if let Err(err) = self.store.delete_session(backend).await {
                warn!(backend = backend.as_str(), error = %err, "session: failed to forget stored session");
            }
            info!(backend = backend.as_str(), actor = session.actor().as_str(), "session: logged out");
        }

        self.navigator.leave_session_view();
    }

    /// Submits exactly `actions`, once, through the current session. A logout
    /// issued meanwhile waits until the broadcast has returned.
    pub async fn transact(
        &self,
        actions: &[ActionDescriptor],
    ) -> Result<TransactResult, SessionError> {
        let _guard = self.lifecycle.read().await;
        let Some(active) = self.current() else {
            return Err(SessionError::NoSession);
        };

        info!(
            backend = active.backend.as_str(),
            actor = active.actor().as_str(),
            actions = actions.len(),
            "session: broadcasting transaction"
        );
        active
            .session
            .transact(actions, TransactOptions { broadcast: true })
            .await
            .map_err(SessionError::Transact)
    }

    /// SSO phase one: records the pending login and hands the browser to the
    /// provider. No session exists until [`Self::complete_tonomy_login`].
    pub async fn login_with_tonomy(&self) -> Result<Url, SessionError> {
        let _guard = self.lifecycle.write().await;

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(SSO_PENDING_LOGIN_TTL)
            .map_err(|err| SessionError::Sso(err.to_string()))?;
        if let Err(err) = self.store.purge_pending_sso_logins(now - ttl).await {
            debug!(error = %err, "session: failed to purge stale sso logins");
        }

        let state = Uuid::new_v4().simple().to_string();
        let mut url = self
            .settings
            .sso_origin
            .join("login")
            .map_err(|err| SessionError::Sso(format!("invalid sso origin: {err}")))?;
        url.query_pairs_mut()
            .append_pair("returnUrl", self.settings.return_url.as_str())
            .append_pair("state", &state);

        self.store
            .save_pending_sso_login(&PendingSsoLogin {
                state,
                return_url: self.settings.return_url.to_string(),
                created_at: now,
            })
            .await
            .map_err(SessionError::Storage)?;

        info!(url = url.as_str(), "session: redirecting to sso login");
        self.navigator.redirect(&url);
        Ok(url)
    }

    /// SSO phase two, run when the browser comes back to the return URL.
    pub async fn complete_tonomy_login(
        &self,
        callback_url: &Url,
    ) -> Result<ActiveSession, SessionError> {
        let _guard = self.lifecycle.write().await;

        let callback = SsoCallback::from_url(callback_url)?;
        let pending = self
            .store
            .take_pending_sso_login(&callback.state)
            .await
            .map_err(SessionError::Storage)?
            .ok_or_else(|| {
                SessionError::Sso("no pending sso login matches the returned state".into())
            })?;

        let age = Utc::now().signed_duration_since(pending.created_at);
        if age.to_std().unwrap_or_default() > SSO_PENDING_LOGIN_TTL {
            return Err(SessionError::Sso("sso login expired, start again".into()));
        }
        if !arrived_at(&pending.return_url, callback_url) {
            return Err(SessionError::Sso(format!(
                "callback arrived at {}, expected {}",
                callback_url.path(),
                pending.return_url
            )));
        }
        if let Some(error) = &callback.error {
            return Err(SessionError::Sso(format!("provider reported: {error}")));
        }

        let session = self.sso.complete(&callback).await.map_err(|err| {
            warn!(backend = "sso", error = %err, "session: sso completion failed");
            SessionError::Login(err)
        })?;

        Ok(self.activate(SessionBackend::Sso, session).await)
    }

    async fn activate(
        &self,
        backend: SessionBackend,
        session: Arc<dyn ChainSession>,
    ) -> ActiveSession {
        let stored = StoredSession {
            backend,
            chain_id: session.chain_id().to_string(),
            actor: session.actor().clone(),
            permission: session.permission().to_string(),
            provider: session.provider().to_string(),
            payload: session.restore_payload(),
            saved_at: Utc::now(),
        };
        // without a stored copy the session just won't survive a restart
        if let Err(err) = self.store.save_session(&stored).await {
            warn!(backend = backend.as_str(), error = %err, "session: failed to persist session");
        }

        let previous = self
            .state
            .borrow()
            .get(backend)
            .filter(|previous| !Arc::ptr_eq(&previous.session, &session));
        self.state
            .send_modify(|state| *state.slot_mut(backend) = Some(Arc::clone(&session)));
        info!(
            backend = backend.as_str(),
            actor = session.actor().as_str(),
            replaced = previous.is_some(),
            "session: logged in"
        );
        if let Some(previous) = previous {
            self.end_backend_session(&previous).await;
        }

        ActiveSession::new(backend, session)
    }

    async fn end_backend_session(&self, active: &ActiveSession) {
        let result = match active.backend {
            SessionBackend::Wallet => self.wallet.logout(active.session.as_ref()).await,
            SessionBackend::Sso => self.sso.logout(active.session.as_ref()).await,
        };
        if let Err(err) = result {
            warn!(
                backend = active.backend.as_str(),
                actor = active.actor().as_str(),
                error = %err,
                "session: backend logout failed"
            );
        }
    }

    async fn restore_backend(
        &self,
        backend: SessionBackend,
    ) -> Result<Option<Arc<dyn ChainSession>>> {
        let Some(stored) = self.store.load_session(backend).await? else {
            return Ok(None);
        };
        if stored.chain_id != self.settings.chain_id {
            return Err(anyhow!(
                "stored {backend} session belongs to chain {}",
                stored.chain_id
            ));
        }

        match backend {
            SessionBackend::Wallet => self.wallet.restore(&stored).await,
            SessionBackend::Sso => self.sso.restore(&stored).await,
        }
    }
}

/// Whether the browser came back to the return URL registered in phase one.
fn arrived_at(return_url: &str, callback: &Url) -> bool {
    Url::parse(return_url).is_ok_and(|expected| {
        expected.origin() == callback.origin() && expected.path() == callback.path()
    })
}

#[cfg(test)]
#[path = "tests/session_manager_tests.rs"]
mod tests;
