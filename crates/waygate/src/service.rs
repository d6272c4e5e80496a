//! The identity service: logins, logouts, and the login timeout.
//!
//! This is the piece the host talks to. It owns the account store and at
//! most one pending login, and it is driven entirely by calls from the
//! owning thread: API calls, [`IdentityService::tick`], and completions.
//!
//! # Login flow
//!
//! ```text
//! login(slot) ──→ LoginSession::start ──→ presenter.present(url)
//!                                              │
//!      tick(dt) ×N  (timers advance)           │ user signs in
//!          │                                   ▼
//!          ├── completion queued? ──→ parse + verify state ──→ store account
//!          └── total ≥ budget?    ──→ Timeout
//!
//! every outcome ──→ IdentityEvent::LoginStatusChanged ──→ back to Idle
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use waygate_protocol::{
    parse_login_results, AccountRecord, LocalSlot, OnlineUser, UniquePlayerId,
};
use waygate_session::{AccountStore, LoginSession, LoginState};
use waygate_tick::TickGate;

use crate::collaborator::{Completion, CompletionSender, LoginPresenter};
use crate::config::{ProviderConfig, ValidatedConfig};
use crate::events::{IdentityEvent, Notifier, DEFAULT_EVENT_CAPACITY};
use crate::{IdentityError, LoginCredentials, LoginStatus, UserPrivilege};

/// A login waiting for its completion, plus the credentials to cache if
/// it succeeds.
struct PendingLogin {
    session: LoginSession,
    credentials: LoginCredentials,
}

/// Authenticates local users against an implicit-grant identity provider.
///
/// Single-threaded: every method runs on the owning thread. To share one
/// service between several owners, wrap it in an
/// [`IdentityHandle`](crate::IdentityHandle).
pub struct IdentityService {
    config: ProviderConfig,
    /// Validated once at construction. An `Err` makes every login fail.
    validated: Result<ValidatedConfig, IdentityError>,
    presenter: Box<dyn LoginPresenter>,
    store: AccountStore,
    pending: Option<PendingLogin>,
    gate: TickGate,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    notifier: Notifier,
    /// In memory only; forgotten on logout and at process exit.
    cached_credentials: HashMap<LocalSlot, LoginCredentials>,
}

impl IdentityService {
    /// Creates a service for the given provider.
    ///
    /// A bad configuration is not an error here: the service is still
    /// usable for queries, but every login fails with
    /// [`IdentityError::MissingConfiguration`].
    pub fn new(config: ProviderConfig, presenter: impl LoginPresenter) -> Self {
        let validated = config.validated();
        if let Err(e) = &validated {
            warn!(error = %e, "identity provider not configured, logins will fail");
        }

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            config,
            validated,
            presenter: Box::new(presenter),
            store: AccountStore::new(),
            pending: None,
            gate: TickGate::new(),
            completions_tx,
            completions_rx,
            notifier: Notifier::new(DEFAULT_EVENT_CAPACITY),
            cached_credentials: HashMap::new(),
        }
    }

    // -- Notifications and collaborators ----------------------------------

    /// Subscribes to login and logout notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.notifier.subscribe()
    }

    /// A sender the host uses to report completions.
    pub fn completion_sender(&self) -> CompletionSender {
        CompletionSender::new(self.completions_tx.clone())
    }

    // -- Login / logout ---------------------------------------------------

    /// Starts a login for `slot`.
    ///
    /// `Ok` only means the request was accepted and the authorization URL
    /// handed to the presenter. The outcome arrives later as an
    /// [`IdentityEvent::LoginStatusChanged`].
    ///
    /// # Errors
    /// - [`IdentityError::AlreadyLoggingIn`]: another login is pending;
    ///   it is left untouched
    /// - [`IdentityError::InvalidSlot`]: slot out of range
    /// - [`IdentityError::MissingConfiguration`]: provider not configured
    /// - [`IdentityError::Presenter`]: the presenter refused
    ///
    /// A rejected request is also published as a failed
    /// `LoginStatusChanged` for `slot`.
    pub fn login(
        &mut self,
        slot: LocalSlot,
        credentials: LoginCredentials,
    ) -> Result<(), IdentityError> {
        let result = self.begin_login(slot, credentials);
        if let Err(e) = &result {
            warn!(%slot, error = %e, "login request rejected");
            self.notifier.publish(IdentityEvent::LoginStatusChanged {
                slot,
                player_id: None,
                success: false,
                error: Some(e.clone()),
            });
        }
        result
    }

    fn begin_login(
        &mut self,
        slot: LocalSlot,
        credentials: LoginCredentials,
    ) -> Result<(), IdentityError> {
        if let Some(pending) = &self.pending {
            return Err(IdentityError::AlreadyLoggingIn(pending.session.slot()));
        }
        if !slot.is_within(self.config.max_local_slots) {
            return Err(IdentityError::InvalidSlot {
                slot,
                max: self.config.max_local_slots,
            });
        }
        let config = self.validated.as_ref().map_err(Clone::clone)?;

        let session = LoginSession::start(slot, config.timeout(), config.poll_interval());
        let url = config.authorization_url(session.authorization_state());
        self.presenter
            .present(slot, &url)
            .map_err(IdentityError::Presenter)?;

        info!(
            %slot,
            timeout_secs = config.timeout().as_secs_f64(),
            "login started, awaiting completion"
        );
        self.pending = Some(PendingLogin {
            session,
            credentials,
        });
        Ok(())
    }

    /// Repeats the last successful login of `slot` with its cached
    /// credentials.
    ///
    /// # Errors
    /// [`IdentityError::NoCachedCredentials`] if the slot has never
    /// completed a login (or logged out since). No notification is sent
    /// in that case. Otherwise the same errors as [`login`](Self::login).
    pub fn auto_login(&mut self, slot: LocalSlot) -> Result<(), IdentityError> {
        let Some(credentials) = self.cached_credentials.get(&slot).cloned() else {
            debug!(%slot, "auto-login skipped, no cached credentials");
            return Err(IdentityError::NoCachedCredentials(slot));
        };
        self.login(slot, credentials)
    }

    /// Signs the user on `slot` out and forgets their account.
    ///
    /// Publishes [`IdentityEvent::LogoutComplete`] either way.
    ///
    /// # Errors
    /// [`IdentityError::NoAccountForSlot`] if nobody is signed in there.
    pub fn logout(&mut self, slot: LocalSlot) -> Result<(), IdentityError> {
        let Some(account) = self.store.remove(slot) else {
            debug!(%slot, "logout of empty slot");
            self.notifier.publish(IdentityEvent::LogoutComplete {
                slot,
                success: false,
            });
            return Err(IdentityError::NoAccountForSlot(slot));
        };

        self.cached_credentials.remove(&slot);
        info!(%slot, player_id = %account.player_id(), "logged out");
        self.notifier.publish(IdentityEvent::LogoutComplete {
            slot,
            success: true,
        });
        Ok(())
    }

    // -- Completion -------------------------------------------------------

    /// Delivers a completion directly, bypassing the queue.
    ///
    /// Same rules as a queued completion: one for a slot other than the
    /// pending one, or with no login pending, is ignored. With
    /// `success == false` the attempt fails without parsing.
    pub fn on_login_complete(&mut self, slot: LocalSlot, payload: &str, success: bool) {
        match &self.pending {
            None => {
                warn!(%slot, "completion with no login outstanding, ignored");
                return;
            }
            Some(pending) if pending.session.slot() != slot => {
                warn!(
                    %slot,
                    pending_slot = %pending.session.slot(),
                    "completion for a slot that is not logging in, ignored"
                );
                return;
            }
            Some(_) => {}
        }
        let Some(pending) = self.pending.take() else {
            return;
        };

        debug!(%slot, success, "completion received");
        let outcome = if success {
            accept_results(&pending.session, payload)
        } else {
            Err(IdentityError::ProviderRejected)
        };

        match outcome {
            Ok(account) => {
                let player_id = self.store.register(slot, account);
                self.cached_credentials.insert(slot, pending.credentials);
                self.finish(slot, Ok(player_id));
            }
            Err(e) => self.finish(slot, Err(e)),
        }
    }

    /// Reports how an attempt ended. The service is `Idle` again.
    fn finish(&mut self, slot: LocalSlot, outcome: Result<UniquePlayerId, IdentityError>) {
        let state = match &outcome {
            Ok(player_id) => {
                info!(%slot, %player_id, "login succeeded");
                LoginState::Succeeded
            }
            Err(e) => {
                warn!(%slot, code = e.code(), error = %e, "login failed");
                if e.is_completion_failure() {
                    LoginState::Failed
                } else {
                    LoginState::TimedOut
                }
            }
        };
        debug!(%slot, from = %LoginState::AwaitingCompletion, to = %state, "login finished");

        let event = match outcome {
            Ok(player_id) => IdentityEvent::LoginStatusChanged {
                slot,
                player_id: Some(player_id),
                success: true,
                error: None,
            },
            Err(error) => IdentityEvent::LoginStatusChanged {
                slot,
                player_id: None,
                success: false,
                error: Some(error),
            },
        };
        self.notifier.publish(event);
    }

    // -- Ticking ----------------------------------------------------------

    /// Advances time by `dt`.
    ///
    /// `toggle` identifies the frame: a repeated value means another owner
    /// already ticked this frame, and the call does nothing. Pass a value
    /// that changes every frame (a frame counter, or a bit flipped each
    /// frame).
    pub fn tick(&mut self, dt: Duration, toggle: u64) {
        if self.gate.admit(toggle) {
            self.tick_login(dt);
        }
    }

    /// One step of the login state machine.
    fn tick_login(&mut self, dt: Duration) {
        let Some(pending) = self.pending.as_mut() else {
            // Anything still queued belongs to an attempt that is over.
            self.drain_completions();
            return;
        };

        let progress = pending.session.advance(dt);
        if progress.poll_due || progress.timed_out {
            self.drain_completions();
        }

        // The drain may have finished the attempt.
        let expired = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.session.is_expired());
        if expired {
            if let Some(pending) = self.pending.take() {
                let slot = pending.session.slot();
                let waited = pending.session.total_elapsed();
                self.finish(slot, Err(IdentityError::Timeout(waited)));
            }
        }
    }

    fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.on_login_complete(completion.slot, &completion.payload, completion.success);
        }
    }

    // -- State queries ----------------------------------------------------

    /// `Idle` or `AwaitingCompletion`. Terminal states are never resting
    /// states.
    pub fn login_state(&self) -> LoginState {
        if self.pending.is_some() {
            LoginState::AwaitingCompletion
        } else {
            LoginState::Idle
        }
    }

    /// Returns `true` while a login waits for its completion.
    pub fn is_login_outstanding(&self) -> bool {
        self.pending.is_some()
    }

    /// The slot of the pending login, if any.
    pub fn pending_slot(&self) -> Option<LocalSlot> {
        self.pending.as_ref().map(|p| p.session.slot())
    }

    /// Time the pending login has waited so far.
    pub fn pending_elapsed(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.session.total_elapsed())
    }

    // -- Account queries --------------------------------------------------

    /// Looks up an account by identity.
    pub fn user_account(&self, player_id: &UniquePlayerId) -> Option<&AccountRecord> {
        self.store.account(player_id)
    }

    /// A snapshot of every signed-in account. Order is unspecified.
    pub fn all_user_accounts(&self) -> Vec<AccountRecord> {
        self.store.accounts()
    }

    /// The identity signed in on `slot`.
    pub fn unique_player_id(&self, slot: LocalSlot) -> Option<&UniquePlayerId> {
        self.store.player_id(slot)
    }

    /// Builds an identity from its string form.
    ///
    /// # Errors
    /// [`IdentityError::ParseFailure`] for an empty string.
    pub fn create_unique_player_id(&self, value: &str) -> Result<UniquePlayerId, IdentityError> {
        Ok(value.parse()?)
    }

    /// Builds an identity from its byte form.
    ///
    /// # Errors
    /// [`IdentityError::ParseFailure`] for empty or non-UTF-8 bytes.
    pub fn create_unique_player_id_from_bytes(
        &self,
        bytes: &[u8],
    ) -> Result<UniquePlayerId, IdentityError> {
        Ok(UniquePlayerId::from_bytes(bytes)?)
    }

    /// Login status of the user on `slot`.
    pub fn login_status(&self, slot: LocalSlot) -> LoginStatus {
        status_of(self.store.account_for_slot(slot))
    }

    /// Login status of an identity. `LoggedIn` requires a stored account
    /// with a non-empty auth ticket.
    pub fn login_status_for(&self, player_id: &UniquePlayerId) -> LoginStatus {
        status_of(self.store.account(player_id))
    }

    /// Display name of the user on `slot`.
    pub fn player_nickname(&self, slot: LocalSlot) -> Option<String> {
        self.store.account_for_slot(slot).map(|a| a.display_name())
    }

    /// Display name of an identity.
    pub fn player_nickname_for(&self, player_id: &UniquePlayerId) -> Option<String> {
        self.store.account(player_id).map(|a| a.display_name())
    }

    /// Auth ticket of the user on `slot`, for bearer-authenticated calls.
    pub fn auth_token(&self, slot: LocalSlot) -> Option<&str> {
        self.store.account_for_slot(slot).map(AccountRecord::auth_ticket)
    }

    /// Reverse lookup: the slot an identity is signed in on.
    pub fn platform_slot_for(&self, player_id: &UniquePlayerId) -> Option<LocalSlot> {
        self.store.slot_of(player_id)
    }

    /// The configured auth type name.
    pub fn auth_type(&self) -> &str {
        &self.config.auth_type
    }

    /// Asks whether `player_id` holds `privilege`.
    ///
    /// This provider has no privilege concept. The callback runs before
    /// this method returns, with [`IdentityError::NotImplemented`]; treat
    /// that as "no restriction enforced".
    pub fn user_privilege<F>(&self, player_id: &UniquePlayerId, privilege: UserPrivilege, callback: F)
    where
        F: FnOnce(&UniquePlayerId, UserPrivilege, Result<(), IdentityError>),
    {
        debug!(%player_id, ?privilege, "privilege query answered as not implemented");
        callback(
            player_id,
            privilege,
            Err(IdentityError::NotImplemented("user privileges")),
        );
    }
}

/// Parses a payload and checks its echoed anti-forgery token.
fn accept_results(session: &LoginSession, payload: &str) -> Result<AccountRecord, IdentityError> {
    let results = parse_login_results(payload)?;
    if !session.verify_state(results.state.as_deref()) {
        return Err(IdentityError::AntiForgeryMismatch);
    }
    Ok(results.account)
}

fn status_of(account: Option<&AccountRecord>) -> LoginStatus {
    match account {
        Some(a) if a.has_auth_ticket() => LoginStatus::LoggedIn,
        _ => LoginStatus::NotLoggedIn,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for the login state machine.
    //!
    //! The presenter double captures the authorization URL so tests can
    //! pull out the anti-forgery token and echo it back like a real
    //! provider would.

    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingPresenter {
        urls: Arc<Mutex<Vec<(LocalSlot, String)>>>,
        refuse: bool,
    }

    impl RecordingPresenter {
        fn last_state(&self) -> String {
            let urls = self.urls.lock().unwrap();
            let (_, url) = urls.last().expect("a URL was presented");
            url.split('&')
                .find_map(|p| p.strip_prefix("state="))
                .expect("state parameter")
                .to_string()
        }

        fn count(&self) -> usize {
            self.urls.lock().unwrap().len()
        }
    }

    impl LoginPresenter for RecordingPresenter {
        fn present(&mut self, slot: LocalSlot, url: &str) -> Result<(), String> {
            if self.refuse {
                return Err("no browser".into());
            }
            self.urls.lock().unwrap().push((slot, url.to_string()));
            Ok(())
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            endpoint: "https://auth.example.com/authorize".into(),
            redirect_url: "https://game.example.com/cb".into(),
            client_id: "client".into(),
            ..ProviderConfig::default()
        }
    }

    fn service() -> (IdentityService, RecordingPresenter) {
        let presenter = RecordingPresenter::default();
        (IdentityService::new(config(), presenter.clone()), presenter)
    }

    fn slot(n: u32) -> LocalSlot {
        LocalSlot(n)
    }

    fn creds() -> LoginCredentials {
        LoginCredentials::of_kind("implicit")
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn payload(state: &str) -> String {
        format!("gameAccountId=A1&internalToken=sec&authTicket=tick&state={state}")
    }

    // =====================================================================
    // login()
    // =====================================================================

    #[test]
    fn test_login_accepts_and_presents_url() {
        let (mut svc, presenter) = service();

        svc.login(slot(0), creds()).expect("should accept");

        assert_eq!(svc.login_state(), LoginState::AwaitingCompletion);
        assert_eq!(svc.pending_slot(), Some(slot(0)));
        assert_eq!(presenter.count(), 1);
        assert_eq!(presenter.last_state().len(), 32);
    }

    #[test]
    fn test_login_while_pending_rejected_and_session_untouched() {
        let (mut svc, presenter) = service();
        svc.login(slot(0), creds()).unwrap();
        let token = presenter.last_state();
        svc.tick(secs(5), 1);

        let result = svc.login(slot(1), creds());

        assert_eq!(result, Err(IdentityError::AlreadyLoggingIn(slot(0))));
        assert_eq!(svc.pending_slot(), Some(slot(0)));
        assert_eq!(svc.pending_elapsed(), Some(secs(5)));
        assert_eq!(presenter.count(), 1);
        assert_eq!(presenter.last_state(), token);
    }

    #[test]
    fn test_login_invalid_slot_rejected() {
        let (mut svc, _) = service();

        let result = svc.login(slot(4), creds());

        assert_eq!(result, Err(IdentityError::InvalidSlot { slot: slot(4), max: 4 }));
        assert!(!svc.is_login_outstanding());
    }

    #[test]
    fn test_login_without_configuration_rejected() {
        let mut svc = IdentityService::new(ProviderConfig::default(), RecordingPresenter::default());

        let result = svc.login(slot(0), creds());

        assert!(matches!(result, Err(IdentityError::MissingConfiguration(_))));
        assert_eq!(svc.login_state(), LoginState::Idle);
    }

    #[test]
    fn test_login_with_out_of_range_config_fails_without_panicking() {
        let config = ProviderConfig::from_json(
            r#"{ "endpoint": "https://auth.example.com/authorize",
                 "redirect_url": "https://game.example.com/cb",
                 "client_id": "c", "timeout_secs": 1e30 }"#,
        )
        .unwrap();
        let mut svc = IdentityService::new(config, RecordingPresenter::default());

        let result = svc.login(slot(0), creds());

        assert!(matches!(result, Err(IdentityError::MissingConfiguration(_))));
        assert!(!svc.is_login_outstanding());
    }

    #[test]
    fn test_login_presenter_refusal_leaves_idle() {
        let presenter = RecordingPresenter {
            refuse: true,
            ..Default::default()
        };
        let mut svc = IdentityService::new(config(), presenter);

        let result = svc.login(slot(0), creds());

        assert_eq!(result, Err(IdentityError::Presenter("no browser".into())));
        assert!(!svc.is_login_outstanding());
    }

    #[test]
    fn test_login_rejection_publishes_failure() {
        let (mut svc, _) = service();
        let mut rx = svc.subscribe();

        let _ = svc.login(slot(9), creds());

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            IdentityEvent::LoginStatusChanged { success: false, error: Some(IdentityError::InvalidSlot { .. }), .. }
        ));
    }

    // =====================================================================
    // on_login_complete()
    // =====================================================================

    #[test]
    fn test_completion_with_matching_state_logs_in() {
        let (mut svc, presenter) = service();
        let mut rx = svc.subscribe();
        svc.login(slot(0), creds()).unwrap();

        svc.on_login_complete(slot(0), &payload(&presenter.last_state()), true);

        let id = svc.unique_player_id(slot(0)).cloned().expect("registered");
        assert_eq!(svc.login_status(slot(0)), LoginStatus::LoggedIn);
        assert_eq!(svc.login_status_for(&id), LoginStatus::LoggedIn);
        assert_eq!(svc.user_account(&id).unwrap().auth_ticket(), "tick");
        assert_eq!(svc.auth_token(slot(0)), Some("tick"));
        assert_eq!(svc.login_state(), LoginState::Idle);
        assert_eq!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged {
                slot: slot(0),
                player_id: Some(id),
                success: true,
                error: None,
            }
        );
    }

    #[test]
    fn test_completion_with_wrong_state_is_anti_forgery_mismatch() {
        let (mut svc, presenter) = service();
        let mut rx = svc.subscribe();
        svc.login(slot(0), creds()).unwrap();
        let wrong = presenter.last_state().to_uppercase();

        svc.on_login_complete(slot(0), &payload(&wrong), true);

        assert_eq!(svc.login_status(slot(0)), LoginStatus::NotLoggedIn);
        assert!(svc.all_user_accounts().is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged { success: false, error: Some(IdentityError::AntiForgeryMismatch), .. }
        ));
        assert_eq!(svc.login_state(), LoginState::Idle);
    }

    #[test]
    fn test_completion_without_state_is_anti_forgery_mismatch() {
        let (mut svc, _) = service();
        let mut rx = svc.subscribe();
        svc.login(slot(0), creds()).unwrap();

        svc.on_login_complete(slot(0), "gameAccountId=A1&authTicket=t", true);

        assert!(matches!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged { error: Some(IdentityError::AntiForgeryMismatch), .. }
        ));
    }

    #[test]
    fn test_completion_malformed_payload_is_parse_failure() {
        let (mut svc, presenter) = service();
        let mut rx = svc.subscribe();
        svc.login(slot(0), creds()).unwrap();

        svc.on_login_complete(slot(0), &format!("authTicket=t&state={}", presenter.last_state()), true);

        assert!(matches!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged { error: Some(IdentityError::ParseFailure(_)), .. }
        ));
        assert!(!svc.is_login_outstanding());
    }

    #[test]
    fn test_completion_unsuccessful_skips_parsing() {
        let (mut svc, presenter) = service();
        let mut rx = svc.subscribe();
        svc.login(slot(0), creds()).unwrap();

        // A perfectly good payload, but the collaborator says it failed.
        svc.on_login_complete(slot(0), &payload(&presenter.last_state()), false);

        assert_eq!(svc.login_status(slot(0)), LoginStatus::NotLoggedIn);
        assert!(matches!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged { error: Some(IdentityError::ProviderRejected), .. }
        ));
    }

    #[test]
    fn test_completion_for_other_slot_is_ignored() {
        let (mut svc, presenter) = service();
        svc.login(slot(0), creds()).unwrap();

        svc.on_login_complete(slot(1), &payload(&presenter.last_state()), true);

        assert_eq!(svc.pending_slot(), Some(slot(0)));
        assert!(svc.all_user_accounts().is_empty());
    }

    #[test]
    fn test_completion_while_idle_is_ignored() {
        let (mut svc, _) = service();
        let mut rx = svc.subscribe();

        svc.on_login_complete(slot(0), "gameAccountId=A1&authTicket=t", true);

        assert!(svc.all_user_accounts().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_login_after_failure_is_accepted() {
        let (mut svc, _) = service();
        svc.login(slot(0), creds()).unwrap();
        svc.on_login_complete(slot(0), "", false);

        assert!(svc.login(slot(0), creds()).is_ok());
    }

    #[test]
    fn test_completion_without_ticket_is_not_logged_in() {
        let (mut svc, presenter) = service();
        svc.login(slot(0), creds()).unwrap();

        svc.on_login_complete(
            slot(0),
            &format!("gameAccountId=A1&state={}", presenter.last_state()),
            true,
        );

        assert!(svc.unique_player_id(slot(0)).is_some());
        assert_eq!(svc.login_status(slot(0)), LoginStatus::NotLoggedIn);
    }

    // =====================================================================
    // tick()
    // =====================================================================

    #[test]
    fn test_tick_times_out_when_budget_reached() {
        let (mut svc, _) = service();
        let mut rx = svc.subscribe();
        svc.login(slot(0), creds()).unwrap();

        svc.tick(secs(20), 0);
        assert!(svc.is_login_outstanding());
        assert!(rx.try_recv().is_err());

        svc.tick(secs(15), 1);
        assert!(!svc.is_login_outstanding());
        assert_eq!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged {
                slot: slot(0),
                player_id: None,
                success: false,
                error: Some(IdentityError::Timeout(secs(35))),
            }
        );

        svc.tick(secs(15), 2);
        assert!(rx.try_recv().is_err(), "timeout fires exactly once");
    }

    #[test]
    fn test_tick_same_toggle_accumulates_once() {
        let (mut svc, _) = service();
        svc.login(slot(0), creds()).unwrap();

        svc.tick(secs(20), 7);
        svc.tick(secs(20), 7);
        svc.tick(secs(20), 7);

        assert_eq!(svc.pending_elapsed(), Some(secs(20)));
        assert!(svc.is_login_outstanding());
    }

    #[test]
    fn test_tick_drains_queued_completion_when_poll_due() {
        let (mut svc, presenter) = service();
        let sender = svc.completion_sender();
        svc.login(slot(0), creds()).unwrap();
        sender.complete(slot(0), payload(&presenter.last_state()), true);

        // Poll interval is 1s; half a second is not enough.
        svc.tick(Duration::from_millis(500), 1);
        assert!(svc.is_login_outstanding());

        svc.tick(Duration::from_millis(500), 2);
        assert!(!svc.is_login_outstanding());
        assert_eq!(svc.login_status(slot(0)), LoginStatus::LoggedIn);
    }

    #[test]
    fn test_tick_completion_on_timeout_tick_wins() {
        let (mut svc, presenter) = service();
        let mut rx = svc.subscribe();
        let sender = svc.completion_sender();
        svc.login(slot(0), creds()).unwrap();
        sender.complete(slot(0), payload(&presenter.last_state()), true);

        svc.tick(secs(31), 1);

        assert_eq!(svc.login_status(slot(0)), LoginStatus::LoggedIn);
        assert!(matches!(
            rx.try_recv().unwrap(),
            IdentityEvent::LoginStatusChanged { success: true, .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_tick_idle_discards_stale_completions() {
        let (mut svc, _) = service();
        let sender = svc.completion_sender();
        sender.complete(slot(0), "gameAccountId=A1&authTicket=t", true);

        svc.tick(secs(1), 1);

        assert!(svc.all_user_accounts().is_empty());
        assert!(svc.completions_rx.try_recv().is_err());
    }

    // =====================================================================
    // logout() / auto_login()
    // =====================================================================

    fn logged_in() -> (IdentityService, RecordingPresenter) {
        let (mut svc, presenter) = service();
        svc.login(slot(0), creds()).unwrap();
        svc.on_login_complete(slot(0), &payload(&presenter.last_state()), true);
        (svc, presenter)
    }

    #[test]
    fn test_logout_unknown_slot_fails_and_notifies() {
        let (mut svc, _) = service();
        let mut rx = svc.subscribe();

        assert_eq!(svc.logout(slot(2)), Err(IdentityError::NoAccountForSlot(slot(2))));
        assert_eq!(
            rx.try_recv().unwrap(),
            IdentityEvent::LogoutComplete { slot: slot(2), success: false }
        );
    }

    #[test]
    fn test_logout_logged_in_slot_clears_account() {
        let (mut svc, _) = logged_in();
        let id = svc.unique_player_id(slot(0)).cloned().unwrap();
        let mut rx = svc.subscribe();

        assert!(svc.logout(slot(0)).is_ok());

        assert_eq!(svc.login_status(slot(0)), LoginStatus::NotLoggedIn);
        assert!(svc.user_account(&id).is_none());
        assert_eq!(
            rx.try_recv().unwrap(),
            IdentityEvent::LogoutComplete { slot: slot(0), success: true }
        );
    }

    #[test]
    fn test_auto_login_without_cache_fails_closed() {
        let (mut svc, presenter) = service();
        let mut rx = svc.subscribe();

        assert_eq!(svc.auto_login(slot(0)), Err(IdentityError::NoCachedCredentials(slot(0))));
        assert_eq!(presenter.count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_auto_login_reuses_cached_credentials() {
        let (mut svc, presenter) = logged_in();

        assert!(svc.auto_login(slot(0)).is_ok());
        assert_eq!(presenter.count(), 2);
        assert!(svc.is_login_outstanding());
    }

    #[test]
    fn test_auto_login_after_logout_fails() {
        let (mut svc, _) = logged_in();
        svc.logout(slot(0)).unwrap();

        assert_eq!(svc.auto_login(slot(0)), Err(IdentityError::NoCachedCredentials(slot(0))));
    }

    // =====================================================================
    // Queries
    // =====================================================================

    #[test]
    fn test_nickname_and_reverse_lookup() {
        let (svc, _) = logged_in();
        let id = svc.unique_player_id(slot(0)).cloned().unwrap();

        assert_eq!(svc.player_nickname(slot(0)).as_deref(), Some("A1"));
        assert_eq!(svc.player_nickname_for(&id).as_deref(), Some("A1"));
        assert_eq!(svc.platform_slot_for(&id), Some(slot(0)));
        assert_eq!(svc.player_nickname(slot(1)), None);
        assert_eq!(svc.auth_token(slot(1)), None);
        assert_eq!(svc.auth_type(), "implicit");
    }

    #[test]
    fn test_create_unique_player_id_round_trip() {
        let (svc, _) = service();
        let id = svc.create_unique_player_id("A1").unwrap();
        let again = svc.create_unique_player_id_from_bytes(&id.to_bytes()).unwrap();
        assert_eq!(again, id);
        assert!(matches!(
            svc.create_unique_player_id(""),
            Err(IdentityError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_user_privilege_always_answers() {
        let (svc, _) = service();
        let id = svc.create_unique_player_id("A1").unwrap();
        let mut answered = None;

        svc.user_privilege(&id, UserPrivilege::CanPlayOnline, |who, privilege, result| {
            answered = Some((who.clone(), privilege, result));
        });

        assert_eq!(
            answered,
            Some((
                id,
                UserPrivilege::CanPlayOnline,
                Err(IdentityError::NotImplemented("user privileges"))
            ))
        );
    }
}
