//! Session lifecycle monitor: composition root of the session subsystem.
//!
//! Owns the state machine, wires the scheduler and the renewal coordinator
//! to the credential store, surfaces warning/countdown to the UI, and
//! performs auto-logout. The monitor is the only writer of [`SessionState`].

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{broadcast, mpsc, watch};

use super::clock::TokenClock;
use super::renewal::{RefreshApi, RenewalCoordinator, RenewalError};
use super::scheduler::{ExpiryScheduler, SchedulerEvent, SchedulerSignal};
use super::{SessionConfig, SessionEvent, SessionState};
use crate::auth::{Credential, CredentialVault};

/// UI-facing snapshot, published through a watch channel after every
/// transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub state: SessionState,
    pub show_expiration_warning: bool,
    pub seconds_until_expiry: u64,
    pub is_renewing: bool,
}

impl SessionView {
    fn idle(state: SessionState) -> Self {
        Self {
            state,
            show_expiration_warning: false,
            seconds_until_expiry: 0,
            is_renewing: false,
        }
    }

    fn warning(seconds_until_expiry: u64) -> Self {
        Self {
            state: SessionState::Warning,
            show_expiration_warning: true,
            seconds_until_expiry,
            is_renewing: false,
        }
    }
}

/// Handle to the monitor. Cheap to clone; all clones share one state machine.
#[derive(Clone)]
pub struct SessionMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    vault: CredentialVault,
    renewer: RenewalCoordinator,
    /// The scheduler mutex doubles as the critical section for every state
    /// transition that involves timers, so a stale countdown can never race
    /// a renewal commit.
    scheduler: tokio::sync::Mutex<ExpiryScheduler>,
    state: Mutex<SessionState>,
    view_tx: watch::Sender<SessionView>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl SessionMonitor {
    pub fn new(config: SessionConfig, vault: CredentialVault, api: Arc<dyn RefreshApi>) -> Self {
        Self::with_clock(config, vault, api, TokenClock::wall())
    }

    pub fn with_clock(
        config: SessionConfig,
        vault: CredentialVault,
        api: Arc<dyn RefreshApi>,
        clock: TokenClock,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let scheduler = ExpiryScheduler::new(config, clock, signal_tx);
        let (view_tx, _) = watch::channel(SessionView::idle(SessionState::Unauthenticated));
        let (events_tx, _) = broadcast::channel(16);

        let inner = Arc::new(Inner {
            vault: vault.clone(),
            renewer: RenewalCoordinator::new(api, vault),
            scheduler: tokio::sync::Mutex::new(scheduler),
            state: Mutex::new(SessionState::Unauthenticated),
            view_tx,
            events_tx,
        });

        spawn_signal_pump(Arc::downgrade(&inner), signal_rx);
        Self { inner }
    }

    /// Subscribe to lifecycle events (login, logout, state changes).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Reactive view for UI rendering.
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.inner.view_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    pub fn is_renewing(&self) -> bool {
        self.state() == SessionState::Renewing || self.inner.renewer.is_renewing()
    }

    pub async fn scheduler_active(&self) -> bool {
        self.inner.scheduler.lock().await.is_running()
    }

    /// Begin monitoring the stored credential. A no-op while unauthenticated.
    pub async fn start(&self) {
        let Some(credential) = self.inner.vault.get() else {
            tracing::debug!("monitor start ignored: no credential on record");
            return;
        };

        let mut scheduler = self.inner.scheduler.lock().await;
        *self.inner.state.lock().unwrap() = SessionState::Active;
        scheduler.start(credential).await;
        drop(scheduler);

        self.inner.publish(SessionView::idle(SessionState::Active));
        self.inner.emit(SessionEvent::AuthStateChanged(SessionState::Active));
    }

    /// Called by the authentication module after a successful login.
    pub async fn notify_login(&self, credential: Credential) {
        self.inner.vault.set(credential);
        self.inner.emit(SessionEvent::LoginSuccess);
        self.start().await;
    }

    /// Called by the authentication module on user-initiated logout.
    pub async fn notify_logout(&self) {
        self.auto_logout().await;
    }

    /// User chose to extend the session from the warning prompt.
    ///
    /// Exactly one renewal attempt per warning window: success returns the
    /// monitor to Active on the fresh credential, failure ends the session.
    pub async fn extend_session(&self) -> Result<(), RenewalError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                SessionState::Active | SessionState::Warning => {
                    *state = SessionState::Renewing;
                }
                SessionState::Renewing => return Err(RenewalError::AlreadyInFlight),
                SessionState::Unauthenticated | SessionState::Expired => {
                    return Err(RenewalError::NoSession);
                }
            }
        }
        self.inner.publish(SessionView {
            state: SessionState::Renewing,
            show_expiration_warning: false,
            seconds_until_expiry: 0,
            is_renewing: true,
        });
        self.inner.emit(SessionEvent::AuthStateChanged(SessionState::Renewing));

        match self.inner.renewer.renew().await {
            Ok(credential) => {
                let mut scheduler = self.inner.scheduler.lock().await;
                {
                    let mut state = self.inner.state.lock().unwrap();
                    if *state != SessionState::Renewing {
                        // Teardown raced the renewal; the store holds the
                        // fresh credential but nothing is monitoring it.
                        return Ok(());
                    }
                    *state = SessionState::Active;
                }
                // Restarting bumps the schedule generation, so a countdown
                // that ran out mid-renewal can never expire the new session.
                scheduler.start(credential).await;
                drop(scheduler);

                self.inner.publish(SessionView::idle(SessionState::Active));
                self.inner
                    .emit(SessionEvent::AuthStateChanged(SessionState::Active));
                Ok(())
            }
            Err(err) => {
                tracing::warn!("session renewal failed: {}", err);
                let mut scheduler = self.inner.scheduler.lock().await;
                let transitioned = {
                    let mut state = self.inner.state.lock().unwrap();
                    if *state == SessionState::Renewing {
                        *state = SessionState::Expired;
                        true
                    } else {
                        false
                    }
                };
                if transitioned {
                    self.inner
                        .emit(SessionEvent::AuthStateChanged(SessionState::Expired));
                    self.inner.finish_logout(&mut scheduler).await;
                }
                Err(err)
            }
        }
    }

    /// User dismissed the warning prompt. Idempotent.
    pub async fn reject_extension(&self) {
        let mut scheduler = self.inner.scheduler.lock().await;
        let transitioned = {
            let mut state = self.inner.state.lock().unwrap();
            if *state == SessionState::Warning {
                *state = SessionState::Expired;
                true
            } else {
                false
            }
        };
        if !transitioned {
            return;
        }
        self.inner
            .emit(SessionEvent::AuthStateChanged(SessionState::Expired));
        self.inner.finish_logout(&mut scheduler).await;
    }

    /// Terminal exit path: stop timers, clear credentials, notify
    /// collaborators. Safe to invoke repeatedly.
    pub async fn auto_logout(&self) {
        let mut scheduler = self.inner.scheduler.lock().await;
        self.inner.finish_logout(&mut scheduler).await;
    }

    /// Teardown without logout side effects, e.g. when the host UI goes
    /// away for reasons unrelated to expiry. Cancels every pending timer
    /// and leaves the stored credential untouched.
    pub async fn stop(&self) {
        let mut scheduler = self.inner.scheduler.lock().await;
        scheduler.stop().await;
        *self.inner.state.lock().unwrap() = SessionState::Unauthenticated;
        drop(scheduler);
        self.inner
            .publish(SessionView::idle(SessionState::Unauthenticated));
    }
}

impl Inner {
    fn publish(&self, view: SessionView) {
        self.view_tx.send_replace(view);
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; collaborators subscribe on demand.
        let _ = self.events_tx.send(event);
    }

    async fn handle_signal(&self, signal: SchedulerSignal) {
        let mut scheduler = self.scheduler.lock().await;
        if signal.generation != scheduler.generation() {
            // Superseded schedule; its timers were already cancelled.
            return;
        }
        match signal.event {
            SchedulerEvent::Warning(seconds) => self.on_warning(seconds),
            SchedulerEvent::Countdown(seconds) => self.on_countdown(seconds),
            SchedulerEvent::Expired => self.expire(&mut scheduler).await,
        }
    }

    fn on_warning(&self, seconds: u64) {
        {
            let mut state = self.state.lock().unwrap();
            if *state != SessionState::Active {
                return;
            }
            *state = SessionState::Warning;
        }
        tracing::info!(seconds, "session expiry warning");
        self.publish(SessionView::warning(seconds));
        self.emit(SessionEvent::AuthStateChanged(SessionState::Warning));
    }

    fn on_countdown(&self, seconds: u64) {
        if *self.state.lock().unwrap() != SessionState::Warning {
            return;
        }
        self.publish(SessionView::warning(seconds));
    }

    async fn expire(&self, scheduler: &mut ExpiryScheduler) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                SessionState::Active | SessionState::Warning => {
                    *state = SessionState::Expired;
                }
                // A renewal in flight resolves the session itself; anything
                // else is already past expiry handling.
                _ => return,
            }
        }
        self.emit(SessionEvent::AuthStateChanged(SessionState::Expired));
        self.finish_logout(scheduler).await;
    }

    /// The single exit path from any terminal condition. Caller holds the
    /// scheduler; the store is cleared only after timers are gone.
    async fn finish_logout(&self, scheduler: &mut ExpiryScheduler) {
        let was = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut *state, SessionState::Unauthenticated)
        };
        if was == SessionState::Unauthenticated {
            return;
        }

        scheduler.stop().await;
        self.vault.clear();
        self.publish(SessionView::idle(SessionState::Unauthenticated));
        self.emit(SessionEvent::Logout);
        self.emit(SessionEvent::AuthStateChanged(SessionState::Unauthenticated));
        tracing::info!("session ended, credentials cleared");
    }
}

/// Forwards scheduler signals to the monitor. Holds only a weak reference,
/// so dropping the last monitor handle shuts the pump down.
fn spawn_signal_pump(inner: Weak<Inner>, mut signals: mpsc::UnboundedReceiver<SchedulerSignal>) {
    tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.handle_signal(signal).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time;

    const NOW: i64 = 1_700_000_000;

    fn credential(access_token: &str, expires_in: u64) -> Credential {
        Credential::new(
            access_token.to_string(),
            "refresh".to_string(),
            DateTime::from_timestamp(NOW, 0).unwrap(),
            expires_in,
        )
    }

    struct StubApi {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        result: Result<Credential, ()>,
    }

    impl StubApi {
        fn ok(cred: Credential) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: None,
                result: Ok(cred),
            })
        }

        fn rejected() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: None,
                result: Err(()),
            })
        }

        fn gated(cred: Credential, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Some(gate),
                result: Ok(cred),
            })
        }
    }

    #[async_trait]
    impl RefreshApi for StubApi {
        async fn refresh(&self, _refresh_token: &str) -> Result<Credential, RenewalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            self.result
                .clone()
                .map_err(|_| RenewalError::Rejected("invalid refresh token".to_string()))
        }
    }

    struct Fixture {
        monitor: SessionMonitor,
        vault: CredentialVault,
        manual: Arc<ManualClock>,
        events: broadcast::Receiver<SessionEvent>,
        api: Arc<StubApi>,
    }

    fn fixture(stored: Option<Credential>, api: Arc<StubApi>) -> Fixture {
        let manual = ManualClock::at(NOW);
        let vault = CredentialVault::new(stored);
        let monitor = SessionMonitor::with_clock(
            SessionConfig::default(),
            vault.clone(),
            api.clone(),
            TokenClock::with_source(manual.clone()),
        );
        let events = monitor.subscribe();
        Fixture {
            monitor,
            vault,
            manual,
            events,
            api,
        }
    }

    /// Advance both clocks in lockstep and let the scheduler task and the
    /// signal pump observe the new time.
    async fn advance(manual: &ManualClock, secs: u64) {
        manual.advance(secs as i64);
        time::advance(Duration::from_secs(secs)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn logouts(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Logout))
            .count()
    }

    /// Walk a monitor that started with a 45s credential into the warning
    /// window (threshold 30 is crossed by the poll at t=15).
    async fn into_warning(fx: &mut Fixture) {
        fx.monitor.start().await;
        for _ in 0..3 {
            advance(&fx.manual, 5).await;
        }
        assert_eq!(fx.monitor.state(), SessionState::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_credential_is_a_no_op() {
        let mut fx = fixture(None, StubApi::rejected());
        fx.monitor.start().await;

        assert_eq!(fx.monitor.state(), SessionState::Unauthenticated);
        assert!(!fx.monitor.scheduler_active().await);
        assert!(drain(&mut fx.events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stays_active_above_threshold() {
        let mut fx = fixture(Some(credential("tok", 120)), StubApi::rejected());
        fx.monitor.start().await;

        for _ in 0..12 {
            advance(&fx.manual, 5).await;
        }

        assert_eq!(fx.monitor.state(), SessionState::Active);
        let view = fx.monitor.view().borrow().clone();
        assert!(!view.show_expiration_warning);
        assert_eq!(logouts(&drain(&mut fx.events)), 0);

        fx.monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn warning_surfaces_remaining_seconds() {
        let mut fx = fixture(Some(credential("tok", 45)), StubApi::rejected());
        into_warning(&mut fx).await;

        let view = fx.monitor.view().borrow().clone();
        assert!(view.show_expiration_warning);
        assert_eq!(view.seconds_until_expiry, 30);

        let events = drain(&mut fx.events);
        let warnings = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::AuthStateChanged(SessionState::Warning)))
            .count();
        assert_eq!(warnings, 1);

        // Countdown keeps the view fresh without re-entering Warning.
        advance(&fx.manual, 3).await;
        let view = fx.monitor.view().borrow().clone();
        assert_eq!(view.seconds_until_expiry, 27);
        assert!(drain(&mut fx.events)
            .iter()
            .all(|e| !matches!(e, SessionEvent::AuthStateChanged(SessionState::Warning))));

        fx.monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn successful_extend_recomputes_from_the_new_credential() {
        let mut fx = fixture(
            Some(credential("old", 45)),
            StubApi::ok(credential("new", 3600)),
        );
        into_warning(&mut fx).await;

        fx.monitor.extend_session().await.unwrap();

        assert_eq!(fx.monitor.state(), SessionState::Active);
        let stored = fx.vault.get().unwrap();
        assert_eq!(stored.access_token, "new");
        assert_eq!(stored.expires_in, 3600);

        let view = fx.monitor.view().borrow().clone();
        assert!(!view.show_expiration_warning);
        assert!(!view.is_renewing);

        fx.monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn orphaned_countdown_cannot_expire_a_renewed_session() {
        let mut fx = fixture(
            Some(credential("old", 45)),
            StubApi::ok(credential("new", 3600)),
        );
        into_warning(&mut fx).await;

        // Run the countdown close to exhaustion, then renew.
        for _ in 0..25 {
            advance(&fx.manual, 1).await;
        }
        assert_eq!(fx.monitor.state(), SessionState::Warning);
        fx.monitor.extend_session().await.unwrap();
        drain(&mut fx.events);

        // Well past where the old countdown and safety net would have fired.
        for _ in 0..4 {
            advance(&fx.manual, 5).await;
        }

        assert_eq!(fx.monitor.state(), SessionState::Active);
        assert_eq!(logouts(&drain(&mut fx.events)), 0);

        fx.monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_extend_logs_out_exactly_once() {
        let mut fx = fixture(Some(credential("tok", 45)), StubApi::rejected());
        into_warning(&mut fx).await;

        let err = fx.monitor.extend_session().await.unwrap_err();
        assert!(matches!(err, RenewalError::Rejected(_)));

        assert_eq!(fx.monitor.state(), SessionState::Unauthenticated);
        assert!(fx.vault.get().is_none());
        assert!(!fx.monitor.scheduler_active().await);

        let events = drain(&mut fx.events);
        assert_eq!(logouts(&events), 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::AuthStateChanged(SessionState::Expired))));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_extend_does_not_hit_the_network_twice() {
        let gate = Arc::new(Notify::new());
        let mut fx = fixture(
            Some(credential("old", 45)),
            StubApi::gated(credential("new", 3600), gate.clone()),
        );
        into_warning(&mut fx).await;

        let first = tokio::spawn({
            let monitor = fx.monitor.clone();
            async move { monitor.extend_session().await }
        });
        tokio::task::yield_now().await;
        assert!(fx.monitor.is_renewing());

        let second = fx.monitor.extend_session().await;
        assert!(matches!(second, Err(RenewalError::AlreadyInFlight)));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(fx.api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.monitor.state(), SessionState::Active);

        fx.monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reject_extension_is_idempotent() {
        let mut fx = fixture(Some(credential("tok", 45)), StubApi::rejected());
        into_warning(&mut fx).await;
        drain(&mut fx.events);

        fx.monitor.reject_extension().await;
        assert_eq!(fx.monitor.state(), SessionState::Unauthenticated);
        assert!(fx.vault.get().is_none());
        assert_eq!(logouts(&drain(&mut fx.events)), 1);

        fx.monitor.reject_extension().await;
        assert!(drain(&mut fx.events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ignored_warning_auto_logs_out_once() {
        let mut fx = fixture(Some(credential("tok", 45)), StubApi::rejected());
        into_warning(&mut fx).await;

        // Let the countdown run dry.
        for _ in 0..35 {
            advance(&fx.manual, 1).await;
        }

        assert_eq!(fx.monitor.state(), SessionState::Unauthenticated);
        assert!(fx.vault.get().is_none());
        assert!(!fx.monitor.scheduler_active().await);
        assert_eq!(logouts(&drain(&mut fx.events)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_credential_skips_warning() {
        let mut fx = fixture(Some(credential("tok", 0)), StubApi::rejected());
        fx.monitor.start().await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(fx.monitor.state(), SessionState::Unauthenticated);
        let events = drain(&mut fx.events);
        assert_eq!(logouts(&events), 1);
        assert!(events
            .iter()
            .all(|e| !matches!(e, SessionEvent::AuthStateChanged(SessionState::Warning))));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_tears_down_without_logout_side_effects() {
        let mut fx = fixture(Some(credential("tok", 45)), StubApi::rejected());
        into_warning(&mut fx).await;
        drain(&mut fx.events);

        fx.monitor.stop().await;

        assert!(!fx.monitor.scheduler_active().await);
        assert!(fx.vault.get().is_some(), "teardown must not clear the store");

        // No stray timer fires afterwards, whatever the clock does.
        for _ in 0..20 {
            advance(&fx.manual, 5).await;
        }
        assert_eq!(logouts(&drain(&mut fx.events)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn notify_login_begins_monitoring() {
        let mut fx = fixture(None, StubApi::rejected());
        fx.monitor.notify_login(credential("tok", 120)).await;

        assert_eq!(fx.monitor.state(), SessionState::Active);
        assert!(fx.monitor.scheduler_active().await);

        let events = drain(&mut fx.events);
        assert!(matches!(events.first(), Some(SessionEvent::LoginSuccess)));

        fx.monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn notify_logout_is_idempotent() {
        let mut fx = fixture(Some(credential("tok", 120)), StubApi::rejected());
        fx.monitor.start().await;
        drain(&mut fx.events);

        fx.monitor.notify_logout().await;
        assert_eq!(logouts(&drain(&mut fx.events)), 1);

        fx.monitor.notify_logout().await;
        assert!(drain(&mut fx.events).is_empty());
        assert!(!fx.monitor.scheduler_active().await);
    }
}
