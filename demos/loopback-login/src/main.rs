use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waygate::prelude::*;

// ---------------------------------------------------------------------------
// Loopback provider
// ---------------------------------------------------------------------------

/// Plays both browser and provider: every presented URL is "signed in"
/// immediately and answered with a redirect carrying the same state.
#[derive(Clone, Default)]
struct LoopbackBrowser {
    sender: Arc<Mutex<Option<CompletionSender>>>,
}

impl LoopbackBrowser {
    fn connect(&self, sender: CompletionSender) {
        if let Ok(mut slot) = self.sender.lock() {
            *slot = Some(sender);
        }
    }
}

impl LoginPresenter for LoopbackBrowser {
    fn present(&mut self, slot: LocalSlot, url: &str) -> Result<(), String> {
        let state = url
            .split(['?', '&'])
            .find_map(|pair| pair.strip_prefix("state="))
            .ok_or("authorization URL has no state")?;

        let guard = self.sender.lock().map_err(|_| "sender lock poisoned")?;
        let sender = guard.as_ref().ok_or("not connected to a service")?;

        let redirect = format!(
            "http://127.0.0.1:7878/callback#gameAccountId=player-{}\
             &internalToken=loopback-secret&authTicket=loopback-ticket-{}\
             &displayName=Player%20{}&state={state}",
            slot.0, slot.0, slot.0,
        );
        sender.complete(slot, redirect, true);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ProviderConfig {
        endpoint: "http://127.0.0.1:7878/authorize".into(),
        redirect_url: "http://127.0.0.1:7878/callback".into(),
        client_id: "loopback-demo".into(),
        timeout_secs: 5.0,
        poll_interval_secs: 0.25,
        ..ProviderConfig::default()
    };

    let browser = LoopbackBrowser::default();
    let identity = IdentityService::new(config, browser.clone());
    browser.connect(identity.completion_sender());

    let handle = IdentityHandle::new(identity);
    let mut events = handle.subscribe();
    let mut driver = IdentityDriver::new(handle.clone(), TickScheduler::with_rate(20));

    for n in 0..2 {
        let slot = LocalSlot(n);
        handle.login(slot, LoginCredentials::of_kind("implicit"))?;
        let ticks = driver.run_until_idle().await;

        while let Ok(event) = events.try_recv() {
            match event {
                IdentityEvent::LoginStatusChanged { slot, player_id: Some(id), success: true, .. } => {
                    let nickname = handle.with(|s| s.player_nickname(slot)).unwrap_or_default();
                    info!(%slot, player_id = %id, %nickname, ticks, "signed in");
                }
                IdentityEvent::LoginStatusChanged { slot, error, .. } => {
                    warn!(%slot, ?error, "sign-in failed");
                }
                IdentityEvent::LogoutComplete { slot, success } => {
                    info!(%slot, success, "signed out");
                }
            }
        }
    }

    let signed_in = handle.with(|s| s.all_user_accounts().len());
    info!(signed_in, "all logins finished");

    handle.logout(LocalSlot(0))?;
    info!(status = %handle.login_status(LocalSlot(0)), "slot-0 after logout");

    Ok(())
}
