//! Turbo Typer
//!
//! Headless demo driver for the simulation core: runs a scripted solo
//! race through the 60 Hz loop, then a two-client battle over the
//! in-process relay.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use turbo_typer::{
    corpus::{race_text, Difficulty},
    net::{BattleSession, LocalRelay, RelayConnection, TransportConfig},
    runtime::spawn_race_loop,
    BattleEvent, GameCore, HighScores, TICK_RATE, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Turbo Typer core v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let transport = TransportConfig::from_env();
    if !transport.battle_available() {
        info!("no relay key configured; hosted battle mode offline");
    }

    demo_solo_race().await?;
    demo_local_battle()?;
    Ok(())
}

/// Run one solo race with a scripted 50ms-per-keystroke typist.
async fn demo_solo_race() -> Result<()> {
    info!("=== Solo Race ===");

    let mut rng = StdRng::seed_from_u64(7);
    let text = race_text(Difficulty::Medium, &mut rng);
    info!(chars = text.len(), "race text selected");

    let scores = HighScores::default();
    let core = Arc::new(Mutex::new(
        GameCore::<RelayConnection>::solo("Demo", text, scores).context("race setup")?,
    ));

    let loop_handle = spawn_race_loop(Arc::clone(&core), |output| {
        for event in &output.game_events {
            info!(?event, "tick event");
        }
    });

    // Type the whole text, one correct character every 50ms.
    let chars: Vec<char> = text.chars().collect();
    let mut input = String::new();
    let mut report = None;
    for c in chars {
        input.push(c);
        let result = {
            let mut core = core.lock().map_err(|_| anyhow::anyhow!("core poisoned"))?;
            core.submit_input(&input, Instant::now())
        };
        if let Some(r) = result {
            report = Some(r);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    loop_handle.shutdown().await;

    let report = report.context("race never finished")?;
    info!(
        net_wpm = report.net_wpm,
        accuracy = report.accuracy,
        rank = %report.rank,
        time = report.time_seconds,
        "final report"
    );
    Ok(())
}

/// Run a full battle handshake and race between two in-process clients.
fn demo_local_battle() -> Result<()> {
    info!("=== Local Battle ===");

    let relay = LocalRelay::new();
    let mut host_session = BattleSession::new(relay.connect(), "Host");
    let mut guest_session = BattleSession::new(relay.connect(), "Guest");
    host_session.connect()?;
    guest_session.connect()?;
    let host_id = host_session.my_id().to_string();
    guest_session.connect_to_peer(&host_id)?;

    let mut host = GameCore::with_battle("Host", "warm up", HighScores::default(), host_session)
        .context("host setup")?;
    let mut guest = GameCore::with_battle("Guest", "warm up", HighScores::default(), guest_session)
        .context("guest setup")?;

    let base = Instant::now();
    host.tick_once(base);

    let mut rng = StdRng::seed_from_u64(11);
    let text = race_text(Difficulty::Easy, &mut rng);
    host.challenge_opponent(text)?;
    guest.tick_once(base + Duration::from_millis(16));
    guest.accept_challenge()?;
    host.tick_once(base + Duration::from_millis(32));
    info!(chars = text.len(), "handshake complete, racing");

    // Host types at 50ms per character, guest at 80ms. Drive both
    // simulations tick by tick.
    let chars: Vec<char> = text.chars().collect();
    let mut host_input = String::new();
    let mut guest_input = String::new();
    for step in 0u64..10_000 {
        let now = base + Duration::from_millis(100 + step * 10);
        if step % 5 == 0 && host_input.len() < chars.len() {
            host_input.push(chars[host_input.len()]);
            let _ = host.submit_input(&host_input, now);
        }
        if step % 8 == 0 && guest_input.len() < chars.len() {
            guest_input.push(chars[guest_input.len()]);
            let _ = guest.submit_input(&guest_input, now);
        }
        host.tick_once(now);
        let output = guest.tick_once(now);
        for event in &output.battle_events {
            if let BattleEvent::BattleEnded(result) = event {
                info!(
                    winner = %result.winner.name,
                    i_won = result.i_won,
                    "guest latched verdict"
                );
            }
        }
        if host.battle().map(|b| b.is_ended()).unwrap_or(false)
            && guest.battle().map(|b| b.is_ended()).unwrap_or(false)
        {
            break;
        }
    }

    let verdict = host
        .battle()
        .and_then(|b| b.result())
        .context("battle never settled")?;
    info!(
        winner = %verdict.winner.name,
        net_wpm = verdict.my_report.net_wpm,
        "host verdict"
    );
    Ok(())
}
