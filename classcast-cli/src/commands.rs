use anyhow::{Context, Result, bail};
use classcast_core::{IceServerConfig, ParticipantId};
use classcast_session::{
    EnvIceServers, LocalRelayHub, NegotiationState, PeerHealth, PeerStatus, Session,
    SessionConfig, SessionEvent, SessionHandle, SyntheticDevices, WebRtcTransportFactory,
    WsRelay, resolve_ice_servers,
};
use colored::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

pub async fn relay(bind: SocketAddr, ice_servers: Vec<String>) -> Result<()> {
    let ice_servers: Vec<_> = ice_servers.into_iter().map(IceServerConfig::stun).collect();
    println!(
        "{} {} ({} ICE servers)",
        "Relay listening on".green().bold(),
        bind,
        ice_servers.len()
    );
    classcast_relay::serve(bind, ice_servers).await
}

pub async fn join(
    url: &str,
    participant: Option<&str>,
    want_audio: bool,
    want_video: bool,
) -> Result<()> {
    let local_id = match participant {
        Some(raw) => raw
            .parse::<ParticipantId>()
            .with_context(|| format!("Invalid participant id '{}'", raw))?,
        None => ParticipantId::new(),
    };

    let socket_url = format!("{}/ws/{}", url.trim_end_matches('/'), local_id);
    let relay = WsRelay::connect(&socket_url)
        .await
        .with_context(|| format!("Failed to connect to relay at {}", socket_url))?;

    let config = SessionConfig {
        want_audio,
        want_video,
        ice_servers: resolve_ice_servers(&EnvIceServers).await,
        ..SessionConfig::default()
    };
    let (session, handle) = Session::new(
        local_id,
        relay,
        Arc::new(SyntheticDevices::new()),
        Arc::new(WebRtcTransportFactory),
        config,
    );
    let mut events = handle.subscribe();
    let mut task = tokio::spawn(session.run());

    println!("{} {}", "Joined as".green().bold(), local_id);
    println!("{}", "Press Ctrl+C to leave".dimmed());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Leaving session...".cyan());
                handle.leave().await.context("Session already ended")?;
                break;
            }

            result = &mut task => {
                result.context("Session task failed")?;
                println!("{}", "Session ended".yellow());
                return Ok(());
            }

            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} session events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    task.await.context("Session task failed")?;
    Ok(())
}

pub async fn demo(participants: usize, seconds: u64) -> Result<()> {
    if participants < 2 {
        bail!("A mesh needs at least 2 participants");
    }

    let hub = LocalRelayHub::default();
    let mut handles = Vec::with_capacity(participants);
    let mut tasks = Vec::with_capacity(participants);

    println!(
        "{}",
        format!("Starting {} participants for {}s", participants, seconds)
            .green()
            .bold()
    );

    for n in 1..=participants {
        let id = ParticipantId::from_u128(n as u128);
        let (session, handle) = Session::new(
            id,
            hub.join(id),
            Arc::new(SyntheticDevices::new()),
            Arc::new(WebRtcTransportFactory),
            SessionConfig::default(),
        );
        tasks.push(tokio::spawn(session.run()));
        handles.push(handle);
    }

    // The first participant shares a screen halfway through.
    let half = Duration::from_secs(seconds) / 2;
    tokio::time::sleep(half).await;
    if let Some(presenter) = handles.first() {
        let started = presenter.start_screen_share().await?;
        println!("{} {}", "Screen share started:".cyan(), started);
    }
    tokio::time::sleep(half).await;

    for handle in &handles {
        print_table(handle);
    }

    for handle in &handles {
        handle.leave().await?;
    }
    for task in tasks {
        task.await.context("Session task failed")?;
    }
    println!("{}", "Demo finished".green().bold());
    Ok(())
}

fn print_table(handle: &SessionHandle) {
    println!("\n{} {}", "Participant".bold(), handle.local_id());
    let statuses = handle.peer_statuses();
    if statuses.is_empty() {
        println!("   {}", "no peers".dimmed());
    }
    for (participant, status) in statuses {
        let streams = handle.remote_streams();
        println!(
            "   {}  {:<16} {:<12} camera: {}  screen: {}",
            participant,
            format_negotiation(status),
            format_health(status.health),
            streams.camera(&participant).len(),
            streams.screen(&participant).len(),
        );
    }
}

fn format_negotiation(status: PeerStatus) -> ColoredString {
    let text = format!("{:?}", status.negotiation);
    match status.negotiation {
        NegotiationState::Stable => text.green(),
        NegotiationState::Idle => text.dimmed(),
        NegotiationState::HaveLocalOffer | NegotiationState::HaveRemoteOffer => text.yellow(),
    }
}

fn format_health(health: PeerHealth) -> ColoredString {
    let text = format!("{:?}", health);
    match health {
        PeerHealth::Connected => text.green(),
        PeerHealth::Connecting => text.yellow(),
        PeerHealth::Failed => text.red(),
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PeerHealthChanged {
            participant,
            health,
        } => println!("{} {} is {}", "●".cyan(), participant, format_health(*health)),
        SessionEvent::RemoteTrackAdded {
            participant,
            track_id,
            class,
        } => println!(
            "{} {} added {:?} track {}",
            "+".green(),
            participant,
            class,
            track_id
        ),
        SessionEvent::RemoteTrackRemoved {
            participant,
            track_id,
            class,
        } => println!(
            "{} {} removed {:?} track {}",
            "-".yellow(),
            participant,
            class,
            track_id
        ),
        SessionEvent::ParticipantDropped { participant } => {
            println!("{} {} dropped", "x".red().bold(), participant)
        }
        SessionEvent::DeviceWarning(e) => println!("{} {}", "Device warning:".yellow(), e),
        SessionEvent::ScreenShareStopped => println!("{}", "Screen share stopped".cyan()),
    }
}
