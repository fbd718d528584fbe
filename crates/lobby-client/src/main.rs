//! Lobby Watch
//!
//! Terminal front end for the lobby client. Runs one role from configuration,
//! prints prompts, request rows and notifications to stdout, and reads
//! commands from stdin.
//!
//! # Roles
//!
//! - `participant`: pending invitations, join by code, session directory
//! - `host`: join requests for the room in `LOBBY_PAGE_PATH`, invites,
//!   visibility toggle
//! - `waiting`: waits for the host's answer for the room in `LOBBY_PAGE_PATH`
//!
//! A navigation ends the run, the same way leaving a page tears down its
//! poll loops.

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs wires every role, naturally longer

use std::collections::HashSet;
use std::sync::Arc;

use common::config::ObservabilityConfig;
use lobby_client::client::ActionClient;
use lobby_client::config::{Config, Role};
use lobby_client::directory::SessionDirectory;
use lobby_client::invitations::InvitationSync;
use lobby_client::notify::{NotificationCenter, NotificationSink};
use lobby_client::page::{Navigation, Navigator, PageContext, TextInput};
use lobby_client::poll::PollHandle;
use lobby_client::requests::{BoardContent, RequestBoard};
use lobby_client::waiting::{WaitingRoom, WaitingState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Accept,
    Reject,
    Approve(String),
    Deny(String),
    Invite(String),
    Join(String),
    Sessions,
    Toggle,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim().to_string()),
            None => (line, String::new()),
        };

        match verb.to_ascii_lowercase().as_str() {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            "approve" => Some(Self::Approve(arg)),
            "deny" => Some(Self::Deny(arg)),
            "invite" => Some(Self::Invite(arg)),
            "join" => Some(Self::Join(arg)),
            "sessions" => Some(Self::Sessions),
            "toggle" => Some(Self::Toggle),
            "help" | "?" => Some(Self::Help),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

const PARTICIPANT_HELP: &str = "commands: accept | reject | join <code> | sessions | quit";
const HOST_HELP: &str = "commands: approve <user> | deny <user> | invite <user> | toggle | quit";
const WAITING_HELP: &str = "commands: quit";

/// Prints navigations and ends the run.
struct TerminalNavigator {
    shutdown: CancellationToken,
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, target: Navigation) {
        match &target {
            Navigation::Reload => println!("-> reload"),
            Navigation::To(path) => println!("-> navigate to {path}"),
        }
        info!(target: "lobby.watch", target_page = ?target, "Leaving page");
        self.shutdown.cancel();
    }
}

/// The running role and the poll loop it owns.
enum Component {
    Participant {
        sync: InvitationSync,
        directory: SessionDirectory,
    },
    Host {
        board: RequestBoard,
        invite_input: TextInput,
    },
    Waiting,
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lobby={}", observability.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if observability.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;
    init_tracing(&config.observability);

    info!(
        target: "lobby.watch",
        base_url = %config.base_url,
        role = ?config.role,
        page_path = %config.page_path,
        poll_interval_ms = config.poll_interval.as_millis(),
        "Configuration loaded successfully"
    );

    let client = ActionClient::new(config.client_config()).map_err(|e| {
        error!(target: "lobby.watch", error = %e, "Failed to build client");
        e
    })?;

    let shutdown = CancellationToken::new();
    let center = NotificationCenter::new(config.notification_ttl);
    let notifier: Arc<dyn NotificationSink> = Arc::new(center.clone());
    let navigator: Arc<dyn Navigator> = Arc::new(TerminalNavigator {
        shutdown: shutdown.clone(),
    });
    let page: Arc<dyn PageContext> = Arc::new(config.page());

    spawn_notification_printer(&center, shutdown.clone());

    let (component, poll, help): (Component, PollHandle, &str) = match config.role {
        Role::Participant => {
            let sync = InvitationSync::new(client.clone(), notifier, navigator)
                .with_navigation_delay(config.navigation_delay);
            let directory = SessionDirectory::new(client, sync.clone());
            spawn_prompt_printer(&sync, shutdown.clone());
            let poll = sync.start(config.poll_interval);
            (Component::Participant { sync, directory }, poll, PARTICIPANT_HELP)
        }
        Role::Host => {
            let invite_input = TextInput::new();
            let board = RequestBoard::new(client, notifier, Arc::clone(&page))
                .with_invite_input(invite_input.clone());
            spawn_board_printer(&board, shutdown.clone());
            let poll = board.start(config.poll_interval).map_err(|e| {
                error!(target: "lobby.watch", error = %e, "LOBBY_PAGE_PATH has no room code");
                e
            })?;
            (Component::Host { board, invite_input }, poll, HOST_HELP)
        }
        Role::Waiting => {
            let room = WaitingRoom::for_page(client, notifier, navigator, page.as_ref())
                .map_err(|e| {
                    error!(target: "lobby.watch", error = %e, "LOBBY_PAGE_PATH has no room code");
                    e
                })?
                .with_navigation_delay(config.navigation_delay);
            println!("Waiting for the host of {} to respond...", room.room_code());
            spawn_waiting_printer(&room, shutdown.clone());
            let poll = room.start(config.poll_interval);
            (Component::Waiting, poll, WAITING_HELP)
        }
    };

    println!("{help}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = signal::ctrl_c() => {
                info!(target: "lobby.watch", "Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!(target: "lobby.watch", error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Some(Command::Quit) => break,
                    Some(Command::Help) => println!("{help}"),
                    Some(command) => run_command(&component, command).await,
                    None => println!("unknown command; {help}"),
                }
            }
        }
    }

    poll.cancel();
    shutdown.cancel();
    info!(target: "lobby.watch", "Lobby watch stopped");
    Ok(())
}

async fn run_command(component: &Component, command: Command) {
    match (component, command) {
        (Component::Participant { sync, .. }, Command::Accept) => {
            if sync.accept().is_none() {
                println!("no invitation to accept");
            }
        }
        (Component::Participant { sync, .. }, Command::Reject) => {
            if sync.reject().is_none() {
                println!("no invitation to reject");
            }
        }
        (Component::Participant { sync, .. }, Command::Join(code)) => {
            sync.join_with_code(&code).await;
        }
        (Component::Participant { directory, .. }, Command::Sessions) => {
            match directory.refresh().await {
                Ok(sessions) if sessions.is_empty() => println!("no discoverable sessions"),
                Ok(sessions) => {
                    for s in sessions {
                        println!(
                            "  {}  host {}  {}/{} participants",
                            s.room_code, s.host_username, s.participant_count, s.max_participants
                        );
                    }
                }
                Err(e) => println!("failed to load sessions: {e}"),
            }
        }
        (Component::Host { board, .. }, Command::Approve(username)) => {
            click_row(board, &username, true);
        }
        (Component::Host { board, .. }, Command::Deny(username)) => {
            click_row(board, &username, false);
        }
        (Component::Host { board, invite_input }, Command::Invite(username)) => {
            invite_input.set(username);
            board.submit_invite().await;
        }
        (Component::Host { board, .. }, Command::Toggle) => {
            if let Some(visibility) = board.toggle_discoverability().await {
                println!("discoverable: {}", visibility.is_discoverable);
            }
        }
        (_, command) => println!("{command:?} is not available for this role"),
    }
}

fn click_row(board: &RequestBoard, username: &str, approve: bool) {
    let row = board
        .list()
        .content()
        .and_then(|content| content.rows().iter().find(|r| r.username == username).cloned());

    match row {
        Some(row) => {
            let action = if approve { &row.approve } else { &row.reject };
            board.click(action);
        }
        None => println!("no pending request from {username:?}"),
    }
}

fn spawn_notification_printer(center: &NotificationCenter, shutdown: CancellationToken) {
    let mut rx = center.subscribe();
    tokio::spawn(async move {
        let mut seen = HashSet::new();
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let fresh: Vec<_> = rx
                        .borrow_and_update()
                        .iter()
                        .filter(|n| seen.insert(n.id))
                        .cloned()
                        .collect();
                    for n in fresh {
                        println!("[{:?}] {}", n.level, n.message);
                    }
                }
            }
        }
    });
}

fn spawn_prompt_printer(sync: &InvitationSync, shutdown: CancellationToken) {
    let mut rx = sync.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let prompt = rx.borrow_and_update().clone();
                    if let Some(prompt) = prompt {
                        println!("? {} (accept / reject)", prompt.text);
                    }
                }
            }
        }
    });
}

fn spawn_board_printer(board: &RequestBoard, shutdown: CancellationToken) {
    let mut rx = board.list().subscribe();
    tokio::spawn(async move {
        let mut last = None;
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let content = rx.borrow_and_update().clone();
                    // Polls repeat the same snapshot; print only changes.
                    if content == last {
                        continue;
                    }
                    match &content {
                        Some(BoardContent::Rows(rows)) => {
                            println!("pending requests:");
                            for row in rows {
                                match row.joined_at {
                                    Some(at) => println!(
                                        "  {} (since {})",
                                        row.username,
                                        at.format("%H:%M:%S")
                                    ),
                                    None => println!("  {}", row.username),
                                }
                            }
                        }
                        Some(other) => {
                            if let Some(text) = other.placeholder() {
                                println!("{text}");
                            }
                        }
                        None => {}
                    }
                    last = content;
                }
            }
        }
    });
}

fn spawn_waiting_printer(room: &WaitingRoom, shutdown: CancellationToken) {
    let mut rx = room.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *rx.borrow_and_update();
                    if state != WaitingState::Waiting {
                        println!("request {state:?}");
                    }
                }
            }
        }
    });
}
