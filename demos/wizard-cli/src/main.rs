//! Terminal shell for the Wizard client.
//!
//! Connects to a game server, logs every snapshot the client publishes, and
//! maps typed lines from stdin onto client actions:
//!
//! ```text
//! join <name>        announce <n>       start
//! play wizard|fool   trump <color>      kick <name>...
//! play <color> <n>   rejoin             connect [url]
//! quit
//! ```

use std::str::FromStr;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wizard_client::prelude::*;

#[derive(Parser)]
#[command(name = "wizard-cli")]
#[command(about = "Play Wizard from the terminal")]
struct Args {
    /// WebSocket URL of the game server
    #[arg(long, env = "WIZARD_ENDPOINT", default_value = ClientConfig::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Join with this name as soon as the connection opens
    #[arg(long)]
    name: Option<String>,

    /// Give up after this many failed reconnects (0 retries forever)
    #[arg(long, default_value = "20")]
    max_retries: u32,

    /// Send join again with the same name after every reconnect
    #[arg(long)]
    rejoin: bool,
}

impl Args {
    fn config(&self) -> ClientConfig {
        let attempts = (self.max_retries > 0).then_some(self.max_retries);
        ClientConfig::default()
            .with_endpoint(self.endpoint.clone())
            .with_policy(ReconnectPolicy::default().with_max_attempts(attempts))
            .with_rejoin_on_reconnect(self.rejoin)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Join(String),
    Play(CardFace),
    Announce(u32),
    Trump(Color),
    Start,
    Kick(Vec<String>),
    Rejoin,
    Connect(Option<String>),
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or("empty command")?;
        let rest: Vec<&str> = words.collect();

        match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("join", []) => Err("usage: join <name>".into()),
            ("join", name) => Ok(Self::Join(name.join(" "))),
            ("play", card) => parse_card(card).map(Self::Play),
            ("announce", [n]) => n
                .parse()
                .map(Self::Announce)
                .map_err(|_| format!("not a count: {n}")),
            ("trump", [color]) => color
                .parse()
                .map(Self::Trump)
                .map_err(|e: wizard_protocol::ProtocolError| e.to_string()),
            ("start", []) => Ok(Self::Start),
            ("kick", []) => Err("usage: kick <name>...".into()),
            ("kick", names) => Ok(Self::Kick(names.iter().map(|s| s.to_string()).collect())),
            ("rejoin", []) => Ok(Self::Rejoin),
            ("connect", []) => Ok(Self::Connect(None)),
            ("connect", [url]) => Ok(Self::Connect(Some(url.to_string()))),
            ("quit" | "exit", []) => Ok(Self::Quit),
            (other, _) => Err(format!("unknown command: {other}")),
        }
    }
}

fn parse_card(words: &[&str]) -> Result<CardFace, String> {
    match words {
        [w] if w.eq_ignore_ascii_case("wizard") => Ok(CardFace::Wizard),
        [f] if f.eq_ignore_ascii_case("fool") => Ok(CardFace::Fool),
        [color, number] => {
            let color: Color = color.parse().map_err(|e: wizard_protocol::ProtocolError| e.to_string())?;
            let number: u8 = number.parse().map_err(|_| format!("not a card number: {number}"))?;
            if !(1..=CardFace::MAX_NUMBER).contains(&number) {
                return Err(format!("card number must be 1-{}", CardFace::MAX_NUMBER));
            }
            Ok(CardFace::Number { color, number })
        }
        _ => Err("usage: play wizard | play fool | play <color> <number>".into()),
    }
}

async fn run_command(client: &ClientHandle, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Join(name) => client.join(name).await,
        Command::Play(card) => client.play_card(card).await,
        Command::Announce(count) => client.announce(count).await,
        Command::Trump(color) => client.choose_trump(color).await,
        Command::Start => client.start_game().await,
        Command::Kick(names) => client.kick(names).await,
        Command::Rejoin => client.rejoin().await,
        Command::Connect(Some(url)) => client.connect_to(url).await,
        Command::Connect(None) => client.connect().await,
        Command::Quit => client.close().await,
    }
}

// ---------------------------------------------------------------------------
// Snapshot logging
// ---------------------------------------------------------------------------

fn log_view(view: &SessionView) {
    let hand: Vec<String> = view.hand().iter().map(ToString::to_string).collect();
    let round = view.round();
    info!(
        revision = view.revision(),
        lifecycle = %view.lifecycle(),
        name = view.local_player_name().unwrap_or("-"),
        creator = view.is_creator(),
        round = round.map(|r| r.round_number),
        trump = ?round.and_then(|r| r.trump_card.as_ref()).map(ToString::to_string),
        hand = ?hand,
        your_turn = view.has_turn(),
        "view"
    );

    for player in view.scoreboard() {
        info!(
            player = %player.name,
            score = player.score,
            announced = player.announcement,
            tricks = player.tricks_won,
            turn = player.has_turn,
            "  seat"
        );
    }
    if !view.waiting_for().is_empty() {
        info!(waiting_for = ?view.waiting_for(), "waiting");
    }
    if view.lifecycle() == Lifecycle::GameOver {
        info!(winners = ?view.winners(), "game over");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (client, mut notices) = WizardClient::start(args.config());

    if let Some(name) = &args.name {
        client.join(name.as_str()).await?;
    }
    client.connect().await?;
    info!(endpoint = %args.endpoint, "connecting");

    let mut views = client.subscribe();
    tokio::spawn(async move {
        let mut last_messages = 0;
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            for message in view.messages().iter().skip(last_messages) {
                match message.kind {
                    MessageKind::Info => info!(text = %message.text, "server"),
                    MessageKind::Error => warn!(text = %message.text, "server"),
                }
            }
            last_messages = view.messages().len();
            log_view(&view);
        }
    });

    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            info!(?notice, "link");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        let quit = command == Command::Quit;
        if let Err(e) = run_command(&client, command).await {
            warn!(error = %e, "command failed");
        }
        if quit {
            break;
        }
    }

    client.close().await?;
    Ok(())
}
