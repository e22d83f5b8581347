//! Remote Bridge device client: entry point.
//!
//! This binary pairs with a desktop host, opens the WebSocket event channel,
//! and then turns line commands typed on stdin into control actions.  It is
//! the operator-facing shell around the [`SessionController`]; a graphical
//! front end would drive the same controller through the `ui_bridge`
//! commands instead.
//!
//! # Usage
//!
//! ```text
//! remote-client [OPTIONS]
//!
//! Options:
//!   --host <HOST>             Host address, optionally with :PORT
//!   --code <CODE>             Pairing code shown by the host
//!   --invite <URI>            Invite URI scanned from the host's QR code
//!   --config <PATH>           Settings file
//!   --port <PORT>             Default host port [config: network.http_port]
//!   --heartbeat-secs <SECS>   Keepalive interval [config: session.heartbeat_interval_secs]
//!   --reconnect-retries <N>   Extra connect attempts [config: session.reconnect_retries]
//!   --log-level <FILTER>      Log filter used when RUST_LOG is unset
//!   --write-default-config    Write a default settings file and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable               | Flag        |
//! |------------------------|-------------|
//! | `REMOTE_BRIDGE_HOST`   | `--host`    |
//! | `REMOTE_BRIDGE_CODE`   | `--code`    |
//! | `REMOTE_BRIDGE_PORT`   | `--port`    |
//! | `REMOTE_BRIDGE_CONFIG` | `--config`  |
//!
//! CLI args take precedence over the settings file, which takes precedence
//! over built-in defaults.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use remote_core::PairingInvite;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use remote_client::application::session_controller::SessionController;
use remote_client::infrastructure::host_api::HostApi;
use remote_client::infrastructure::network::WsConnector;
use remote_client::infrastructure::storage::config::{
    config_file_path, load_config, save_config, ClientConfig,
};

use commands::{parse_command, Command, HELP};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote Bridge device client.
///
/// Pairs with a desktop host and forwards control actions typed on stdin.
#[derive(Debug, Parser)]
#[command(
    name = "remote-client",
    about = "Pair with a Remote Bridge host and send control actions",
    version
)]
struct Cli {
    /// Host address, e.g. `192.168.1.50` or `192.168.1.50:8000`.
    #[arg(long, env = "REMOTE_BRIDGE_HOST", conflicts_with = "invite")]
    host: Option<String>,

    /// Pairing code displayed by the host.
    #[arg(long, env = "REMOTE_BRIDGE_CODE", requires = "host", conflicts_with = "invite")]
    code: Option<String>,

    /// Invite URI, e.g. `remotebridge://pair?code=123456&host=192.168.1.50`.
    #[arg(long)]
    invite: Option<String>,

    /// Settings file.  Defaults to `$REMOTE_BRIDGE_CONFIG` or the platform
    /// config directory.
    #[arg(long, env = "REMOTE_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Port used when the host address carries none.
    #[arg(long, env = "REMOTE_BRIDGE_PORT")]
    port: Option<u16>,

    /// Keepalive ping interval in seconds.
    #[arg(long)]
    heartbeat_secs: Option<u64>,

    /// Extra attempts when opening the event channel fails.
    #[arg(long)]
    reconnect_retries: Option<u32>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long)]
    log_level: Option<String>,

    /// Write the effective settings to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    /// Applies every flag the operator set on top of the file settings.
    fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(port) = self.port {
            config.network.http_port = port;
        }
        if let Some(secs) = self.heartbeat_secs {
            config.session.heartbeat_interval_secs = secs;
        }
        if let Some(retries) = self.reconnect_retries {
            config.session.reconnect_retries = retries;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }

    /// The host to pair with at startup, if one was given.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparseable invite or a `--host` without a
    /// `--code`.
    fn pairing_target(&self) -> anyhow::Result<Option<PairingInvite>> {
        if let Some(uri) = &self.invite {
            let invite = PairingInvite::parse(uri).context("invalid --invite")?;
            return Ok(Some(invite));
        }
        match (&self.host, &self.code) {
            (Some(host), Some(code)) => Ok(Some(PairingInvite {
                code: code.clone(),
                host: host.clone(),
            })),
            (Some(_), None) => bail!("--host needs a --code to pair"),
            _ => Ok(None),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the settings file is loaded.
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins; otherwise the
///    configured `log_level` applies.
/// 3. The HTTP client, WebSocket connector, and [`SessionController`] are
///    built.
/// 4. If a host was given, the client pairs and connects immediately.
/// 5. Lines from stdin are executed until `quit`, end of input, or Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Settings ──────────────────────────────────────────────────────────────
    let mut config = load_config(cli.config.as_deref()).context("failed to load settings")?;
    cli.apply_overrides(&mut config);

    if cli.write_default_config {
        let path = config_file_path(cli.config.as_deref())?;
        save_config(&config, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let target = cli.pairing_target()?;

    // ── Wiring ────────────────────────────────────────────────────────────────
    let api = Arc::new(
        HostApi::new(config.http_settings()).context("failed to build HTTP client")?,
    );
    let controller = Arc::new(SessionController::new(
        api.clone(),
        api,
        Arc::new(WsConnector::new(config.channel_settings())),
        config.session_settings(),
    ));

    spawn_session_logger(&controller);
    spawn_event_logger(&controller);

    info!("Remote Bridge client starting, port={}", config.network.http_port);

    if let Some(invite) = target {
        pair(&controller, &invite.code, &invite.host).await;
    }

    // ── Command loop ──────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else { break };

        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => run_command(&controller, command).await,
            Err(usage) => println!("{usage}"),
        }
    }

    controller.disconnect().await;
    info!("Remote Bridge client stopped");
    Ok(())
}

/// Executes one parsed command against the controller.
async fn run_command(controller: &SessionController, command: Command) {
    match command {
        Command::Action(action) => controller.send(action),
        Command::Upload(path) => {
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    println!("not a file path: {}", path.display());
                    return;
                }
            };
            match tokio::fs::read(&path).await {
                Ok(payload) => match controller.upload(payload, &filename).await {
                    Ok(()) => println!("uploaded {filename}"),
                    Err(e) => println!("upload failed: {e}"),
                },
                Err(e) => println!("cannot read {}: {e}", path.display()),
            }
        }
        Command::ClipGet => match controller.get_clipboard().await {
            Ok(content) => println!("{content}"),
            Err(e) => println!("clipboard read failed: {e}"),
        },
        Command::ClipSet(content) => match controller.set_clipboard(&content).await {
            Ok(_) => println!("clipboard updated"),
            Err(e) => println!("clipboard write failed: {e}"),
        },
        Command::Pair { code, host } => pair(controller, &code, &host).await,
        Command::Status => {
            let session = controller.snapshot();
            println!(
                "{} (host: {}, device: {})",
                session.status_label(),
                session.host().unwrap_or("-"),
                session.device_id().unwrap_or("-"),
            );
            if let Some(error) = session.last_error() {
                println!("last error: {error}");
            }
        }
        Command::Connect => {
            if let Err(e) = controller.connect().await {
                println!("connect failed: {e}");
            }
        }
        Command::Disconnect => controller.disconnect().await,
        Command::Unpair => controller.unpair().await,
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

async fn pair(controller: &SessionController, code: &str, host: &str) {
    match controller.pair(code, host).await {
        Ok(device_id) => {
            println!("paired as {device_id} ({})", controller.snapshot().status_label())
        }
        Err(e) => println!("pairing failed: {e}"),
    }
}

/// Logs every session transition until the controller is dropped.
fn spawn_session_logger(controller: &SessionController) {
    let mut session = controller.subscribe();
    tokio::spawn(async move {
        while session.changed().await.is_ok() {
            let snapshot = session.borrow_and_update().clone();
            match snapshot.last_error() {
                Some(error) => warn!("session: {} ({error})", snapshot.status_label()),
                None => info!("session: {}", snapshot.status_label()),
            }
        }
    });
}

/// Logs inbound host events as they arrive.
fn spawn_event_logger(controller: &SessionController) {
    let mut events = controller.events();
    tokio::spawn(async move {
        while events.changed().await.is_ok() {
            if let Some(event) = events.borrow_and_update().clone() {
                let data = serde_json::Value::Object(event.data().clone());
                info!("host event: {} {data}", event.kind());
            }
        }
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
