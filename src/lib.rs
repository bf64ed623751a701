// src/lib.rs

pub mod buffer;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod message;
pub mod plugin;
pub mod report;
pub mod types;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::message::Message;
use crate::plugin::ScriptPlugin;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + environment)
/// - the plugin with its outbound channel
/// - inbound intake (`--text` or JSON lines on stdin)
/// - the stdout writer for outbound messages
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = config::load(args.config.as_deref()).context("loading configuration")?;

    let (out_tx, out_rx) = mpsc::channel::<Message>(64);
    let plugin = ScriptPlugin::initialize(&cfg, out_tx);

    if args.describe {
        print!("{}", plugin.describe());
        return Ok(());
    }

    let writer = tokio::spawn(write_outbound(out_rx));
    let mut sessions = JoinSet::new();

    let intake = async {
        match args.text {
            Some(text) => spawn_session(&mut sessions, &plugin, Message::from_text(text)),
            None => read_inbound(&mut sessions, &plugin).await?,
        }
        // Wait for every session to send its terminal report.
        while let Some(res) = sessions.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "session task failed");
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        res = intake => res?,
        res = tokio::signal::ctrl_c() => {
            res.context("listening for Ctrl+C")?;
            info!("interrupted; dropping running sessions");
        }
    }

    // Dropping the last sender lets the writer drain and stop. Sessions
    // still running at this point are aborted, which kills their sandboxes.
    drop(plugin);
    sessions.shutdown().await;
    writer.await.context("joining outbound writer")??;
    Ok(())
}

fn spawn_session(sessions: &mut JoinSet<()>, plugin: &ScriptPlugin, msg: Message) {
    let plugin = plugin.clone();
    sessions.spawn(async move { plugin.handle(&msg).await });
}

/// Read one JSON message per line from stdin until EOF.
async fn read_inbound(sessions: &mut JoinSet<()>, plugin: &ScriptPlugin) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(&line) {
            Ok(msg) => spawn_session(sessions, plugin, msg),
            Err(e) => warn!(error = %e, "skipping malformed inbound message"),
        }
    }

    debug!("stdin closed; no more inbound messages");
    Ok(())
}

/// Write every outbound message to stdout as one JSON line.
async fn write_outbound(mut rx: mpsc::Receiver<Message>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(msg) = rx.recv().await {
        let mut line = serde_json::to_string(&msg).context("encoding outbound message")?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await.context("writing stdout")?;
        stdout.flush().await.context("flushing stdout")?;
    }
    Ok(())
}
