//! Command-line surface: one subcommand per backend operation plus a live
//! `watch` mode that exercises the full sync pipeline.

use crate::actions::ActionGateway;
use crate::api::ApiClient;
use crate::config::Config;
use crate::protocol::AgentThought;
use crate::store::{ConnectionHealth, SharedStore};
use crate::stream::{SseTransport, StreamController};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "draftsync", version, about = "Review agent-drafted protocols from the terminal")]
pub struct Cli {
    /// Path to a config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding the config file.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Bearer token, overriding config file and environment.
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow one protocol live: thoughts, status transitions, final draft.
    Watch { protocol_id: String },
    /// List protocols for the current user.
    List {
        #[arg(long, default_value_t = 0)]
        skip: u64,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Start a new protocol drafting workflow.
    Create {
        intent: String,
        #[arg(long = "type", default_value = "thought_record")]
        protocol_type: String,
    },
    /// Approve a protocol, optionally replacing the draft from a file.
    Approve {
        protocol_id: String,
        #[arg(long)]
        edited_file: Option<PathBuf>,
    },
    /// Reject a protocol with a reason.
    Reject {
        protocol_id: String,
        #[arg(long)]
        reason: String,
    },
    /// Pause the drafting workflow.
    Halt { protocol_id: String },
    /// Resume a halted workflow.
    Resume { protocol_id: String },
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let token = cli
        .token
        .or_else(|| config.token.clone())
        .context("no bearer token: pass --token, set DRAFTSYNC_TOKEN, or add it to the config")?;
    let base_url = cli.base_url.unwrap_or_else(|| config.base_url.clone());
    let api = Arc::new(ApiClient::new(&base_url, &token));

    match cli.command {
        Command::Watch { protocol_id } => watch(api, &config, &protocol_id).await,
        Command::List { skip, limit } => {
            let page = api
                .list_protocols(skip, limit.unwrap_or(config.page_size))
                .await?;
            for protocol in &page.items {
                println!(
                    "{}  {:<18} iter {}  {}",
                    protocol.id, protocol.status, protocol.iteration_count, protocol.title
                );
            }
            println!(
                "{} of {} (skip {}){}",
                page.items.len(),
                page.total,
                page.skip,
                if page.has_more { ", more available" } else { "" }
            );
            Ok(())
        }
        Command::Create {
            intent,
            protocol_type,
        } => {
            let protocol = api.create_protocol(&intent, &protocol_type).await?;
            println!("created {} ({})", protocol.id, protocol.status);
            Ok(())
        }
        Command::Approve {
            protocol_id,
            edited_file,
        } => {
            let store = seeded_store(&api, &protocol_id).await?;
            let gateway = ActionGateway::new(api, store);
            let edited = match edited_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                None => None,
            };
            let protocol = gateway.approve(edited.as_deref()).await?;
            println!("approved {} ({})", protocol.id, protocol.status);
            Ok(())
        }
        Command::Reject {
            protocol_id,
            reason,
        } => {
            let store = seeded_store(&api, &protocol_id).await?;
            let gateway = ActionGateway::new(api, store);
            let protocol = gateway.reject(&reason).await?;
            println!("rejected {} ({})", protocol.id, protocol.status);
            Ok(())
        }
        Command::Halt { protocol_id } => {
            let store = seeded_store(&api, &protocol_id).await?;
            ActionGateway::new(api, store).halt().await?;
            println!("halted {protocol_id}");
            Ok(())
        }
        Command::Resume { protocol_id } => {
            let store = seeded_store(&api, &protocol_id).await?;
            ActionGateway::new(api, store).resume().await?;
            println!("resumed {protocol_id}");
            Ok(())
        }
    }
}

async fn seeded_store(api: &ApiClient, protocol_id: &str) -> Result<SharedStore> {
    let store = SharedStore::new(protocol_id);
    let protocol = api.get_protocol(protocol_id).await?;
    store.set_snapshot(protocol);
    Ok(store)
}

async fn watch(api: Arc<ApiClient>, config: &Config, protocol_id: &str) -> Result<()> {
    let store = seeded_store(&api, protocol_id).await?;
    let transport = Arc::new(SseTransport::new(api.http()));
    let controller = StreamController::new(store.clone(), Arc::clone(&api), transport, config.stream);

    let mut last_status = store.status();
    println!("{protocol_id}: {last_status}");
    print_draft_if_visible(&store);

    if last_status.is_stream_eligible() {
        controller.connect();
    } else {
        println!("(workflow is not running; nothing to stream)");
        return Ok(());
    }

    let mut printed: usize = 0;
    let mut last_health = ConnectionHealth::Idle;
    let mut ticker = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                controller.disconnect();
                println!("\nstopped");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let thoughts = store.thoughts();
        for thought in thoughts.iter().skip(printed) {
            print_thought(thought);
        }
        printed = thoughts.len();

        let status = store.status();
        if status != last_status {
            println!("status: {last_status} -> {status}");
            last_status = status;
        }

        let health = store.health();
        if health != last_health {
            match health {
                ConnectionHealth::Reconnecting { attempt } => {
                    eprintln!("connection lost, reconnecting (attempt {attempt})...");
                }
                ConnectionHealth::Polling => {
                    eprintln!("live updates unavailable, falling back to polling");
                }
                ConnectionHealth::Live | ConnectionHealth::Idle => {}
            }
            last_health = health;
        }

        if health == ConnectionHealth::Idle && !status.is_stream_eligible() {
            print_draft_if_visible(&store);
            return Ok(());
        }
    }
}

fn print_thought(thought: &AgentThought) {
    let who = thought
        .agent_name
        .clone()
        .unwrap_or_else(|| thought.agent_role.to_string());
    println!(
        "[{}] {} ({}): {}",
        thought.timestamp.format("%H:%M:%S"),
        who,
        thought.thought_type,
        thought.content
    );
}

fn print_draft_if_visible(store: &SharedStore) {
    store.with(|state| {
        if state.status().is_display_authorized() && !state.visible_draft().is_empty() {
            println!("--- draft ---\n{}\n-------------", state.visible_draft());
        }
    });
}
