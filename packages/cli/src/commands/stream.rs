use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use screenkit_model::StateDefinition;
use screenkit_stream::{AckSender, SseConnector, StateUpdate, StreamManager, SubscriptionConfig};
use std::sync::Arc;

const SUBSCRIPTION_ID: &str = "cli";

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Server-sent events endpoint
    #[arg(long)]
    pub url: String,

    /// State path each message is written to
    #[arg(long)]
    pub target: String,

    /// Also merge the `statePatch` object embedded in messages
    #[arg(long)]
    pub merge_patch: bool,
}

/// Follow one stream, printing state as it changes, until Ctrl-C
pub fn stream(args: StreamArgs, config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(follow(args, config))
}

async fn follow(args: StreamArgs, config: &Config) -> Result<()> {
    let (sink, mut rx) = AckSender::channel(64);
    let manager = StreamManager::new(Arc::new(SseConnector::new()), Arc::new(sink))
        .with_policy(config.reconnect_policy());

    manager.subscribe(
        SubscriptionConfig::new(SUBSCRIPTION_ID, args.url.clone(), args.target.clone())
            .with_state_patch(args.merge_patch),
    )?;

    println!("📡 {} {}", "Streaming".green().bold(), args.url);
    println!("   Target: {}", args.target);
    println!("   Press Ctrl-C to stop");
    println!();

    let mut state = StateDefinition::default();
    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(pending) = update else { break };
                let applied = apply(&mut state, pending.update());
                pending.acknowledge();
                applied?;
                println!("{}", serde_json::to_string(&state.initial_values)?);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(snapshot) = manager.snapshot(SUBSCRIPTION_ID) {
        println!();
        println!("   Status: {}", snapshot.status);
        println!("   Reconnects: {}", snapshot.reconnect_count);
        if snapshot.dropped_messages > 0 {
            println!("   {} {}", "Dropped:".yellow(), snapshot.dropped_messages);
        }
        if let Some(error) = &snapshot.last_error {
            println!("   {} {}", "Last error:".red(), error);
        }
    }
    manager.dispose();
    Ok(())
}

fn apply(state: &mut StateDefinition, update: &StateUpdate) -> Result<()> {
    state.set_value_at_path(&update.target_path, update.value.clone())?;
    if let Some(patch) = &update.state_patch {
        state.merge_state_patch(patch);
    }
    Ok(())
}
