//! Boots a node identity: reads the configuration, derives the key pair, checks the local Node record and prints it as JSON for the object store to announce.

use anyhow::Context;
use tracing::info;

use messenger::logging::init_logging;
use messenger::{Config, Message, Node, NodeContainer};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    init_logging(&config.log_level)?;
    info!(name = %config.name, cxo_port = config.cxo_port, cxo_dir = %config.cxo_dir.display(), "starting");

    let keys = config.key_pair();
    let mut node = Node::new(&config.name, &keys.public.to_hex());
    let mut container = NodeContainer::new();
    let node_ref = container.subscribe(&mut node).context("local node record rejected")?;
    info!(public_key = %keys.public, reference = %node_ref, "identity ready");

    // Sign a greeting so a broken key setup shows up here rather than on a peer
    let mut hello = Message::new(&format!("{} joined", node.name));
    hello.sign(&keys.public, &keys.secret).context("unable to sign greeting")?;
    hello.touch();
    let message_ref = container.enqueue(&hello).context("greeting failed verification")?;
    info!(reference = %message_ref, "greeting queued");

    println!("{}", serde_json::to_string_pretty(&node)?);
    Ok(())
}
