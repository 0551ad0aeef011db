// shallot — run a whole onion overlay in one process
//
// Spins up an in-memory directory, a loopback transport, N relays and two
// users, then pushes a message through a fresh 3-hop circuit and prints what
// every participant observed.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shallot_core::crypto::{export_private, export_public, generate_keypair};
use shallot_core::{LoopbackTransport, MemoryDirectory, ProtocolConfig, RelayNode, UserNode};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shallot")]
#[command(about = "Shallot — layered hybrid-encryption onion overlay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-process overlay and send one message through it
    Demo {
        /// Number of relays to start
        #[arg(short, long, default_value = "5")]
        relays: u32,
        /// Message to route from user 1 to user 2
        #[arg(short, long, default_value = "hello through the onion")]
        message: String,
    },
    /// Generate an RSA keypair and print the exported encodings
    Keygen,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo { relays, message } => run_demo(relays, &message),
        Commands::Keygen => run_keygen(),
    }
}

fn run_demo(relay_count: u32, message: &str) -> Result<()> {
    let config = ProtocolConfig::default();
    if u64::from(relay_count) < config.circuit_hops as u64 {
        bail!(
            "need at least {} relays for a {}-hop circuit",
            config.circuit_hops,
            config.circuit_hops
        );
    }

    let directory = MemoryDirectory::new();
    let transport = LoopbackTransport::new();

    let mut relays = Vec::new();
    for node_id in 1..=relay_count {
        let relay = RelayNode::start(node_id, &config, &directory)
            .with_context(|| format!("starting relay {node_id}"))?;
        transport.bind(relay.address(), relay.clone());
        relays.push(relay);
    }

    let alice = UserNode::new(1, config.clone()).context("starting user 1")?;
    let bob = UserNode::new(2, config.clone()).context("starting user 2")?;
    transport.bind(alice.address(), alice.clone());
    transport.bind(bob.address(), bob.clone());

    alice
        .send_message(message, bob.user_id(), &directory, &transport)
        .context("sending through the overlay")?;

    println!("circuit (entry first): {:?}", alice.last_circuit());
    for relay in relays_in_circuit(&relays, &alice.last_circuit()) {
        println!(
            "  relay {} -> next {}",
            relay.node_id(),
            relay
                .last_message_destination()
                .map(|a| a.encode())
                .unwrap_or_else(|| "-".into())
        );
    }
    println!(
        "user {} received: {:?}",
        bob.user_id(),
        bob.last_received_message()
    );
    tracing::info!(relays = relay_count, "overlay demo complete");
    Ok(())
}

fn relays_in_circuit(relays: &[Arc<RelayNode>], circuit: &[u32]) -> Vec<Arc<RelayNode>> {
    circuit
        .iter()
        .filter_map(|id| relays.iter().find(|r| r.node_id() == *id).cloned())
        .collect()
}

fn run_keygen() -> Result<()> {
    let config = ProtocolConfig::default();
    let (public_key, private_key) =
        generate_keypair(config.rsa_modulus_bits).context("generating keypair")?;

    println!("public key:  {}", export_public(&public_key)?);
    if let Some(private) = export_private(Some(&private_key))? {
        println!("private key: {private}");
    }
    Ok(())
}
