use std::path::PathBuf;
use std::sync::Arc;

use broadside::{
    init_logging, play_local, Bot, EngineConfig, Gateway, PlayerId, Registry, TcpTransport,
};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Run the matchmaking server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, default_value = "broadside.toml", help = "Engine config file (defaults apply if missing)")]
        config: PathBuf,
        #[arg(long, help = "Override the idle timeout in seconds")]
        idle_timeout: Option<u64>,
    },
    /// Connect to a server and play one game as a bot.
    Bot {
        #[arg(long, default_value = "127.0.0.1:8080")]
        connect: String,
        #[arg(long)]
        player: u64,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Play two bots against each other in-process.
    Local {
        #[arg(long, default_value = "broadside.toml")]
        config: PathBuf,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            config,
            idle_timeout,
        } => {
            let mut config = EngineConfig::load_or_default(&config)?;
            if let Some(secs) = idle_timeout {
                config.idle_timeout_secs = secs;
            }

            let registry = Arc::new(Registry::new(config)?);
            let _sweeper = registry.clone().spawn_sweeper();

            let listener = TcpListener::bind(&bind).await?;
            log::info!("listening on {}", bind);
            loop {
                let (stream, addr) = listener.accept().await?;
                log::debug!("connection from {}", addr);
                if let Err(e) = stream.set_nodelay(true) {
                    log::warn!("{}: set_nodelay failed: {}", addr, e);
                }
                let gateway = Gateway::new(registry.clone(), TcpTransport::new(stream));
                tokio::spawn(async move {
                    if let Err(e) = gateway.run().await {
                        log::warn!("{}: connection ended with an error: {}", addr, e);
                    }
                });
            }
        }
        Commands::Bot {
            connect,
            player,
            seed,
        } => {
            let transport = TcpTransport::connect(&connect).await?;
            log::info!("connected to {}", connect);
            let report = Bot::new(transport, PlayerId(player), make_rng(seed)).run().await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::Local { config, seed } => {
            let config = EngineConfig::load_or_default(&config)?;
            let (s1, s2) = match seed {
                Some(s) => (s, s.wrapping_add(1)),
                None => (rand::random(), rand::random()),
            };
            let (a, b) = play_local(config, (s1, s2)).await?;
            let winner = [&a, &b].into_iter().find(|r| r.won).map(|r| r.player.to_string());
            let result = json!({
                "player1": a,
                "player2": b,
                "winner": winner,
            });
            println!("{}", result);
        }
    }
    Ok(())
}
