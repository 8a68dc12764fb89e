use broadside::{play_local, EngineConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <seed1> <seed2>", args[0]);
        std::process::exit(1);
    }
    let seed1: u64 = args[1].parse()?;
    let seed2: u64 = args[2].parse()?;

    let (r1, r2) = play_local(EngineConfig::default(), (seed1, seed2)).await?;

    let winner = match (r1.won, r2.won) {
        (true, false) => Some("player1"),
        (false, true) => Some("player2"),
        _ => None,
    };

    let result = json!({
        "player1": {"won": r1.won, "shots": r1.shots},
        "player2": {"won": r2.won, "shots": r2.shots},
        "winner": winner,
    });
    println!("{}", result);
    Ok(())
}
