//! List strategies command.

use anyhow::Result;
use signal_strategies::StrategyFactory;

pub async fn run() -> Result<()> {
    println!("Available Strategy Types");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for descriptor in StrategyFactory::descriptors() {
        println!("  {} ({})", descriptor.display_name, descriptor.kind);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", descriptor.description);
        println!("  Suited to: {}", descriptor.market_conditions);
        println!("  Risk tier: {:?}", descriptor.risk_tier);
        println!();
    }

    println!("Use --strategy <kind> to select a strategy type.");

    Ok(())
}
