//! Paper trading engine simulation.
//!
//! Walks the engine through its lifecycle: subscriptions, order admission,
//! price ticks with PnL streaming, a user close, and a crash that triggers
//! the liquidation monitor.

use std::sync::Arc;

use async_trait::async_trait;
use papertrade_core::*;
use rust_decimal_macros::dec;

/// Prints everything delivered to it, tagged with the subscriber name.
struct ConsoleEndpoint {
    name: &'static str,
}

#[async_trait]
impl DeliveryEndpoint for ConsoleEndpoint {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        println!("    [{}] {} {}", self.name, message.kind, message.data);
        Ok(())
    }
}

/// Always fails, to demonstrate subscriber pruning.
struct DeadEndpoint;

#[async_trait]
impl DeliveryEndpoint for DeadEndpoint {
    async fn deliver(&self, _message: &OutboundMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::new("connection reset"))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papertrade_core=info".into()),
        )
        .init();

    println!("Paper Trading Core Engine Simulation");
    println!("Risk-Gated Orders, Liquidation Monitor, Real-Time Broadcast\n");

    scenario_1_random_market().await;
    scenario_2_liquidation_crash().await;
    scenario_3_broadcast_pruning().await;

    println!("\nAll simulations completed.");
}

/// Seeded random-walk market: open orders, stream ticks, close at market.
async fn scenario_1_random_market() {
    println!("Scenario 1: Trading the Synthetic Market\n");

    let engine = Arc::new(Engine::new(
        EngineConfig::sandbox(),
        Arc::new(SimulatedOracle::meme_market(7)),
        Arc::new(RandomFills::with_seed(0.9, 0, 5, 7)),
        Arc::new(MemoryStore::new()),
    ));

    let trader = Wallet::new("inj1qr7w9v4hgl0en3fsy2mxqv5gm9ukl3e8xj");
    let hub = engine.hub();
    hub.subscribe(
        channels::TRADES,
        ClientId::new("console"),
        Arc::new(ConsoleEndpoint { name: "trades" }),
    )
    .await;
    hub.subscribe(
        channels::POSITIONS,
        ClientId::new(trader.as_str()),
        Arc::new(ConsoleEndpoint { name: "positions" }),
    )
    .await;

    println!("  Trader starts with {} USDT", engine.balance(&trader, "USDT").await);

    let pepe = Symbol::new("PEPE");
    let quote_price = Price::new_unchecked(dec!(1.0));
    let outcome = engine
        .open_order(
            trader.clone(),
            pepe.clone(),
            Side::Buy,
            dec!(500),
            quote_price,
            Leverage::new(dec!(2)).unwrap(),
        )
        .await
        .expect("order admission");

    let position = match outcome {
        OrderOutcome::Filled { position, risk, .. } => {
            println!(
                "  Filled 500 PEPE long @ 1.0, risk score {:.1}, liquidation at {}",
                risk.risk_score, position.liquidation_price
            );
            position
        }
        OrderOutcome::Failed(order) => {
            println!("  Order failed: {:?}", order.failure_reason);
            return;
        }
        OrderOutcome::Rejected(assessment) => {
            println!("  Order rejected: {:?}", assessment.reason);
            return;
        }
    };

    println!("\n  Streaming monitor ticks for a moment:");
    let monitor = tokio::spawn(Arc::clone(&engine).run_monitor());
    tokio::time::sleep(std::time::Duration::from_millis(900)).await;
    monitor.abort();

    match engine.close_position(&trader, position.id).await {
        Ok(result) => println!(
            "\n  Closed {} with pnl {} (net {} USDT)",
            result.position.id, result.final_pnl, result.proceeds
        ),
        Err(e) => println!("\n  Close failed: {e}"),
    }

    println!(
        "  Final balance: {} USDT, risk score {}\n",
        engine.balance(&trader, "USDT").await,
        engine.risk_score(&trader).await,
    );
}

/// Fixed-price oracle crashed below the liquidation floor.
async fn scenario_2_liquidation_crash() {
    println!("Scenario 2: Liquidation Crash\n");

    let oracle = Arc::new(StaticOracle::new());
    let token = Symbol::new("PEPE");
    oracle.set_price(&token, dec!(1.0));

    let engine = Arc::new(Engine::new(
        EngineConfig::default(),
        oracle.clone(),
        Arc::new(FixedFills::always_filled()),
        Arc::new(MemoryStore::new()),
    ));

    let trader = Wallet::new("inj1crash0example0wallet0address00000");
    let outcome = engine
        .open_order(
            trader.clone(),
            token.clone(),
            Side::Buy,
            dec!(500),
            Price::new_unchecked(dec!(1.0)),
            Leverage::new(dec!(2)).unwrap(),
        )
        .await
        .expect("order admission");

    let OrderOutcome::Filled { position, .. } = outcome else {
        println!("  unexpected admission outcome");
        return;
    };
    println!(
        "  Long 500 PEPE @ 1.0, liquidation price {}",
        position.liquidation_price
    );

    oracle.set_price(&token, dec!(0.75));
    println!("  Price crashes to 0.75...");

    let report = engine.tick().await;
    println!("  Monitor liquidated {:?}", report.liquidated);

    let position = engine.position(position.id).await.unwrap();
    println!(
        "  Status {:?}, final pnl {}",
        position.status,
        position.final_pnl.unwrap()
    );

    // the user's close arrives too late and is a benign conflict
    match engine.close_position(&trader, position.id).await {
        Err(EngineError::AlreadyClosed(_)) => println!("  Late user close: already closed\n"),
        other => println!("  Unexpected close outcome: {other:?}\n"),
    }
}

/// One healthy and one dead subscriber: delivery is isolated, the dead one is pruned.
async fn scenario_3_broadcast_pruning() {
    println!("Scenario 3: Broadcast Failure Isolation\n");

    let oracle = Arc::new(StaticOracle::new());
    oracle.set_price(&Symbol::new("DOGE"), dec!(0.32));

    let engine = Arc::new(Engine::new(
        EngineConfig::default(),
        oracle,
        Arc::new(FixedFills::always_filled()),
        Arc::new(MemoryStore::new()),
    ));
    let hub = engine.hub();

    hub.subscribe(
        channels::PRICE_FEED,
        ClientId::new("healthy"),
        Arc::new(ConsoleEndpoint { name: "price_feed" }),
    )
    .await;
    hub.subscribe(
        channels::PRICE_FEED,
        ClientId::new("dead"),
        Arc::new(DeadEndpoint),
    )
    .await;

    println!("  Subscribers before tick: {}", hub.subscriber_count(channels::PRICE_FEED).await);
    engine.tick().await;
    println!("  Subscribers after tick: {}", hub.subscriber_count(channels::PRICE_FEED).await);
}
