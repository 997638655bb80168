/// Arbitrage monitor over a simulated market
///
/// Seeds an in-memory repository with mispriced pools on three chains, runs the observer and
/// detector tasks for a few seconds, then prints the detected opportunities and the best
/// routes. Pass a TOML file path as the first argument to override the defaults.
use eyre::Result;
use pool_arb::data_sync::ArbitrageServiceBuilder;
use pool_arb::{ArbitrageConfig, Chain, InMemoryPoolRepository, MockPoolBuilder, Pool, RouteConstraints, SimulatedChainClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn seed_pools() -> Vec<Pool> {
    let pool = |id: &str, chain: Chain, a: &str, b: &str, ra: f64, rb: f64, liquidity: f64| {
        MockPoolBuilder::new(id, a, b).chain(chain).reserves(ra, rb).liquidity_usd(liquidity).build()
    };
    vec![
        pool("eth-usdc-uni", Chain::Ethereum, "ETH", "USDC", 1_000.0, 2_000_000.0, 4_000_000.0),
        pool("eth-usdc-sushi", Chain::Ethereum, "ETH", "USDC", 1_000.0, 2_050_000.0, 4_100_000.0),
        pool("eth-usdc-arb", Chain::Arbitrum, "ETH", "USDC", 500.0, 1_010_000.0, 2_020_000.0),
        pool("eth-dai-arb", Chain::Arbitrum, "ETH", "DAI", 400.0, 800_000.0, 1_600_000.0),
        pool("usdc-dai-arb", Chain::Arbitrum, "USDC", "DAI", 2_000_000.0, 2_030_000.0, 4_030_000.0),
        pool("matic-usdc-poly", Chain::Polygon, "MATIC", "USDC", 2_000_000.0, 1_400_000.0, 2_800_000.0),
        pool("matic-eth-poly", Chain::Polygon, "MATIC", "ETH", 1_000_000.0, 360.0, 1_440_000.0),
        pool("eth-usdc-poly", Chain::Polygon, "ETH", "USDC", 300.0, 600_000.0, 1_200_000.0),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let mut builder = ArbitrageServiceBuilder::new();
    builder = match std::env::args().nth(1) {
        Some(path) => builder.with_config_file(&path).await?,
        None => {
            let mut config = ArbitrageConfig::default();
            config.observer.chains = vec![Chain::Ethereum, Chain::Arbitrum, Chain::Polygon];
            config.detector.interval_ms = 1_000;
            builder.with_config(config)
        }
    };

    let repository = Arc::new(InMemoryPoolRepository::with_pools(seed_pools()));
    let mut service = builder
        .with_repository(repository.clone())
        .add_chain_client(Arc::new(SimulatedChainClient::new(Chain::Ethereum, 19_000_000)))
        .add_chain_client(Arc::new(SimulatedChainClient::new(Chain::Arbitrum, 150_000_000)))
        .add_chain_client(Arc::new(SimulatedChainClient::new(Chain::Polygon, 52_000_000)))
        .build()?;

    service.start().await?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let opportunities = service.get_viable_opportunities(service.get_config().detector.min_profit_usd).await?;
    info!(count = opportunities.len(), "Viable two-pool opportunities");
    for opportunity in opportunities.iter().take(10) {
        println!(
            "{} {} ({}) -> {} ({}) delta {:.2}% profit ${:.2} gas ${:.2}",
            opportunity.token_pair,
            opportunity.pool_a,
            opportunity.chain_a,
            opportunity.pool_b,
            opportunity.chain_b,
            opportunity.price_delta * 100.0,
            opportunity.profit_estimate,
            opportunity.gas_estimate
        );
    }

    for route in service.get_top_opportunities(5).await {
        let path: Vec<String> = route.steps.iter().map(|step| format!("{}->{} via {}", step.token_in, step.token_out, step.pool_id)).collect();
        println!(
            "[{}] {} profit ${:.2} viability {:.1} risk {:.1} {}",
            route.strategy,
            route.id,
            route.estimated_profit,
            route.viability_score,
            route.risk_score,
            path.join(", ")
        );
    }

    let constraints = RouteConstraints::default().with_max_hops(3).with_cross_chain(false);
    let routes = service.find_arbitrage_routes("USDC", "ETH", 10_000.0, &constraints).await;
    info!(routes = routes.len(), "USDC/ETH routes within three hops");

    let stats = service.stats().await;
    info!(
        price_cache_entries = stats.price_cache_entries,
        hit_rate = stats.price_cache_hit_rate,
        price_points = repository.price_point_count(),
        opportunities = repository.opportunity_count(),
        "Service stats"
    );

    service.stop().await?;
    Ok(())
}
