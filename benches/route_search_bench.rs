use criterion::{Criterion, criterion_group, criterion_main};
use pool_arb::logic::graph::{CycleSearchParams, TokenGraph, find_cycles};
use pool_arb::{ArbitrageRouteFinderBuilder, Chain, MockPoolBuilder, Pool, RouteConstraints};
use std::hint::black_box;

const SYMBOLS: [&str; 8] = ["ETH", "USDC", "DAI", "WBTC", "USDT", "LINK", "UNI", "AAVE"];

/// Fully connected market with two slightly mispriced pools per pair.
fn dense_market() -> Vec<Pool> {
    let mut pools = Vec::new();
    for (i, a) in SYMBOLS.iter().enumerate() {
        for (j, b) in SYMBOLS.iter().enumerate().skip(i + 1) {
            for venue in 0..2 {
                let skew = 1.0 + 0.003 * ((i + j + venue) % 5) as f64;
                pools.push(
                    MockPoolBuilder::new(&format!("{a}-{b}-{venue}"), a, b)
                        .chain(Chain::Polygon)
                        .reserves(1_000_000.0, 1_000_000.0 * skew)
                        .liquidity_usd(2_000_000.0)
                        .fee_ppm(500)
                        .build(),
                );
            }
        }
    }
    pools
}

fn benchmark_find_cycles(c: &mut Criterion) {
    let token_graph = TokenGraph::from_pools(dense_market());
    let params = CycleSearchParams { min_hops: 3, max_hops: 4, max_price_impact: 0.1, max_iterations: 100_000 };

    c.bench_function("find_cycles_4_hops", |b| {
        b.iter(|| find_cycles(black_box(&token_graph), black_box("ETH"), black_box("USDC"), black_box(1_000.0), &params, |_| true))
    });
}

fn benchmark_route_search(c: &mut Criterion) {
    let constraints = RouteConstraints::default().with_min_profit(0.0).with_max_liquidity_utilization(1.0);

    let mut group = c.benchmark_group("find_arbitrage_routes");
    for parallel in [false, true] {
        let finder = ArbitrageRouteFinderBuilder::new().with_parallel_calculation(parallel).with_pools(dense_market()).build();
        group.bench_function(if parallel { "parallel" } else { "sequential" }, |b| {
            b.iter(|| {
                // distinct amounts so the route cache never answers
                let amount = black_box(1_000.0 + next_amount_offset());
                finder.find_arbitrage_routes("ETH", "USDC", amount, &constraints)
            })
        });
    }
    group.finish();
}

fn benchmark_top_opportunities(c: &mut Criterion) {
    let finder = ArbitrageRouteFinderBuilder::new().with_pools(dense_market()).build();
    c.bench_function("get_top_opportunities", |b| b.iter(|| finder.get_top_opportunities(black_box(20))));
}

fn next_amount_offset() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    (COUNTER.fetch_add(1, Ordering::Relaxed) % 1_000_000) as f64 * 1e-3
}

criterion_group!(benches, benchmark_find_cycles, benchmark_route_search, benchmark_top_opportunities);
criterion_main!(benches);
