//! Live graph demonstration
//!
//! Records a week of ticks into an in-memory store, then follows the graph
//! while new ticks arrive and the viewport moves.
//!
//! Run with `RUST_LOG=debug cargo run --example live_graph [config.yaml]`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::StreamExt;
use tally_config::EngineConfig;
use tally_engine::{
    AggregateReducer, AmountRange, GraphInputs, GraphState, GraphStateAggregator, MemoryTickStore,
    SortKey, TickStore, TimeWindow,
};

fn print_state(label: &str, state: &GraphState) {
    println!("{label}:");
    println!(
        "  Domain: {} .. {}",
        state.current_domain.start(),
        state.current_domain.end()
    );
    println!(
        "  Range: {:.1} .. {:.1} (data {:.1} .. {:.1})",
        state.current_range.low(),
        state.current_range.high(),
        state.range_bounds.low(),
        state.range_bounds.high()
    );
    println!(
        "  Points: {} ({} inside the viewport)",
        state.graph_points.len(),
        state.visible_points().count()
    );
    for point in &state.graph_points {
        println!("    ({:.3}, {:.3})", point.x, point.y);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    println!("Tally Live Graph Demo\n");

    let store = Arc::new(MemoryTickStore::new(&config.allocator));
    let counter = store.create_counter("push-ups")?;
    let now = Utc::now();
    for (days_ago, amount) in [(6, 20.0), (5, 25.0), (4, 15.0), (3, 30.0), (2, 35.0), (1, 10.0)] {
        store.add_tick(counter.id, amount, Some(now - chrono::Duration::days(days_ago)))?;
    }

    let aggregator = GraphStateAggregator::spawn(
        store.clone(),
        GraphInputs::for_counter(counter.id, SortKey::TimeForData),
        &config.aggregator,
    )?;
    let mut states = aggregator.subscribe();

    if let Some(state) = states.next().await {
        print_state("Fit to data", &*state?);
    }

    store.add_tick(counter.id, 40.0, None)?;
    if let Some(state) = states.next().await {
        print_state("After a new tick", &*state?);
    }

    let last_three_days = TimeWindow::new(now - chrono::Duration::days(3), Utc::now());
    aggregator.update(|inputs| {
        inputs.domain_override = Some(last_three_days);
        inputs.range_override = Some(AmountRange::new(0.0, 50.0));
    })?;
    if let Some(state) = states.next().await {
        print_state("Last three days, fixed scale", &*state?);
    }

    let ticks = store.ticks_for(counter.id, SortKey::TimeForData);
    println!("Total: {}", AggregateReducer::total(&ticks));
    println!(
        "Average over the last three days: {:.2}",
        AggregateReducer::average(&ticks, SortKey::TimeForData, last_three_days)
    );

    let mut weekly = store.stream_aggregate(
        counter.id,
        SortKey::TimeForData,
        TimeWindow::new(now - chrono::Duration::days(7), Utc::now()),
    );
    if let Ok(Some(sum)) = tokio::time::timeout(Duration::from_secs(1), weekly.next()).await {
        println!("Sum over the last week: {:.1}", sum?);
    }

    aggregator.shutdown().await;
    Ok(())
}
