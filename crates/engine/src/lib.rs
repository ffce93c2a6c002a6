//! Tick aggregation engine
//!
//! Turns a counter's append-only tick log into live scalar aggregates and
//! into a percentage-normalized point set for plotting.
//!
//! The pure pieces ([`compute_bounds`], [`normalize`], [`AggregateReducer`])
//! never touch a store. [`GraphStateAggregator`] wires them to an injected
//! [`TickStore`] and keeps one consistent [`GraphState`] published while the
//! ticks and the viewport change underneath it.

pub mod aggregation;
pub mod aggregator;
pub mod bounds;
pub mod id_alloc;
pub mod memory_store;
pub mod normalize;
pub mod store;

pub use aggregation::{sum_by_parent_stream, AggregateReducer};
pub use aggregator::{compute_graph_state, GraphStateAggregator, GraphStateReceiver};
pub use bounds::{compute_bounds, Bounds};
pub use id_alloc::IdentifierAllocator;
pub use memory_store::MemoryTickStore;
pub use normalize::{expand_domain, expand_range, normalize};
pub use store::{AmountStream, TickListStream, TickStore};

pub use tally_shared::{
    AmountRange, Counter, GraphInputs, GraphState, NormalizedPoint, SortKey, TallyError,
    TallyResult, Tick, TimeWindow, Timestamp, NOID,
};
