//! Read side of the tick store as seen by the engine

use futures::stream::BoxStream;
use tally_shared::{SortKey, TallyResult, Tick, TimeWindow};

/// Full tick lists, one per change
pub type TickListStream = BoxStream<'static, TallyResult<Vec<Tick>>>;

/// Live scalar values
pub type AmountStream = BoxStream<'static, TallyResult<f64>>;

/// Live, queryable tick storage.
///
/// Every stream emits the current value on subscription and again after
/// each change. Unknown parents yield empty lists, never errors; `Err`
/// items are reserved for failures of the store itself.
pub trait TickStore: Send + Sync {
    /// All ticks of `parent_id`, ordered ascending by `sort`.
    fn stream_ticks(&self, parent_id: i64, sort: SortKey) -> TickListStream;

    /// Sum of `parent_id`'s amounts whose `sort` timestamp lies in `window`.
    fn stream_aggregate(&self, parent_id: i64, sort: SortKey, window: TimeWindow) -> AmountStream;

    /// Every tick in the store, any order.
    fn stream_all_ticks(&self) -> TickListStream;
}
