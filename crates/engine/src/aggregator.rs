//! Live graph state for one counter
//!
//! [`GraphStateAggregator`] owns a driver task that follows the current
//! [`GraphInputs`], keeps exactly one tick subscription open for the
//! selected `(counter, sort key)` and republishes a [`GraphState`] whenever
//! the ticks or the viewport change.
//!
//! Each recomputation is tagged with a generation number. Any input change
//! or new tick list bumps the generation and aborts the job in flight, and
//! a finished job is only published if its generation is still current, so
//! a consumer never sees state for superseded inputs.

use std::sync::Arc;

use chrono::Duration;
use futures::StreamExt;
use tally_config::{AggregatorConfig, StoreFailurePolicy};
use tally_shared::{
    AmountRange, GraphInputs, GraphState, SortKey, TallyError, TallyResult, Tick, TimeWindow,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bounds::compute_bounds;
use crate::normalize::{expand_domain, expand_range, normalize};
use crate::store::{TickListStream, TickStore};

/// Run the full pipeline for one tick list: drop ticks outside the domain
/// override, measure bounds, pick the effective viewport, widen degenerate
/// axes and normalize.
pub fn compute_graph_state(all_ticks: &[Tick], inputs: &GraphInputs, padding: Duration) -> GraphState {
    let sort = inputs.sort_key;
    let filtered: Vec<Tick> = all_ticks
        .iter()
        .filter(|tick| inputs.admits(tick))
        .cloned()
        .collect();

    let bounds = compute_bounds(&filtered, sort);
    let current_domain = expand_domain(inputs.domain_override.unwrap_or(bounds.domain), padding);
    let current_range = expand_range(inputs.range_override.unwrap_or(bounds.range));
    let graph_points = normalize(&filtered, sort, current_domain, current_range);

    GraphState {
        graph_points,
        domain_bounds: bounds.domain,
        current_domain,
        range_bounds: bounds.range,
        current_range,
    }
}

/// What the driver has published so far
#[derive(Debug, Clone)]
enum Feed {
    Pending,
    Ready(Arc<GraphState>),
    Failed(TallyError),
}

/// Consumer end of an aggregator. Only the newest state is kept; a slow
/// reader skips intermediate states rather than queueing them.
#[derive(Debug, Clone)]
pub struct GraphStateReceiver {
    rx: watch::Receiver<Feed>,
}

impl GraphStateReceiver {
    /// Wait for the next state this receiver has not seen yet.
    ///
    /// Returns `None` once the aggregator has stopped and everything
    /// published has been observed.
    pub async fn next(&mut self) -> Option<TallyResult<Arc<GraphState>>> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            match &*self.rx.borrow_and_update() {
                Feed::Pending => continue,
                Feed::Ready(state) => return Some(Ok(state.clone())),
                Feed::Failed(err) => return Some(Err(err.clone())),
            }
        }
    }

    /// Most recently published state, if any.
    pub fn latest(&self) -> Option<Arc<GraphState>> {
        match &*self.rx.borrow() {
            Feed::Ready(state) => Some(state.clone()),
            Feed::Pending | Feed::Failed(_) => None,
        }
    }
}

/// Handle to a running graph aggregation.
///
/// Dropping the handle stops the driver task.
pub struct GraphStateAggregator {
    inputs_tx: watch::Sender<GraphInputs>,
    // Never marked seen, so receivers cloned from it start with the
    // latest published value unread.
    feed_rx: watch::Receiver<Feed>,
    driver: JoinHandle<()>,
}

impl GraphStateAggregator {
    /// Start aggregating `inputs` against `store`. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        store: Arc<dyn TickStore>,
        inputs: GraphInputs,
        config: &AggregatorConfig,
    ) -> TallyResult<Self> {
        inputs.check()?;

        let padding = Duration::try_seconds(
            i64::try_from(config.degenerate_domain_padding_secs).unwrap_or(i64::MAX),
        )
        .unwrap_or_else(|| Duration::days(1));

        let (inputs_tx, inputs_rx) = watch::channel(inputs);
        let (feed_tx, feed_rx) = watch::channel(Feed::Pending);

        let driver = Driver {
            store,
            inputs_rx,
            feed_tx,
            policy: config.failure_policy,
            padding,
            offload: config.offload_recompute,
        };

        log::info!(
            "Starting graph aggregator (policy: {:?}, offload: {})",
            config.failure_policy,
            config.offload_recompute
        );

        Ok(Self {
            inputs_tx,
            feed_rx,
            driver: tokio::spawn(driver.run()),
        })
    }

    pub fn subscribe(&self) -> GraphStateReceiver {
        GraphStateReceiver {
            rx: self.feed_rx.clone(),
        }
    }

    /// Inputs as last applied through this handle
    pub fn inputs(&self) -> GraphInputs {
        self.inputs_tx.borrow().clone()
    }

    pub fn set_counter(&self, counter_id: i64) -> TallyResult<()> {
        self.update(|inputs| inputs.counter_id = counter_id)
    }

    pub fn set_sort_key(&self, sort_key: SortKey) -> TallyResult<()> {
        self.update(|inputs| inputs.sort_key = sort_key)
    }

    /// `None` fits the time axis to the data.
    pub fn set_domain_override(&self, domain: Option<TimeWindow>) -> TallyResult<()> {
        self.update(|inputs| inputs.domain_override = domain)
    }

    /// `None` fits the amount axis to the data.
    pub fn set_range_override(&self, range: Option<AmountRange>) -> TallyResult<()> {
        self.update(|inputs| inputs.range_override = range)
    }

    /// Apply several input changes as one recombination.
    pub fn update(&self, edit: impl FnOnce(&mut GraphInputs)) -> TallyResult<()> {
        if self.inputs_tx.is_closed() {
            return Err(TallyError::Cancelled);
        }

        let mut next = self.inputs_tx.borrow().clone();
        edit(&mut next);
        next.check()?;

        for warning in next.validate().warnings {
            log::warn!("{}", warning);
        }

        self.inputs_tx.send_if_modified(move |current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        Ok(())
    }

    /// Stop the driver and wait for it to exit.
    pub async fn shutdown(self) {
        let Self {
            inputs_tx, driver, ..
        } = self;
        drop(inputs_tx);
        if let Err(err) = driver.await {
            log::error!("Graph aggregator driver failed: {}", err);
        }
    }
}

type Recompute = JoinHandle<(u64, GraphState)>;

struct Driver {
    store: Arc<dyn TickStore>,
    inputs_rx: watch::Receiver<GraphInputs>,
    feed_tx: watch::Sender<Feed>,
    policy: StoreFailurePolicy,
    padding: Duration,
    offload: bool,
}

impl Driver {
    async fn run(mut self) {
        let mut inputs = self.inputs_rx.borrow_and_update().clone();
        let mut ticks = self.subscribe(&inputs);
        let mut last_ticks: Option<Arc<Vec<Tick>>> = None;
        let mut generation: u64 = 0;
        let mut pending: Option<Recompute> = None;

        loop {
            tokio::select! {
                // Input changes win ties so a finished job for stale inputs
                // is never published after the inputs have moved on.
                biased;

                changed = self.inputs_rx.changed() => {
                    if changed.is_err() {
                        log::debug!("Graph inputs closed, stopping");
                        break;
                    }
                    let next = self.inputs_rx.borrow_and_update().clone();
                    let change = next.detect_changes_from(&inputs);
                    inputs = next;
                    if !change.has_changes {
                        continue;
                    }

                    generation += 1;
                    log::debug!("Graph inputs changed (gen {}): {:?}", generation, change.change_summary);

                    if change.requires_resubscribe {
                        cancel(&mut pending);
                        last_ticks = None;
                        ticks = self.subscribe(&inputs);
                    } else if let Some(list) = &last_ticks {
                        supersede(&mut pending, self.schedule(generation, list.clone(), inputs.clone()));
                    }
                }

                item = ticks.next() => match item {
                    Some(Ok(list)) => {
                        if last_ticks.as_deref() == Some(&list) {
                            continue;
                        }
                        let list = Arc::new(list);
                        last_ticks = Some(list.clone());
                        generation += 1;
                        supersede(&mut pending, self.schedule(generation, list, inputs.clone()));
                    }
                    Some(Err(err)) => match self.policy {
                        StoreFailurePolicy::RetainLast => {
                            log::warn!("Tick store failed for counter {}, keeping last state: {}", inputs.counter_id, err);
                        }
                        StoreFailurePolicy::Terminate => {
                            log::error!("Tick store failed for counter {}, stopping: {}", inputs.counter_id, err);
                            cancel(&mut pending);
                            self.feed_tx.send_replace(Feed::Failed(err));
                            break;
                        }
                    },
                    None => {
                        log::info!("Tick stream for counter {} ended", inputs.counter_id);
                        break;
                    }
                },

                done = join(&mut pending), if pending.is_some() => {
                    pending = None;
                    match done {
                        Ok((job_generation, state)) if job_generation == generation => {
                            log::debug!(
                                "Publishing graph state (gen {}, {} points)",
                                generation,
                                state.graph_points.len()
                            );
                            self.feed_tx.send_replace(Feed::Ready(Arc::new(state)));
                        }
                        Ok((job_generation, _)) => {
                            log::debug!("Discarding stale graph state (gen {} < {})", job_generation, generation);
                        }
                        Err(err) if err.is_cancelled() => {}
                        Err(err) => {
                            log::error!("Graph recomputation failed: {}", err);
                        }
                    }
                }
            }
        }

        cancel(&mut pending);
    }

    fn subscribe(&self, inputs: &GraphInputs) -> TickListStream {
        log::debug!(
            "Subscribing to ticks of counter {} by {}",
            inputs.counter_id,
            inputs.sort_key
        );
        self.store.stream_ticks(inputs.counter_id, inputs.sort_key)
    }

    fn schedule(&self, generation: u64, ticks: Arc<Vec<Tick>>, inputs: GraphInputs) -> Recompute {
        let padding = self.padding;
        let job = move || (generation, compute_graph_state(&ticks, &inputs, padding));
        if self.offload {
            tokio::task::spawn_blocking(job)
        } else {
            tokio::spawn(async move { job() })
        }
    }
}

/// Replace the job in flight, aborting the old one.
fn supersede(pending: &mut Option<Recompute>, next: Recompute) {
    if let Some(old) = pending.replace(next) {
        old.abort();
    }
}

fn cancel(pending: &mut Option<Recompute>) {
    if let Some(old) = pending.take() {
        old.abort();
    }
}

async fn join(
    pending: &mut Option<Recompute>,
) -> Result<(u64, GraphState), tokio::task::JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
