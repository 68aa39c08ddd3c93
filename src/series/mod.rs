//! # Series Module
//!
//! Shapes the record log into plottable series: extract an index and a value
//! per record, turn invalid values into gaps and thin long series down to a
//! display budget.
//!
//! Results are cached per snapshot and recomputed when a different version or
//! a different record log is presented.

pub mod channels;

use std::sync::Arc;

use crate::telemetry::record::{Baselines, TelemetryRecord};
use crate::telemetry::session::SessionSnapshot;

/// Default number of points kept for display.
pub const DEFAULT_DISPLAY_POINTS: usize = 200;

type IndexFn = Box<dyn Fn(&TelemetryRecord) -> f64 + Send + Sync>;
type ValueFn<V> = Box<dyn Fn(&TelemetryRecord, &Baselines) -> V + Send + Sync>;
type InvalidFn<V> = Box<dyn Fn(&V) -> bool + Send + Sync>;

/// One plotted sample. `value == None` is a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint<V> {
    pub index: f64,
    pub value: Option<V>,
}

/// Thin a sequence to at most `target` items by stride sampling
///
/// With `step = len / target`, item `i` is kept when `floor(i mod step) == 0`,
/// i.e. the first item of each bucket. Sequences shorter than `target` are
/// returned whole.
///
/// # Examples
///
/// ```
/// use ground_station::series::downsample;
///
/// let values: Vec<u32> = (0..10).collect();
/// assert_eq!(downsample(&values, 5), vec![0, 2, 4, 6, 8]);
/// assert_eq!(downsample(&values, 20).len(), 10);
/// ```
#[must_use]
pub fn downsample<T: Clone>(items: &[T], target: usize) -> Vec<T> {
    if target == 0 {
        return Vec::new();
    }
    if items.len() <= target {
        return items.to_vec();
    }

    let step = items.len() as f64 / target as f64;
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| (*i as f64 % step).floor() == 0.0)
        .map(|(_, item)| item.clone())
        .collect()
}

/// Seconds since session start, the default index.
#[must_use]
pub fn seconds_index(record: &TelemetryRecord) -> f64 {
    record.seconds()
}

#[derive(Debug)]
struct Cache<V> {
    version: u64,
    records: Arc<Vec<TelemetryRecord>>,
    points: Vec<SeriesPoint<V>>,
    display: Option<(usize, Vec<SeriesPoint<V>>)>,
}

/// A named, lazily evaluated series over the record log.
pub struct Series<V> {
    name: String,
    index_fn: IndexFn,
    value_fn: ValueFn<V>,
    invalid_fn: InvalidFn<V>,
    cache: Option<Cache<V>>,
}

impl<V> std::fmt::Debug for Series<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Series")
            .field("name", &self.name)
            .field("cached_version", &self.cache.as_ref().map(|c| c.version))
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Series<V> {
    /// Series indexed by session seconds with no invalid values.
    pub fn new<F>(name: impl Into<String>, value_fn: F) -> Self
    where
        F: Fn(&TelemetryRecord, &Baselines) -> V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            index_fn: Box::new(seconds_index),
            value_fn: Box::new(value_fn),
            invalid_fn: Box::new(|_| false),
            cache: None,
        }
    }

    /// Replace the index extractor.
    #[must_use]
    pub fn with_index<F>(mut self, index_fn: F) -> Self
    where
        F: Fn(&TelemetryRecord) -> f64 + Send + Sync + 'static,
    {
        self.index_fn = Box::new(index_fn);
        self.cache = None;
        self
    }

    /// Mark values matching `invalid_fn` as gaps.
    #[must_use]
    pub fn with_invalid<F>(mut self, invalid_fn: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.invalid_fn = Box::new(invalid_fn);
        self.cache = None;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cache_for(&mut self, snapshot: &SessionSnapshot) -> &mut Cache<V> {
        // Versions restart with every session; the shared log tells sessions apart.
        let stale = self.cache.as_ref().map_or(true, |c| {
            c.version != snapshot.version || !Arc::ptr_eq(&c.records, &snapshot.records)
        });

        if stale {
            let points = snapshot
                .records
                .iter()
                .map(|record| {
                    let value = (self.value_fn)(record, &snapshot.baselines);
                    SeriesPoint {
                        index: (self.index_fn)(record),
                        value: (!(self.invalid_fn)(&value)).then_some(value),
                    }
                })
                .collect();

            self.cache = Some(Cache {
                version: snapshot.version,
                records: Arc::clone(&snapshot.records),
                points,
                display: None,
            });
        }

        self.cache.get_or_insert_with(|| Cache {
            version: snapshot.version,
            records: Arc::clone(&snapshot.records),
            points: Vec::new(),
            display: None,
        })
    }

    /// Every point of the series for this snapshot.
    pub fn points(&mut self, snapshot: &SessionSnapshot) -> &[SeriesPoint<V>] {
        &self.cache_for(snapshot).points
    }

    /// Points thinned to at most `target` for display.
    pub fn display(&mut self, snapshot: &SessionSnapshot, target: usize) -> &[SeriesPoint<V>] {
        let cache = self.cache_for(snapshot);
        let fresh = matches!(&cache.display, Some((t, _)) if *t == target);
        if !fresh {
            cache.display = Some((target, downsample(&cache.points, target)));
        }

        match &cache.display {
            Some((_, points)) => points.as_slice(),
            None => &[],
        }
    }

    /// Valid values only, for axis bounds and summaries.
    pub fn valid_values(&mut self, snapshot: &SessionSnapshot) -> Vec<V> {
        self.points(snapshot)
            .iter()
            .filter_map(|p| p.value.clone())
            .collect()
    }
}
