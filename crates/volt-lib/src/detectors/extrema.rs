use crate::signal::SeriesStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtremumKind {
    Peak,
    Low,
}

/// A local turning point, with a snapshot of the sample it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremumPoint {
    /// Position in the originating store.
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub kind: ExtremumKind,
}

/// Local maxima: samples strictly greater than both immediate neighbours.
///
/// There is no prominence or minimum-distance filter, so every strict turning
/// point counts and noisy signals produce many peaks. Plateaus never qualify,
/// and the first and last samples are never classified.
pub fn find_peaks(store: &SeriesStore) -> Vec<ExtremumPoint> {
    scan(store, ExtremumKind::Peak)
}

/// Local minima: samples strictly less than both immediate neighbours.
///
/// Same rules as [`find_peaks`], mirrored.
pub fn find_lows(store: &SeriesStore) -> Vec<ExtremumPoint> {
    scan(store, ExtremumKind::Low)
}

/// Peaks and lows from a single pass over the series.
pub fn find_extrema(store: &SeriesStore) -> (Vec<ExtremumPoint>, Vec<ExtremumPoint>) {
    let mut peaks = Vec::new();
    let mut lows = Vec::new();
    for_each_extremum(store, |point| match point.kind {
        ExtremumKind::Peak => peaks.push(point),
        ExtremumKind::Low => lows.push(point),
    });
    (peaks, lows)
}

fn scan(store: &SeriesStore, wanted: ExtremumKind) -> Vec<ExtremumPoint> {
    let mut out = Vec::new();
    for_each_extremum(store, |point| {
        if point.kind == wanted {
            out.push(point);
        }
    });
    out
}

fn for_each_extremum(store: &SeriesStore, mut visit: impl FnMut(ExtremumPoint)) {
    let data = store.samples();
    if data.len() < 3 {
        return;
    }
    for (offset, w) in data.windows(3).enumerate() {
        let (prev, cur, next) = (w[0].value, w[1].value, w[2].value);
        let kind = if prev < cur && cur > next {
            ExtremumKind::Peak
        } else if prev > cur && cur < next {
            ExtremumKind::Low
        } else {
            continue;
        };
        visit(ExtremumPoint {
            index: offset + 1,
            timestamp: w[1].timestamp,
            value: cur,
            kind,
        });
    }
}
