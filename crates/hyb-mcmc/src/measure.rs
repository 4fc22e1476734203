use std::collections::BTreeMap;

use hyb_core::OrbitalSegments;
use serde::{Deserialize, Serialize};

use crate::params::SimulationParams;

/// Enabled measurement channels and the sizes that go with them.
///
/// Green's-function channels (`time`, `freq`, `legendre`, `nnt`, `nnw`,
/// `g2w`, `h2w`) are carried for external measurement banks; the built-in
/// [`SegmentObservables`] only evaluates the segment-level observables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementChannels {
    /// `MEASURE_time`.
    pub time: bool,
    /// `MEASURE_freq`.
    pub freq: bool,
    /// `MEASURE_legendre`.
    pub legendre: bool,
    /// `MEASURE_nn`.
    pub nn: bool,
    /// `MEASURE_nnt`.
    pub nnt: bool,
    /// `MEASURE_nnw`.
    pub nnw: bool,
    /// `MEASURE_g2w`.
    pub g2w: bool,
    /// `MEASURE_h2w`.
    pub h2w: bool,
    /// `MEASURE_sector_statistics`.
    pub sector_statistics: bool,
    /// `COMPUTE_VERTEX`.
    pub compute_vertex: bool,
    /// `N_MATSUBARA`, zero when unset.
    pub n_matsubara: u32,
    /// `N_LEGENDRE`, zero when unset.
    pub n_legendre: u32,
    /// `N_nn`, zero when unset.
    pub n_nn: u32,
    /// `N_W`, zero when unset.
    pub n_bosonic: u32,
    /// `N_w2`, zero when unset.
    pub n_w2: u32,
    /// `N_TAU`, zero when unset.
    pub n_tau: u32,
    /// Auxiliary two-particle frequency count `N_w2 + N_W - 1`, or zero.
    pub n_w_aux: u32,
    /// Length of the order histogram.
    pub n_histogram_orders: usize,
}

impl MeasurementChannels {
    /// Extracts the channels from a parameter set.
    pub fn from_params(params: &SimulationParams) -> Self {
        let n_w2 = params.n_w2.unwrap_or(0);
        let n_bosonic = params.n_bosonic.unwrap_or(0);
        Self {
            time: params.measure_time,
            freq: params.measure_freq,
            legendre: params.measure_legendre,
            nn: params.measure_nn,
            nnt: params.measure_nnt,
            nnw: params.measure_nnw,
            g2w: params.measure_g2w,
            h2w: params.measure_h2w,
            sector_statistics: params.measure_sector_statistics,
            compute_vertex: params.compute_vertex,
            n_matsubara: params.n_matsubara.unwrap_or(0),
            n_legendre: params.n_legendre.unwrap_or(0),
            n_nn: params.n_nn.unwrap_or(0),
            n_bosonic,
            n_w2,
            n_tau: params.n_tau.unwrap_or(0),
            n_w_aux: if n_w2 + n_bosonic > 1 {
                n_w2 + n_bosonic - 1
            } else {
                0
            },
            n_histogram_orders: params.n_histogram_orders,
        }
    }

    /// Returns true when at least one `MEASURE_*` channel is on.
    pub fn any_enabled(&self) -> bool {
        self.time
            || self.freq
            || self.legendre
            || self.nn
            || self.nnt
            || self.nnw
            || self.g2w
            || self.h2w
            || self.sector_statistics
    }

    /// Startup lines announcing what will be measured.
    pub fn announcements(&self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if self.time {
            lines.push("measuring gt");
        }
        if self.freq {
            lines.extend(["measuring gw", "measuring fw"]);
        }
        if self.legendre {
            lines.extend(["measuring gl", "measuring fl"]);
        }
        if self.g2w {
            lines.push("measuring g2w");
        }
        if self.h2w {
            lines.push("measuring h2w");
        }
        if self.nn {
            lines.push("measuring nn");
        }
        if self.nnt {
            lines.push("measuring nnt");
        }
        if self.nnw {
            lines.push("measuring nnw");
        }
        if self.sector_statistics {
            lines.push("measuring sector statistics");
        }
        if self.compute_vertex {
            lines.push("vertex will be computed");
        }
        lines
    }
}

/// Accumulator fed once per thermalized unit of work.
pub trait MeasurementBank {
    /// Records the current configuration with its sign.
    fn measure(&mut self, orbitals: &[OrbitalSegments], sign: f64);

    /// Number of recorded samples.
    fn samples(&self) -> u64;
}

/// Segment-level observables: sign, densities, order histograms,
/// static density-density correlator and occupation-sector statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentObservables {
    channels: MeasurementChannels,
    beta: f64,
    n_orbitals: usize,
    samples: u64,
    sign_sum: f64,
    density_sum: Vec<f64>,
    order_histogram: Vec<Vec<u64>>,
    nn_sum: Vec<f64>,
    sector_time: BTreeMap<u64, f64>,
}

/// Averages derived from a [`SegmentObservables`] bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableSummary {
    /// Number of recorded samples.
    pub samples: u64,
    /// Average fermionic sign.
    pub average_sign: f64,
    /// Sign-weighted orbital densities (with `MEASURE_time`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub densities: Option<Vec<f64>>,
    /// Probability of each expansion order, per orbital.
    pub order_histogram: Vec<Vec<f64>>,
    /// Row-major `<n_i n_j>` (with `MEASURE_nn`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nn: Option<Vec<f64>>,
    /// Fraction of imaginary time spent in each occupation bitmask
    /// (with `MEASURE_sector_statistics`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sectors: Option<BTreeMap<u64, f64>>,
}

impl SegmentObservables {
    /// Creates an empty bank for `n_orbitals` orbitals on `[0, beta)`.
    pub fn new(channels: MeasurementChannels, beta: f64, n_orbitals: usize) -> Self {
        let orders = channels.n_histogram_orders;
        Self {
            channels,
            beta,
            n_orbitals,
            samples: 0,
            sign_sum: 0.0,
            density_sum: vec![0.0; n_orbitals],
            order_histogram: vec![vec![0; orders]; n_orbitals],
            nn_sum: vec![0.0; n_orbitals * n_orbitals],
            sector_time: BTreeMap::new(),
        }
    }

    /// Channels this bank was built for.
    pub fn channels(&self) -> &MeasurementChannels {
        &self.channels
    }

    /// Normalized averages of everything recorded so far.
    pub fn summary(&self) -> ObservableSummary {
        let samples = self.samples.max(1) as f64;
        let sign = if self.sign_sum == 0.0 { 1.0 } else { self.sign_sum };
        ObservableSummary {
            samples: self.samples,
            average_sign: self.sign_sum / samples,
            densities: self
                .channels
                .time
                .then(|| self.density_sum.iter().map(|n| n / sign).collect()),
            order_histogram: self
                .order_histogram
                .iter()
                .map(|row| row.iter().map(|&count| count as f64 / samples).collect())
                .collect(),
            nn: self
                .channels
                .nn
                .then(|| self.nn_sum.iter().map(|nn| nn / sign).collect()),
            sectors: self.channels.sector_statistics.then(|| {
                self.sector_time
                    .iter()
                    .map(|(&sector, &time)| (sector, time / samples))
                    .collect()
            }),
        }
    }

    fn record_sectors(&mut self, orbitals: &[OrbitalSegments]) {
        let mut times: Vec<f64> = vec![0.0];
        for orbital in orbitals {
            for segment in orbital.segments() {
                times.push(segment.t_start);
                times.push(segment.t_end);
            }
        }
        times.sort_by(f64::total_cmp);
        times.dedup();
        for (index, &start) in times.iter().enumerate() {
            let end = times.get(index + 1).copied().unwrap_or(self.beta);
            let width = end - start;
            if width <= 0.0 {
                continue;
            }
            let midpoint = start + 0.5 * width;
            let sector = orbitals
                .iter()
                .enumerate()
                .filter(|(_, orbital)| orbital.is_occupied(midpoint))
                .fold(0u64, |mask, (bit, _)| mask | (1 << bit));
            *self.sector_time.entry(sector).or_insert(0.0) += width / self.beta;
        }
    }
}

impl MeasurementBank for SegmentObservables {
    fn measure(&mut self, orbitals: &[OrbitalSegments], sign: f64) {
        self.samples += 1;
        self.sign_sum += sign;
        for (index, orbital) in orbitals.iter().enumerate().take(self.n_orbitals) {
            if let Some(slot) = self.order_histogram[index].get_mut(orbital.len()) {
                *slot += 1;
            }
        }
        if self.channels.time {
            for (density, orbital) in self.density_sum.iter_mut().zip(orbitals) {
                *density += sign * orbital.total_length() / self.beta;
            }
        }
        if self.channels.nn {
            let n = self.n_orbitals;
            let covered = n.min(orbitals.len());
            for i in 0..covered {
                self.nn_sum[i * n + i] += sign * orbitals[i].total_length() / self.beta;
                for j in (i + 1)..covered {
                    let value = sign * orbitals[i].overlap(&orbitals[j]) / self.beta;
                    self.nn_sum[i * n + j] += value;
                    self.nn_sum[j * n + i] += value;
                }
            }
        }
        if self.channels.sector_statistics && self.n_orbitals <= 64 {
            self.record_sectors(orbitals);
        }
    }

    fn samples(&self) -> u64 {
        self.samples
    }
}
