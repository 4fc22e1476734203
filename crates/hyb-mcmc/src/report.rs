use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::measure::MeasurementChannels;
use crate::runtime::WorkerPool;
use crate::schedule::UpdateKind;

/// Acceptance statistics of one move type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceRow {
    /// Move type.
    pub kind: UpdateKind,
    /// Table label.
    pub label: String,
    /// Number of proposals.
    pub proposed: u64,
    /// Number of accepted proposals.
    pub accepted: u64,
    /// `accepted / proposed`, zero when nothing was proposed.
    pub rate: f64,
}

/// Per-move acceptance table in move order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceReport {
    /// One row per move type.
    pub rows: Vec<AcceptanceRow>,
}

impl AcceptanceReport {
    /// Builds the table from the kernel counters.
    pub fn from_counters(accepted: &[u64; 7], proposed: &[u64; 7]) -> Self {
        let rows = UpdateKind::ALL
            .iter()
            .map(|&kind| {
                let (nacc, nprop) = (accepted[kind.index()], proposed[kind.index()]);
                AcceptanceRow {
                    kind,
                    label: kind.label().to_string(),
                    proposed: nprop,
                    accepted: nacc,
                    rate: if nprop == 0 {
                        0.0
                    } else {
                        nacc as f64 / nprop as f64
                    },
                }
            })
            .collect();
        Self { rows }
    }

    /// Total proposals over all move types.
    pub fn total_proposed(&self) -> u64 {
        self.rows.iter().map(|row| row.proposed).sum()
    }

    /// Row of a move type.
    pub fn row(&self, kind: UpdateKind) -> &AcceptanceRow {
        &self.rows[kind.index()]
    }
}

impl fmt::Display for AcceptanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:>14} {:>14} {:>10}",
            "update", "proposed", "accepted", "rate"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<20} {:>14} {:>14} {:>10.6}",
                row.label, row.proposed, row.accepted, row.rate
            )?;
        }
        Ok(())
    }
}

/// Emits the startup messages of a worker.
pub(crate) fn log_startup(
    pool: WorkerPool,
    channels: &MeasurementChannels,
    inputs: &[String],
    verbose: bool,
    max_time: u64,
) {
    if verbose && pool.rank == 0 {
        for line in channels.announcements() {
            info!("{line}");
        }
        for line in inputs {
            info!("{line}");
        }
        info!("Simulation scheduled to run {max_time} seconds");
    }
    if pool.rank == 0 {
        info!("Hybridization Expansion Simulation CT-HYB");
    }
    info!(
        rank = pool.rank,
        size = pool.size,
        "process {} of total: {} starting simulation",
        pool.rank,
        pool.size
    );
}
