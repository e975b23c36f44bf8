//! Per-segment and per-round telemetry.

use std::fmt;

use gf_solver::{STATUS_OK, STATUS_WARNING};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one segment calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Ok,
    Warning,
    Failed,
}

impl SegmentStatus {
    /// Map a solver status string. Anything unrecognised counts as failed.
    pub fn from_solver(status: &str) -> Self {
        match status {
            STATUS_OK => SegmentStatus::Ok,
            STATUS_WARNING => SegmentStatus::Warning,
            _ => SegmentStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Ok => "ok",
            SegmentStatus::Warning => "warning",
            SegmentStatus::Failed => "failed",
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == SegmentStatus::Ok
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    /// Worker slot that ran the segment.
    pub slot: usize,
    pub bus_names: Vec<String>,
    pub status: SegmentStatus,
    pub condition: String,
    pub build_time_s: f64,
    pub solve_time_s: f64,
}

impl SegmentReport {
    pub(crate) fn new(slot: usize, bus_names: Vec<String>) -> Self {
        Self {
            slot,
            bus_names,
            status: SegmentStatus::Failed,
            condition: String::new(),
            build_time_s: 0.0,
            solve_time_s: 0.0,
        }
    }

    pub fn total_time_s(&self) -> f64 {
        self.build_time_s + self.solve_time_s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundMode {
    Force,
    Selective,
}

impl fmt::Display for RoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundMode::Force => f.write_str("force"),
            RoundMode::Selective => f.write_str("selective"),
        }
    }
}

/// Aggregated result of one recalculation round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub mode: RoundMode,
    /// Reports of the dispatched segments, in dispatch order.
    pub segments: Vec<SegmentReport>,
    /// Segments produced by segmentation, dispatched or not.
    pub segments_total: usize,
    pub segments_skipped: usize,
    pub segmentation_time_s: f64,
    pub diff_time_s: f64,
    pub wall_time_s: f64,
}

impl RoundReport {
    pub fn dispatched(&self) -> usize {
        self.segments.len()
    }

    pub fn failed_segments(&self) -> impl Iterator<Item = &SegmentReport> {
        self.segments.iter().filter(|s| !s.status.is_ok())
    }

    pub fn all_ok(&self) -> bool {
        self.failed_segments().next().is_none()
    }

    pub fn log_summary(&self) {
        for segment in &self.segments {
            if segment.status.is_ok() {
                info!(
                    slot = segment.slot,
                    buses = segment.bus_names.len(),
                    status = %segment.status,
                    condition = %segment.condition,
                    build_time_s = segment.build_time_s,
                    solve_time_s = segment.solve_time_s,
                    total_time_s = segment.total_time_s(),
                    "segment finished"
                );
            } else {
                warn!(
                    slot = segment.slot,
                    buses = ?segment.bus_names,
                    status = %segment.status,
                    condition = %segment.condition,
                    "segment not solved"
                );
            }
        }
        info!(
            mode = %self.mode,
            total = self.segments_total,
            dispatched = self.dispatched(),
            skipped = self.segments_skipped,
            segmentation_time_s = self.segmentation_time_s,
            diff_time_s = self.diff_time_s,
            wall_time_s = self.wall_time_s,
            "round finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(slot: usize, status: SegmentStatus) -> SegmentReport {
        SegmentReport {
            status,
            ..SegmentReport::new(slot, vec![format!("bus_{slot}")])
        }
    }

    #[test]
    fn solver_status_mapping() {
        assert_eq!(SegmentStatus::from_solver("ok"), SegmentStatus::Ok);
        assert_eq!(SegmentStatus::from_solver("warning"), SegmentStatus::Warning);
        assert_eq!(SegmentStatus::from_solver("failed"), SegmentStatus::Failed);
        assert_eq!(SegmentStatus::from_solver(""), SegmentStatus::Failed);
    }

    #[test]
    fn failed_segments_include_warnings() {
        let round = RoundReport {
            mode: RoundMode::Force,
            segments: vec![
                report(0, SegmentStatus::Ok),
                report(1, SegmentStatus::Warning),
                report(2, SegmentStatus::Failed),
            ],
            segments_total: 4,
            segments_skipped: 1,
            segmentation_time_s: 0.0,
            diff_time_s: 0.0,
            wall_time_s: 0.0,
        };
        let failed: Vec<usize> = round.failed_segments().map(|s| s.slot).collect();
        assert_eq!(failed, vec![1, 2]);
        assert_eq!(round.dispatched(), 3);
        assert!(!round.all_ok());
    }

    #[test]
    fn serializes_lowercase_status() {
        let json = serde_json::to_value(report(0, SegmentStatus::Warning)).unwrap();
        assert_eq!(json["status"], "warning");
    }
}
