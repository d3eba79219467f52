//! Per-file change metrics
//!
//! Aggregates a file's hunks into one record per enabled measurement type.
//! Counts are derived, never stored along the way: raw and no-comment
//! added/deleted totals, their in-clone portions, and the post-clone
//! residue, each weighted by the matching hunk's similarity.

use crate::clones::CloneCounts;
use crate::loc::LocStats;
use crate::repo::ChangeKind;
use crate::similarity::{MeasurementType, SimilarityRecord};
use serde::{Deserialize, Serialize};

/// Signed file-level LOC; negative when the file was deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileLoc {
    pub gross: i64,
    pub no_comments: i64,
}

/// File-level LOC for a change: the new file for additions and edits, the
/// negated old file for deletions.
pub fn file_loc_for(kind: ChangeKind, old: LocStats, new: LocStats) -> FileLoc {
    if kind == ChangeKind::Deleted {
        FileLoc {
            gross: -(old.gross as i64),
            no_comments: -(old.no_comments as i64),
        }
    } else {
        FileLoc {
            gross: new.gross as i64,
            no_comments: new.no_comments as i64,
        }
    }
}

/// Everything one hunk contributes to aggregation
#[derive(Debug, Clone, Default)]
pub struct HunkCounts {
    pub added: usize,
    pub deleted: usize,
    pub added_no_comments: usize,
    pub deleted_no_comments: usize,
    pub cloned: CloneCounts,
    /// One record per enabled measurement for this hunk's old/new texts
    pub similarities: Vec<SimilarityRecord>,
}

impl HunkCounts {
    fn weights(&self, measurement: MeasurementType) -> (f64, f64) {
        match self
            .similarities
            .iter()
            .find(|record| record.measurement == measurement)
        {
            Some(record) => (record.weight(), record.weight_no_comments()),
            // The sentinel and synthetic hunks carry full weight
            None => (1.0, 1.0),
        }
    }
}

/// Aggregated change metrics for one (pair, file, measurement)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChangeMetrics {
    pub measurement: MeasurementType,
    pub loc_file_gross: i64,
    pub loc_file_no_comments: i64,
    pub num_added: f64,
    pub num_deleted: f64,
    pub num_added_no_comments: f64,
    pub num_deleted_no_comments: f64,
    pub num_added_post_clone: f64,
    pub num_deleted_post_clone: f64,
    pub num_added_post_clone_no_comments: f64,
    pub num_deleted_post_clone_no_comments: f64,
    pub num_added_cloned: f64,
    pub num_deleted_cloned: f64,
    pub num_added_cloned_no_comments: f64,
    pub num_deleted_cloned_no_comments: f64,
}

impl ChangeMetrics {
    fn zero(measurement: MeasurementType, loc: FileLoc) -> ChangeMetrics {
        ChangeMetrics {
            measurement,
            loc_file_gross: loc.gross,
            loc_file_no_comments: loc.no_comments,
            num_added: 0.0,
            num_deleted: 0.0,
            num_added_no_comments: 0.0,
            num_deleted_no_comments: 0.0,
            num_added_post_clone: 0.0,
            num_deleted_post_clone: 0.0,
            num_added_post_clone_no_comments: 0.0,
            num_deleted_post_clone_no_comments: 0.0,
            num_added_cloned: 0.0,
            num_deleted_cloned: 0.0,
            num_added_cloned_no_comments: 0.0,
            num_deleted_cloned_no_comments: 0.0,
        }
    }
}

/// Sum a file's hunks into one record per measurement.
///
/// Weighted sums use 1 − distance of the hunk's similarity record for the
/// measurement (raw distances for raw counts, no-comment distances for
/// no-comment counts).
pub fn aggregate(
    measurements: &[MeasurementType],
    loc: FileLoc,
    hunks: &[HunkCounts],
) -> Vec<ChangeMetrics> {
    measurements
        .iter()
        .map(|&measurement| {
            let mut metrics = ChangeMetrics::zero(measurement, loc);
            for hunk in hunks {
                let (weight, weight_nc) = hunk.weights(measurement);

                metrics.num_added += weight * hunk.added as f64;
                metrics.num_deleted += weight * hunk.deleted as f64;
                metrics.num_added_no_comments += weight_nc * hunk.added_no_comments as f64;
                metrics.num_deleted_no_comments += weight_nc * hunk.deleted_no_comments as f64;

                metrics.num_added_cloned += weight * hunk.cloned.added as f64;
                metrics.num_deleted_cloned += weight * hunk.cloned.deleted as f64;
                metrics.num_added_cloned_no_comments +=
                    weight_nc * hunk.cloned.added_no_comments as f64;
                metrics.num_deleted_cloned_no_comments +=
                    weight_nc * hunk.cloned.deleted_no_comments as f64;

                metrics.num_added_post_clone +=
                    weight * (hunk.added - hunk.cloned.added) as f64;
                metrics.num_deleted_post_clone +=
                    weight * (hunk.deleted - hunk.cloned.deleted) as f64;
                metrics.num_added_post_clone_no_comments += weight_nc
                    * (hunk.added_no_comments - hunk.cloned.added_no_comments) as f64;
                metrics.num_deleted_post_clone_no_comments += weight_nc
                    * (hunk.deleted_no_comments - hunk.cloned.deleted_no_comments) as f64;
            }
            metrics
        })
        .collect()
}
