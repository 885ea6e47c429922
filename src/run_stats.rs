//! Track stats for a whole contig alignment processing run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

/// Counts of bam records seen while gathering contig alignments
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct InputStats {
    pub total_record_count: usize,

    /// Unmapped, secondary and supplementary records
    pub skipped_record_count: usize,

    /// Primary records below the minimum MAPQ
    pub low_mapq_record_count: usize,

    /// Primary records which could not be converted into alignments
    pub invalid_record_count: usize,
}

/// Counts of contig alignments before and after modification
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ModificationStats {
    pub contig_count: usize,

    /// Contigs skipped due to an error in alignment modification
    pub failed_contig_count: usize,

    pub input_alignment_count: usize,
    pub output_alignment_count: usize,
    pub split_alignment_count: usize,
    pub clipped_alignment_count: usize,
}

impl ModificationStats {
    pub fn merge(&mut self, other: &Self) {
        self.contig_count += other.contig_count;
        self.failed_contig_count += other.failed_contig_count;
        self.input_alignment_count += other.input_alignment_count;
        self.output_alignment_count += other.output_alignment_count;
        self.split_alignment_count += other.split_alignment_count;
        self.clipped_alignment_count += other.clipped_alignment_count;
    }
}

#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RunStats {
    pub input_stats: InputStats,
    pub modification_stats: ModificationStats,
    pub total_runtime_secs: f64,
}

/// Write run_stats structure out in json format
pub fn write_run_stats(output_dir: &Utf8Path, run_stats: &RunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
