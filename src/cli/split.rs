use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::SimpleResult;

use super::defaults::{MIN_CONTIG_MAPQ, SPLIT_SENSITIVITY};
use super::utils::{check_required_filename, check_split_sensitivity, write_settings};

pub const SETTINGS_FILENAME: &str = "split.settings.json";

#[derive(Args, Default, Deserialize, Serialize)]
pub struct SplitSettings {
    /// Directory for all split command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_split_output"))]
    pub output_dir: Utf8PathBuf,

    /// Contig alignment file in BAM or CRAM format
    #[arg(long = "bam", value_name = "FILE")]
    pub bam_filename: String,

    /// Split each contig alignment at every insertion or deletion of at least this size
    #[arg(long, default_value_t = SPLIT_SENSITIVITY)]
    pub sensitivity: u32,

    /// Minimum MAPQ of the primary contig alignment record. Contigs with a lower primary MAPQ are
    /// skipped entirely.
    ///
    #[arg(long, default_value_t = MIN_CONTIG_MAPQ)]
    pub min_mapq: u8,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_split_settings(settings: SplitSettings) -> SimpleResult<SplitSettings> {
    check_required_filename(&settings.bam_filename, "alignment")?;
    check_split_sensitivity(settings.sensitivity, "sensitivity")?;
    Ok(settings)
}

pub fn write_split_settings(output_dir: &Utf8Path, settings: &SplitSettings) {
    write_settings(output_dir, SETTINGS_FILENAME, settings);
}
