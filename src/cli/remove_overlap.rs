use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::SimpleResult;

use super::defaults::MIN_CONTIG_MAPQ;
use super::utils::{check_required_filename, check_split_sensitivity, write_settings};

pub const SETTINGS_FILENAME: &str = "remove-overlap.settings.json";

#[derive(Args, Default, Deserialize, Serialize)]
pub struct RemoveOverlapSettings {
    /// Directory for all remove-overlap command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_remove-overlap_output"))]
    pub output_dir: Utf8PathBuf,

    /// Contig alignment file in BAM or CRAM format
    #[arg(long = "bam", value_name = "FILE")]
    pub bam_filename: String,

    /// Minimum MAPQ of the primary contig alignment record. Contigs with a lower primary MAPQ are
    /// skipped entirely.
    ///
    #[arg(long, default_value_t = MIN_CONTIG_MAPQ)]
    pub min_mapq: u8,

    /// Split gapped alignments at every insertion or deletion of at least this size before
    /// overlap removal
    ///
    /// By default gapped alignments are not split.
    ///
    #[arg(long, value_name = "SIZE")]
    pub split_sensitivity: Option<u32>,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_remove_overlap_settings(
    settings: RemoveOverlapSettings,
) -> SimpleResult<RemoveOverlapSettings> {
    check_required_filename(&settings.bam_filename, "alignment")?;
    if let Some(sensitivity) = settings.split_sensitivity {
        check_split_sensitivity(sensitivity, "split-sensitivity")?;
    }
    Ok(settings)
}

pub fn write_remove_overlap_settings(output_dir: &Utf8Path, settings: &RemoveOverlapSettings) {
    write_settings(output_dir, SETTINGS_FILENAME, settings);
}
