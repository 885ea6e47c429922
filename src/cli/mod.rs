mod defaults;
mod remove_overlap;
mod shared;
mod split;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

use self::remove_overlap::validate_and_fix_remove_overlap_settings;
pub use self::remove_overlap::{RemoveOverlapSettings, write_remove_overlap_settings};
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;
use self::split::validate_and_fix_split_settings;
pub use self::split::{SplitSettings, write_split_settings};

#[derive(Subcommand)]
pub enum Commands {
    /// Split each contig alignment at large insertions and deletions
    Split(SplitSettings),

    /// Clip overlapping contig bases out of the split alignments of each contig
    RemoveOverlap(RemoveOverlapSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Split(x) => &x.output_dir,
            Commands::RemoveOverlap(x) => &x.output_dir,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Split(x) => Commands::Split(validate_and_fix_split_settings(x)?),
        Commands::RemoveOverlap(x) => {
            Commands::RemoveOverlap(validate_and_fix_remove_overlap_settings(x)?)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_split_command() {
        let settings = Settings::try_parse_from([
            "tigmod",
            "split",
            "--bam",
            "contigs.bam",
            "--sensitivity",
            "30",
            "--threads",
            "2",
        ])
        .unwrap();
        assert_eq!(settings.get_output_dir(), "tigmod_split_output");
        match settings.command {
            Commands::Split(x) => {
                assert_eq!(x.bam_filename, "contigs.bam");
                assert_eq!(x.sensitivity, 30);
                assert_eq!(x.min_mapq, 0);
            }
            _ => panic!("Unexpected subcommand"),
        }
    }

    #[test]
    fn test_parse_remove_overlap_command() {
        let settings = Settings::try_parse_from([
            "tigmod",
            "remove-overlap",
            "--bam",
            "contigs.bam",
            "--output-dir",
            "out",
            "--min-mapq",
            "20",
        ])
        .unwrap();
        assert_eq!(settings.get_output_dir(), "out");
        match settings.command {
            Commands::RemoveOverlap(x) => {
                assert_eq!(x.min_mapq, 20);
                assert_eq!(x.split_sensitivity, None);
            }
            _ => panic!("Unexpected subcommand"),
        }
    }
}
