use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

/// Check a required input alignment filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {label} file");
    }
    let path = Utf8Path::new(filename);
    if !path.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !path.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Check that an indel size threshold can split an alignment
///
pub fn check_split_sensitivity(sensitivity: u32, arg_name: &str) -> SimpleResult<()> {
    if sensitivity == 0 {
        bail!("--{arg_name} argument must be greater than 0");
    }
    Ok(())
}

/// Write any command's settings out in json format
///
/// Assumes the logger is setup
///
pub fn write_settings<T: Serialize>(output_dir: &Utf8Path, filename: &str, settings: &T) {
    let filename = output_dir.join(filename);

    info!("Writing settings to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, settings).unwrap();
}
