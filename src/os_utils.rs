//! Filesystem and other os-level utilities
//!

use camino::Utf8Path;
use unwrap::unwrap;

/// Create a directory path and any missing parents
///
/// No operations are performed if the directory already exists
///
/// * `label` - describes the directory in the error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) {
    if dir.is_dir() {
        return;
    }
    unwrap!(
        std::fs::create_dir_all(dir),
        "Can't create new {label} directory at '{dir}'"
    );
}

/// Attempt to raise the open file soft limit to the hard limit on *nix-like systems
///
/// Failure to raise the limit is ignored.
///
pub fn attempt_max_open_file_limit() {
    use rlimit::Resource;

    if let Ok((soft, hard)) = Resource::NOFILE.get() {
        if soft < hard {
            rlimit::setrlimit(Resource::NOFILE, hard, hard).unwrap_or_default();
        }
    }
}
