//! End-to-end tests that run the `matefix` binary on BAM files written to a temp directory.

mod helpers;
mod test_fixmate_command;
mod test_sanitize_command;
