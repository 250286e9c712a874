//! Test support utilities for the patch runner crates.

pub mod test_logging;
