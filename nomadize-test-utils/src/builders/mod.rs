//! Test builders and fixtures

mod homes;

pub use homes::{TestAccountsRoot, TestHomeBuilder, snapshot};
