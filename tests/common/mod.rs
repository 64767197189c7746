//! Shared test scaffolding. Each test file below is compiled as its own binary, so this
//! registry-serializing lock only has to cover the `#[test]` functions within one file.

use std::sync::Mutex;

pub static TEST_LOCK: Mutex<()> = Mutex::new(());
