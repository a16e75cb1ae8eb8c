//! Verify command

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use binst_core::smoke::{SmokeTest, run_smoke_test};

use crate::ui::Output;

/// Run `path` with `args` (or `--version`) and require a clean exit with output.
pub fn verify(path: &Path, args: &[String], timeout_secs: u64, output: &Output) -> Result<()> {
    let mut test = SmokeTest {
        timeout: Duration::from_secs(timeout_secs),
        ..SmokeTest::default()
    };
    if !args.is_empty() {
        test.args = args.to_vec();
    }

    let outcome = run_smoke_test(path, &test)?;
    output.success(&format!("{} runs", path.display()));
    println!("{}", outcome.version_line);
    Ok(())
}
