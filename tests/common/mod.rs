/*!
 * Common test utilities for the subai test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use anyhow::Result;
use tempfile::TempDir;

use subai::subtitle_processor::SubtitleItem;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Four cues with gaps of 0s, 0.5s and 5s between consecutive pairs
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:02,000
Hello.

2
00:00:02,000 --> 00:00:03,000
How are you?

3
00:00:03,500 --> 00:00:04,500
Fine, thanks.

4
00:00:09,500 --> 00:00:11,000
Goodbye.
";

/// Creates the sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// Build items from `(start_ms, end_ms, text)` triples
pub fn items(cues: &[(u64, u64, &str)]) -> Vec<SubtitleItem> {
    cues.iter()
        .enumerate()
        .map(|(i, (start, end, text))| {
            let (start_at, end_at) = (Duration::from_millis(*start), Duration::from_millis(*end));
            SubtitleItem::new(i + 1, start_at, end_at, *text)
        })
        .collect()
}

/// Route library logs through env_logger while testing
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
