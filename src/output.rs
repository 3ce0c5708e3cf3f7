use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

/// Name of the step output the resolved commit is published under.
pub const OUTPUT_NAME: &str = "sha";

/// Prints the resolved commit (possibly empty) on stdout and, when running
/// as a workflow step, appends it to the step's output file.
pub fn emit(value: &str, output_file: Option<&Path>) -> Result<()> {
    println!("{value}");

    if let Some(path) = output_file {
        append_output(path, value)?;
        info!("Output '{OUTPUT_NAME}' written to: {}", path.display());
    }

    Ok(())
}

fn append_output(path: &Path, value: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;

    writeln!(file, "{OUTPUT_NAME}={value}")
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_to_existing_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");
        std::fs::write(&path, "other=1\n").unwrap();

        emit("0123abcd", Some(&path)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "other=1\nsha=0123abcd\n");
    }

    #[test]
    fn test_writes_empty_value_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");

        emit("", Some(&path)).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "sha=\n");
    }

    #[test]
    fn test_unwritable_output_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("github_output");

        let err = emit("abc", Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to open output file"));
    }
}
