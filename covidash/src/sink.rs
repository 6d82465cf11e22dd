//! Atomic persistence of output tables.
//!
//! Every table is first written to a temporary file next to its destination and then renamed
//! over it, so a reader never observes a half-written file.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error, info};
use polars::prelude::*;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::formatters::{OutputFormatter, OutputGenerator};

/// A table fully written to a temporary file, waiting to be moved into place.
#[derive(Debug)]
pub struct StagedOutput {
    file: NamedTempFile,
    target: PathBuf,
    rows: usize,
}

/// Where a table ended up and how many rows it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenOutput {
    pub path: PathBuf,
    pub rows: usize,
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `df` to a temporary file in the directory of `path`, creating the directory if needed.
pub fn stage(df: &mut DataFrame, path: &Path, formatter: &OutputFormatter) -> Result<StagedOutput> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).with_context(|| format!("Failed to create '{}'", dir.display()))?;
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in '{}'", dir.display()))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        formatter
            .save(&mut writer, df)
            .with_context(|| format!("Failed to write table for '{}'", path.display()))?;
        writer.flush()?;
    }
    file.as_file().sync_all()?;
    debug!("Staged {} rows for {} at {}", df.height(), path.display(), file.path().display());
    Ok(StagedOutput {
        file,
        target: path.to_path_buf(),
        rows: df.height(),
    })
}

impl StagedOutput {
    /// Rename the staged file over the target, replacing any previous version.
    pub fn commit(self) -> Result<WrittenOutput> {
        let target = self.target;
        self.file
            .persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move output into '{}'", target.display()))?;
        info!("Wrote {} rows to {}", self.rows, target.display());
        Ok(WrittenOutput {
            path: target,
            rows: self.rows,
        })
    }
}

/// Atomically replace the file at `path` with `df`.
pub fn write(df: &mut DataFrame, path: &Path, formatter: &OutputFormatter) -> Result<WrittenOutput> {
    stage(df, path, formatter)?.commit()
}

/// Write several tables. Nothing is moved into place until every table has been staged, so a
/// failure while writing leaves all previous outputs untouched. Dropped staged files are removed.
pub fn write_all(
    outputs: Vec<(PathBuf, DataFrame)>,
    formatter: &OutputFormatter,
) -> Result<Vec<WrittenOutput>> {
    let staged = outputs
        .into_iter()
        .map(|(path, mut df)| stage(&mut df, &path, formatter))
        .collect::<Result<Vec<_>>>()?;
    commit_all(staged)
}

/// Move staged outputs into place in order. A failed rename stops the loop; outputs committed
/// before it stay replaced and are named in the log and the error.
pub fn commit_all(staged: Vec<StagedOutput>) -> Result<Vec<WrittenOutput>> {
    let mut written: Vec<WrittenOutput> = Vec::with_capacity(staged.len());
    for output in staged {
        let target = output.target.clone();
        match output.commit() {
            Ok(done) => written.push(done),
            Err(err) => {
                let committed = written
                    .iter()
                    .map(|w| w.path.display().to_string())
                    .collect::<Vec<_>>();
                error!(
                    "Failed to commit '{}' after replacing {} output(s): {:?}",
                    target.display(),
                    committed.len(),
                    committed
                );
                return Err(err.context(format!(
                    "Outputs already replaced before the failure: {committed:?}"
                )));
            }
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;
    use crate::formatters::CSVFormatter;

    fn csv() -> OutputFormatter {
        CSVFormatter.into()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("covid.csv");
        let mut df = df!("a" => [1i64, 2]).unwrap();

        let written = write(&mut df, &path, &csv()).unwrap();
        assert_eq!(written.rows, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n1\n2\n");
    }

    #[test]
    fn write_overwrites_without_leaving_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("df_daily.csv");
        fs::write(&path, "stale").unwrap();

        let mut df = df!("date" => ["2021-01-01"], "active_cases" => [3.0f64]).unwrap();
        write(&mut df, &path, &csv()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "date,active_cases\n2021-01-01,3.0\n"
        );
        assert_eq!(entries(dir.path()), vec!["df_daily.csv"]);
    }

    #[test]
    fn failed_staging_leaves_previous_outputs_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("covid.csv");
        fs::write(&good, "previous").unwrap();
        // A file where a directory is expected makes the second output fail to stage
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "").unwrap();
        let bad = blocker.join("summary_df.csv");

        let outputs = vec![
            (good.clone(), df!("a" => [1i64]).unwrap()),
            (bad, df!("b" => [2i64]).unwrap()),
        ];
        assert!(write_all(outputs, &csv()).is_err());
        assert_eq!(fs::read_to_string(&good).unwrap(), "previous");
        assert_eq!(entries(dir.path()), vec!["blocked", "covid.csv"]);
    }

    #[test]
    fn failed_commit_names_outputs_already_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("covid.csv");
        let second_dir = dir.path().join("late");
        let second = second_dir.join("summary_df.csv");

        let staged = vec![
            stage(&mut df!("a" => [1i64]).unwrap(), &first, &csv()).unwrap(),
            stage(&mut df!("b" => [2i64]).unwrap(), &second, &csv()).unwrap(),
        ];
        // Removing the directory takes the staged file with it, so its rename fails
        fs::remove_dir_all(&second_dir).unwrap();

        let err = commit_all(staged).unwrap_err();
        assert!(format!("{err:#}").contains("covid.csv"), "{err:#}");
        assert_eq!(fs::read_to_string(&first).unwrap(), "a\n1\n");
        assert!(!second.exists());
    }

    #[test]
    fn write_all_commits_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = vec![
            (dir.path().join("a.csv"), df!("a" => [1i64]).unwrap()),
            (dir.path().join("b.csv"), df!("b" => [2i64, 3]).unwrap()),
        ];
        let written = write_all(outputs, &csv()).unwrap();
        assert_eq!(
            written.iter().map(|w| w.rows).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(entries(dir.path()), vec!["a.csv", "b.csv"]);
    }
}
