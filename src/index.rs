//src/index.rs

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::command::{CommandRunner, Invocation};
use crate::error::PipelineError;

/// A built kallisto index on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexArtifact {
    pub path: PathBuf,
    pub kmer_size: u32,
}

/// `kallisto index -i <index> -k <K> <cleaned.fa>`
pub fn index_invocation(kallisto: &OsStr, cleaned: &Path, index: &Path, kmer_size: u32) -> Invocation {
    Invocation::new(kallisto)
        .arg("index")
        .arg("-i")
        .arg(index)
        .arg("-k")
        .arg(kmer_size.to_string())
        .arg(cleaned)
}

/// Builds the index once; there is no retry. The subprocess exit status alone
/// is not trusted: the index file must exist afterwards.
pub fn build_index<R: CommandRunner + ?Sized>(
    runner: &R,
    kallisto: &OsStr,
    cleaned: &Path,
    index: &Path,
    kmer_size: u32,
    log_path: &Path,
) -> Result<IndexArtifact, PipelineError> {
    let invocation = index_invocation(kallisto, cleaned, index, kmer_size);
    log::info!("Building index (k={kmer_size}): {invocation}");

    let status = runner.run(&invocation, Some(log_path)).map_err(|e| {
        PipelineError::IndexBuild(format!("could not launch `{invocation}`: {e}"))
    })?;

    if !status.success() {
        return Err(PipelineError::IndexBuild(format!(
            "`{invocation}` exited with {:?}, see {}",
            status.code,
            log_path.display()
        )));
    }

    if !index.is_file() {
        return Err(PipelineError::IndexBuild(format!(
            "indexer reported success but {} was not created, see {}",
            index.display(),
            log_path.display()
        )));
    }

    log::info!("Index ready: {}", index.display());
    Ok(IndexArtifact {
        path: index.to_path_buf(),
        kmer_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{exit, value_of, ScriptedRunner};
    use std::fs;

    #[test]
    fn test_index_invocation_args() {
        let inv = index_invocation(OsStr::new("kallisto"), Path::new("w/cleaned.fa"), Path::new("w/idx_k31"), 31);
        assert_eq!(inv.to_string(), "kallisto index -i w/idx_k31 -k 31 w/cleaned.fa");
    }

    #[test]
    fn test_build_index_success() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("idx_k31");
        let log = dir.path().join("idx_k31.log");

        let runner = ScriptedRunner::new(|inv, _| {
            fs::write(value_of(inv, "-i").unwrap(), b"index")?;
            exit(0)
        });
        let artifact = build_index(&runner, OsStr::new("kallisto"), Path::new("c.fa"), &index, 31, &log).unwrap();

        assert_eq!(artifact.path, index);
        assert_eq!(artifact.kmer_size, 31);
        assert_eq!(runner.calls()[0].1.as_deref(), Some(log.as_path()));
    }

    #[test]
    fn test_build_index_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_, _| exit(1));
        let err = build_index(
            &runner,
            OsStr::new("kallisto"),
            Path::new("c.fa"),
            &dir.path().join("idx"),
            31,
            &dir.path().join("idx.log"),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::IndexBuild(_)));
        assert_eq!(runner.count("index"), 1);
    }

    #[test]
    fn test_build_index_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|_, _| exit(0));
        let err = build_index(
            &runner,
            OsStr::new("kallisto"),
            Path::new("c.fa"),
            &dir.path().join("idx"),
            31,
            &dir.path().join("idx.log"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("was not created"));
    }
}
