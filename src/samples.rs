//src/samples.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::SampleUnit;

pub const R1_SUFFIX: &str = "_R1.fastq.gz";
pub const R2_SUFFIX: &str = "_R2.fastq.gz";

/// Finds every `<sample>_R1.fastq.gz` in `dir` and derives its R2 partner.
///
/// Units come back sorted by sample name. The R2 file is not checked here;
/// see [`SampleUnit::missing_file`].
pub fn discover_samples<P: AsRef<Path>>(dir: P) -> io::Result<Vec<SampleUnit>> {
    let dir = dir.as_ref();
    let mut units: Vec<SampleUnit> = fs::read_dir(dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let filename = path.file_name()?.to_str()?.to_string();
            let sample_name = filename.strip_suffix(R1_SUFFIX)?;
            if sample_name.is_empty() {
                return None;
            }
            Some(SampleUnit {
                sample_name: sample_name.to_string(),
                read_file1: path.clone(),
                read_file2: dir.join(format!("{sample_name}{R2_SUFFIX}")),
            })
        })
        .collect();

    units.sort_by(|a, b| a.sample_name.cmp(&b.sample_name));
    log::info!("Discovered {} paired-end sample(s) in {}", units.len(), dir.display());
    Ok(units)
}

impl SampleUnit {
    /// First read file that does not exist, if any.
    pub fn missing_file(&self) -> Option<&PathBuf> {
        [&self.read_file1, &self.read_file2]
            .into_iter()
            .find(|p| !p.is_file())
    }
}
