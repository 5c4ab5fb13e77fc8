//src/layout.rs

use std::path::{Path, PathBuf};

pub const QUANT_LOG_SUFFIX: &str = "_quant.log";
pub const QC_REPORT_NAME: &str = "qc_report.txt";

/// Where every stage reads and writes, all under one working directory.
///
/// ```text
/// {workdir}/cleaned_<reference basename>
/// {workdir}/<index_name>_k<K>
/// {workdir}/<index_name>_k<K>.log
/// {workdir}/<quant_name>_k<K>/<sample>/
/// {workdir}/<quant_name>_k<K>/<sample>_quant.log
/// {workdir}/qc_report.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub workdir: PathBuf,
    pub cleaned_reference: PathBuf,
    pub index: PathBuf,
    pub index_log: PathBuf,
    pub quant_prefix: PathBuf,
    pub qc_report: PathBuf,
}

impl Layout {
    pub fn new(workdir: &Path, reference: &Path, index_name: &str, quant_name: &str, kmer_size: u32) -> Self {
        let index = workdir.join(format!("{index_name}_k{kmer_size}"));
        let index_log = workdir.join(format!("{index_name}_k{kmer_size}.log"));
        Self {
            workdir: workdir.to_path_buf(),
            cleaned_reference: workdir.join(cleaned_name(reference)),
            index,
            index_log,
            quant_prefix: workdir.join(format!("{quant_name}_k{kmer_size}")),
            qc_report: workdir.join(QC_REPORT_NAME),
        }
    }

    pub fn sample_dir(&self, sample_name: &str) -> PathBuf {
        self.quant_prefix.join(sample_name)
    }

    pub fn sample_log(&self, sample_name: &str) -> PathBuf {
        self.quant_prefix.join(format!("{sample_name}{QUANT_LOG_SUFFIX}"))
    }
}

/// `cleaned_<basename>`; a trailing ".gz" is dropped since the output is plain text.
fn cleaned_name(reference: &Path) -> String {
    let base = reference
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reference.fa".to_string());
    let base = base.strip_suffix(".gz").unwrap_or(&base);
    format!("cleaned_{base}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let l = Layout::new(
            Path::new("work"),
            Path::new("/data/ref/cds.fa"),
            "transcriptome_index",
            "quant_results",
            31,
        );
        assert_eq!(l.cleaned_reference, PathBuf::from("work/cleaned_cds.fa"));
        assert_eq!(l.index, PathBuf::from("work/transcriptome_index_k31"));
        assert_eq!(l.index_log, PathBuf::from("work/transcriptome_index_k31.log"));
        assert_eq!(l.quant_prefix, PathBuf::from("work/quant_results_k31"));
        assert_eq!(l.sample_dir("S1"), PathBuf::from("work/quant_results_k31/S1"));
        assert_eq!(l.sample_log("S1"), PathBuf::from("work/quant_results_k31/S1_quant.log"));
        assert_eq!(l.qc_report, PathBuf::from("work/qc_report.txt"));
    }

    #[test]
    fn test_gz_suffix_dropped_from_cleaned_name() {
        let l = Layout::new(Path::new("w"), Path::new("cds.fa.gz"), "idx", "q", 21);
        assert_eq!(l.cleaned_reference, PathBuf::from("w/cleaned_cds.fa"));
    }
}
