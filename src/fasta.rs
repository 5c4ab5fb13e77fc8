use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::types::{CleanStats, SequenceRecord};

/// Records with fewer bases than this are dropped from the cleaned reference.
pub const MIN_SEQUENCE_LEN: usize = 20;

/// Opens a plain or gzip-compressed (".gz") text file for line reading.
pub fn open_text_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Rewrites every byte outside {A,T,G,C,N} to `N`, appending to `out`.
/// Returns how many bytes were rewritten. Case-sensitive; a multi-byte
/// character becomes one `N` per byte.
fn push_sanitized(line: &[u8], out: &mut Vec<u8>) -> usize {
    let mut replaced = 0;
    for &b in line {
        match b {
            b'A' | b'T' | b'G' | b'C' | b'N' => out.push(b),
            _ => {
                out.push(b'N');
                replaced += 1;
            }
        }
    }
    replaced
}

/// The record currently being assembled.
struct PendingRecord {
    header: Vec<u8>,
    sequence: Vec<u8>,
}

/// Single-pass FASTA filter/normalizer.
///
/// Input is handled as raw bytes, so any encoding is accepted: headers are
/// copied byte for byte and every sequence byte outside `ATGCN` becomes `N`.
/// Only one record is buffered at a time; a record is finalized when the next
/// header shows up or the input ends.
///
/// Line terminators are `\n` or `\r\n`. The `\r` of a CRLF ending is removed
/// with the terminator and is not turned into `N`; a `\r` anywhere else in a
/// sequence line (including a final line without `\n`) is an ordinary
/// non-ATGCN byte.
#[derive(Debug, Clone, Copy)]
pub struct SequenceCleaner {
    min_len: usize,
}

impl Default for SequenceCleaner {
    fn default() -> Self {
        Self { min_len: MIN_SEQUENCE_LEN }
    }
}

impl SequenceCleaner {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Streams cleaned records to `emit` in input order.
    pub fn clean_records<R, F>(&self, mut reader: R, mut emit: F) -> io::Result<CleanStats>
    where
        R: BufRead,
        F: FnMut(SequenceRecord) -> io::Result<()>,
    {
        let mut stats = CleanStats::default();
        let mut pending: Option<PendingRecord> = None;
        let mut buf: Vec<u8> = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break; // EOF
            }
            let line = match buf.strip_suffix(b"\n") {
                Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
                None => &buf[..],
            };

            if line.starts_with(b">") {
                if let Some(done) = pending.take() {
                    self.finalize(done, &mut stats, &mut emit)?;
                }
                stats.records_seen += 1;
                pending = Some(PendingRecord {
                    header: line.to_vec(),
                    sequence: Vec::new(),
                });
            } else if let Some(record) = pending.as_mut() {
                stats.chars_replaced += push_sanitized(line, &mut record.sequence);
            } else if !line.is_empty() {
                stats.orphan_lines += 1;
            }
        }

        if let Some(done) = pending.take() {
            self.finalize(done, &mut stats, &mut emit)?;
        }

        if stats.orphan_lines > 0 {
            log::warn!(
                "Ignored {} sequence line(s) found before the first '>' header",
                stats.orphan_lines
            );
        }
        Ok(stats)
    }

    fn finalize<F>(&self, record: PendingRecord, stats: &mut CleanStats, emit: &mut F) -> io::Result<()>
    where
        F: FnMut(SequenceRecord) -> io::Result<()>,
    {
        if record.sequence.len() >= self.min_len {
            stats.records_kept += 1;
            emit(SequenceRecord {
                header: record.header,
                sequence: record.sequence,
            })
        } else {
            log::debug!(
                "Discarding {} ({} nt < {})",
                String::from_utf8_lossy(&record.header),
                record.sequence.len(),
                self.min_len
            );
            stats.records_discarded += 1;
            Ok(())
        }
    }

    /// Cleans `reader` into FASTA text on `writer`, one sequence line per record.
    pub fn clean_to_writer<R: BufRead, W: Write>(&self, reader: R, writer: W) -> io::Result<CleanStats> {
        let mut out = BufWriter::new(writer);
        let stats = self.clean_records(reader, |rec| {
            out.write_all(&rec.header)?;
            out.write_all(b"\n")?;
            out.write_all(&rec.sequence)?;
            out.write_all(b"\n")
        })?;
        out.flush()?;
        Ok(stats)
    }

    /// Cleans the reference at `input` (plain or .gz) into a plain FASTA at `output`.
    pub fn clean_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> io::Result<CleanStats> {
        let reader = open_text_reader(&input)?;
        let out = File::create(&output)?;
        let stats = self.clean_to_writer(reader, out)?;

        log::info!(
            "Cleaned {}: {} record(s) kept, {} discarded (< {} nt), {} character(s) replaced with N",
            input.as_ref().display(),
            stats.records_kept,
            stats.records_discarded,
            self.min_len,
            stats.chars_replaced
        );
        if stats.records_kept == 0 {
            log::warn!(
                "Cleaned reference {} is empty; index construction will fail",
                output.as_ref().display()
            );
        }
        Ok(stats)
    }
}

/// Cleans the reference at `input` into `output` with the default length cutoff.
pub fn clean<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> io::Result<CleanStats> {
    SequenceCleaner::default().clean_file(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;

    fn clean_str(input: &str) -> (String, CleanStats) {
        let mut out = Vec::new();
        let stats = SequenceCleaner::default()
            .clean_to_writer(input.as_bytes(), &mut out)
            .expect("cleaning failed");
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_replaces_non_acgtn_and_keeps_header() {
        let input = ">tx1 some description\nATGCATGCATRYATGCATGC\nAAAA\n";
        let (out, stats) = clean_str(input);
        assert_eq!(out, ">tx1 some description\nATGCATGCATNNATGCATGCAAAA\n");
        assert_eq!(stats.records_kept, 1);
        assert_eq!(stats.chars_replaced, 2);
    }

    #[test]
    fn test_lowercase_is_replaced() {
        let (out, _) = clean_str(">a\natgcATGCATGCATGCATGCATGC\n");
        assert_eq!(out, ">a\nNNNNATGCATGCATGCATGCATGC\n");
    }

    #[test]
    fn test_short_split_record_is_discarded() {
        // "ATGC" + "xxAT" + "GC" => "ATGCNNATGC", 10 nt
        let input = ">short\nATGC\nxxAT\nGC\n>long\nAAAAAAAAAAAAAAAAAAAA\n";
        let (out, stats) = clean_str(input);
        assert_eq!(out, ">long\nAAAAAAAAAAAAAAAAAAAA\n");
        assert_eq!(stats.records_seen, 2);
        assert_eq!(stats.records_discarded, 1);
    }

    #[test]
    fn test_lines_concatenate_without_separator() {
        let mut records = Vec::new();
        SequenceCleaner::new(1)
            .clean_records(">r\nATGC\nxxAT\nGC\n".as_bytes(), |r| {
                records.push(r);
                Ok(())
            })
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence, b"ATGCNNATGC".to_vec());
    }

    #[test]
    fn test_last_record_is_finalized_at_eof() {
        let input = ">a\nAAAAAAAAAAAAAAAAAAAA\n>b\nCCCCCCCCCCCCCCCCCCCCC";
        let (out, stats) = clean_str(input);
        assert_eq!(out, ">a\nAAAAAAAAAAAAAAAAAAAA\n>b\nCCCCCCCCCCCCCCCCCCCCC\n");
        assert_eq!(stats.records_kept, 2);
    }

    #[test]
    fn test_exactly_min_len_is_kept() {
        let (out, _) = clean_str(">edge\nGGGGGGGGGGGGGGGGGGGG\n>under\nGGGGGGGGGGGGGGGGGGG\n");
        assert_eq!(out, ">edge\nGGGGGGGGGGGGGGGGGGGG\n");
    }

    #[test]
    fn test_duplicate_headers_are_kept_in_order() {
        let input = ">dup\nAAAAAAAAAAAAAAAAAAAA\n>dup\nTTTTTTTTTTTTTTTTTTTT\n";
        let (out, stats) = clean_str(input);
        assert_eq!(out, input);
        assert_eq!(stats.records_kept, 2);
    }

    #[test]
    fn test_crlf_line_endings() {
        let (out, stats) = clean_str(">a\r\nAAAAAAAAAA\r\nAAAAAAAAAA\r\n");
        assert_eq!(out, ">a\nAAAAAAAAAAAAAAAAAAAA\n");
        assert_eq!(stats.chars_replaced, 0);
    }

    #[test]
    fn test_non_utf8_bytes_are_cleaned_not_rejected() {
        let input: &[u8] = b">tx1 caf\xe9\nATGCATGCATGCATGCATGC\xff\n";
        let mut out = Vec::new();
        let stats = SequenceCleaner::default().clean_to_writer(input, &mut out).unwrap();

        assert_eq!(stats.records_kept, 1);
        assert_eq!(stats.chars_replaced, 1);
        assert_eq!(out, b">tx1 caf\xe9\nATGCATGCATGCATGCATGCN\n".to_vec());
    }

    #[test]
    fn test_multibyte_character_becomes_one_n_per_byte() {
        let (out, stats) = clean_str(">u\nATGCATGCATGCATGCATGé\n");
        assert_eq!(out, ">u\nATGCATGCATGCATGCATGNN\n");
        assert_eq!(stats.chars_replaced, 2);
    }

    #[test]
    fn test_bare_cr_inside_line_becomes_n() {
        let (out, _) = clean_str(">a\nAAAAAAAAAA\rAAAAAAAAAA\n");
        assert_eq!(out, ">a\nAAAAAAAAAANAAAAAAAAAA\n");
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let (out, stats) = clean_str("");
        assert!(out.is_empty());
        assert_eq!(stats, CleanStats::default());
    }

    #[test]
    fn test_lines_before_first_header_are_ignored() {
        let (out, stats) = clean_str("ACGT\n>a\nAAAAAAAAAAAAAAAAAAAA\n");
        assert_eq!(out, ">a\nAAAAAAAAAAAAAAAAAAAA\n");
        assert_eq!(stats.orphan_lines, 1);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let input = ">x desc\nacgtRYKMacgtACGTACGTAC\nNNNN\n>y\nAC\n>z\n--ATGC--ATGC--ATGC--\n";
        let (once, _) = clean_str(input);
        let (twice, stats) = clean_str(&once);
        assert_eq!(once, twice);
        assert_eq!(stats.chars_replaced, 0);
        assert_eq!(stats.records_discarded, 0);
    }

    #[test]
    fn test_clean_file_reads_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ref.fa.gz");
        let output = dir.path().join("cleaned_ref.fa");

        let mut enc = GzEncoder::new(File::create(&input).unwrap(), Compression::default());
        enc.write_all(b">g1\nATGCATGCATGCATGCATGC*\n>g2\nAT\n").unwrap();
        enc.finish().unwrap();

        let stats = clean(&input, &output).unwrap();
        assert_eq!(stats.records_kept, 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            ">g1\nATGCATGCATGCATGCATGCN\n"
        );
    }
}
