use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use tabfile::Tabfile;

use crate::error::{BarcodeNotFoundError, FileError, ParseError};
use crate::{parse_observations, AnalyzerConfig, BarcodeStats, Observation, PROGRESS_INTERVAL};

/// All indel observations of one barcode
///
/// Built once while reading the report and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeRecord {
    pub barcode: String,
    pub observations: Vec<Observation>,
}

/// An in-memory indel report, one record per barcode
///
/// Records keep the order of the input rows. Barcodes are unique keys;
/// looking up an unknown barcode is an error, not a sentinel value.
#[derive(Debug, Default)]
pub struct IndelReport {
    records: Vec<BarcodeRecord>,
    index: HashMap<String, usize>,
}

impl IndelReport {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a barcode's observations to the report
    ///
    /// A barcode that is already present is replaced by the new row.
    pub fn insert(&mut self, barcode: String, observations: Vec<Observation>) {
        if let Some(&i) = self.index.get(&barcode) {
            warn!(
                "Barcode {} appears more than once in the report. Keeping the last occurrence.",
                barcode
            );
            self.records[i] = BarcodeRecord {
                barcode,
                observations,
            };
        } else {
            self.index.insert(barcode.clone(), self.records.len());
            self.records.push(BarcodeRecord {
                barcode,
                observations,
            });
        }
    }

    pub fn get(&self, barcode: &str) -> Result<&BarcodeRecord, BarcodeNotFoundError> {
        match self.index.get(barcode) {
            Some(&i) => Ok(&self.records[i]),
            None => Err(BarcodeNotFoundError::new(barcode.to_string())),
        }
    }

    pub fn records(&self) -> &[BarcodeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a tab-separated indel report into memory
///
/// The first row must be a header naming at least the barcode column and the
/// info column configured in `config`. Rows whose info string fails to parse
/// abort the whole read, unless `config.skip_invalid` is set, in which case
/// they are logged and dropped.
pub fn read_indel_report_from_file<P: AsRef<Path>>(
    path: P,
    config: &AnalyzerConfig,
) -> Result<IndelReport, FileError> {
    let tabfile = match Tabfile::open(&path) {
        Ok(tf) => tf.comment_character('#'),
        Err(e) => return Err(FileError::io(Some(&path), e)),
    };

    let mut report = IndelReport::new();
    let mut columns: Option<(usize, usize)> = None;
    for record_result in tabfile {
        let record = match record_result {
            Ok(record) => record,
            Err(e) => return Err(FileError::io(Some(&path), e)),
        };
        let tokens = record.fields();

        match columns {
            None => {
                // the first record is the header row
                let barcode_idx = tokens.iter().position(|t| *t == config.barcode_column);
                let info_idx = tokens.iter().position(|t| *t == config.info_column);
                if let (Some(barcode_idx), Some(info_idx)) = (barcode_idx, info_idx) {
                    columns = Some((barcode_idx, info_idx));
                } else {
                    let err = ParseError::file(
                        path.as_ref().to_path_buf(),
                        record.line_number(),
                        "a header naming the barcode and info columns",
                        record.line().to_string(),
                    );
                    return Err(FileError::parse(Some(&path), err));
                }
            }
            Some((barcode_idx, info_idx)) => {
                if tokens.len() <= barcode_idx.max(info_idx) {
                    let err = ParseError::file(
                        path.as_ref().to_path_buf(),
                        record.line_number(),
                        "a row with barcode and info columns",
                        record.line().to_string(),
                    );
                    if config.skip_invalid {
                        warn!("Skipping row: {}", err);
                        continue;
                    }
                    return Err(FileError::parse(Some(&path), err));
                }
                let barcode = tokens[barcode_idx];
                match parse_observations(tokens[info_idx]) {
                    Ok(observations) => report.insert(barcode.to_string(), observations),
                    Err(e) => {
                        let e = e.in_file(path.as_ref().to_path_buf(), record.line_number());
                        if config.skip_invalid {
                            warn!("Skipping barcode {}: {}", barcode, e);
                            continue;
                        }
                        return Err(FileError::parse(Some(&path), e));
                    }
                }
                if report.len() % PROGRESS_INTERVAL == 0 {
                    info!("Loading indel information... {} barcodes so far", report.len());
                }
            }
        }
    }

    if columns.is_none() {
        let err = ParseError::somewhere(
            "a header naming the barcode and info columns",
            "an empty file".to_string(),
        );
        return Err(FileError::parse(Some(&path), err));
    }

    Ok(report)
}

/// Write the computed statistics as a comma-separated table
///
/// One row per barcode, written in one go after all barcodes are processed.
pub fn write_barcode_stats_to_file<P: AsRef<Path>>(
    path: P,
    stats: &[BarcodeStats],
) -> Result<(), FileError> {
    let mut writer = match csv::Writer::from_path(&path) {
        Ok(writer) => writer,
        Err(e) => return Err(csv_error(&path, e)),
    };
    if stats.is_empty() {
        // serde only emits the header alongside the first record
        let header = [
            "Barcode",
            "Ins Ratio",
            "Del Ratio",
            "Weighted Ins Len",
            "Weighted Del Len",
        ];
        if let Err(e) = writer.write_record(&header) {
            return Err(csv_error(&path, e));
        }
    }
    for row in stats {
        if let Err(e) = writer.serialize(row) {
            return Err(csv_error(&path, e));
        }
    }
    if let Err(e) = writer.flush() {
        return Err(FileError::io(Some(&path), e));
    }
    Ok(())
}

fn csv_error<P: AsRef<Path>>(path: P, error: csv::Error) -> FileError {
    match error.into_kind() {
        csv::ErrorKind::Io(e) => FileError::io(Some(&path), e),
        other => FileError::parse(
            Some(&path),
            ParseError::somewhere("a serializable record", format!("{:?}", other)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{barcode_stats, IndelKind};
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("indelstat-{}-{}", std::process::id(), name));
        path
    }

    fn write_lines(path: &Path, lines: &[&str]) {
        let mut file = fs::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    #[test]
    fn test_read_report() {
        let path = temp_path("read.tsv");
        write_lines(
            &path,
            &[
                "Barcode\tInfo",
                "AACGT\t22M1D:1482:5.6, 20M5D:1302:4.9",
                "GGTCA\t21M1I:1880:100.0, ",
            ],
        );

        let report = read_indel_report_from_file(&path, &AnalyzerConfig::default()).unwrap();
        assert_eq!(report.len(), 2);

        let first = report.get("AACGT").unwrap();
        assert_eq!(first.observations.len(), 2);
        assert_eq!(first.observations[0].token.kind, IndelKind::Deletion);

        // the trailing separator does not produce a third observation
        let second = report.get("GGTCA").unwrap();
        assert_eq!(second.observations.len(), 1);
        assert_eq!(second.observations[0].token.kind, IndelKind::Insertion);

        assert!(report.get("TTTTT").is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_report_resolves_columns_by_name() {
        let path = temp_path("columns.tsv");
        write_lines(
            &path,
            &["Extra\tInfo\tBarcode", "x\t22M1D:10:100.0\tAACGT"],
        );

        let report = read_indel_report_from_file(&path, &AnalyzerConfig::default()).unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.get("AACGT").is_ok());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_report_rejects_missing_columns() {
        let path = temp_path("missing-columns.tsv");
        write_lines(&path, &["Barcode\tSomethingElse", "AACGT\tfoo"]);

        assert!(read_indel_report_from_file(&path, &AnalyzerConfig::default()).is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_report_aborts_on_malformed_row_by_default() {
        let path = temp_path("malformed.tsv");
        write_lines(
            &path,
            &[
                "Barcode\tInfo",
                "AACGT\t22M1D:10:100.0",
                "GGTCA\t5M3X:1:10.0",
            ],
        );

        assert!(read_indel_report_from_file(&path, &AnalyzerConfig::default()).is_err());

        let mut config = AnalyzerConfig::default();
        config.skip_invalid = true;
        let report = read_indel_report_from_file(&path, &config).unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.get("GGTCA").is_err());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_duplicate_barcode_keeps_last_row() {
        let path = temp_path("duplicate.tsv");
        write_lines(
            &path,
            &[
                "Barcode\tInfo",
                "AACGT\t22M1D:10:100.0",
                "AACGT\t21M1I:20:100.0",
            ],
        );

        let report = read_indel_report_from_file(&path, &AnalyzerConfig::default()).unwrap();
        assert_eq!(report.len(), 1);
        let record = report.get("AACGT").unwrap();
        assert_eq!(record.observations.len(), 1);
        assert_eq!(record.observations[0].token.kind, IndelKind::Insertion);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_stats() {
        let path = temp_path("stats.csv");
        let observations = crate::parse_observations("22M1D:1482:5.6, 20M5D:1302:94.4").unwrap();
        let stats = vec![barcode_stats("AACGT", &observations, 10.0).unwrap()];

        write_barcode_stats_to_file(&path, &stats).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Barcode,Ins Ratio,Del Ratio,Weighted Ins Len,Weighted Del Len"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("AACGT,"));
        assert!(lines.next().is_none());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_stats_empty_table_still_has_a_header() {
        let path = temp_path("empty-stats.csv");
        write_barcode_stats_to_file(&path, &[]).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written.trim_end(),
            "Barcode,Ins Ratio,Del Ratio,Weighted Ins Len,Weighted Del Len"
        );
        fs::remove_file(&path).unwrap();
    }
}
