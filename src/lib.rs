mod analyze;
pub mod error;
mod indel;
mod report;

use log::warn;
use serde::Serialize;

pub use crate::analyze::IndelAnalyzer;
use crate::error::EmptyBarcodeError;
pub use crate::error::{IndelstatError, ParseError};
pub use crate::indel::{IndelKind, IndelToken};
pub use crate::report::{
    read_indel_report_from_file, write_barcode_stats_to_file, BarcodeRecord, IndelReport,
};

/// How many barcodes to process between progress log lines
pub(crate) const PROGRESS_INTERVAL: usize = 1000;

/// Turn one barcode's raw info string into structured indel observations
///
/// The info string is a comma-separated list of items of the form
/// `<compact>:<count>:<ratio>`, for example
/// `22M1D:1482:5.6, 20M5D:1302:4.9`. Whitespace around items is tolerated
/// and an empty trailing item (from a terminal comma) is skipped.
///
/// The observations are returned in input order. A single malformed item
/// aborts the parse of the whole string.
pub fn parse_observations(info: &str) -> Result<Vec<Observation>, ParseError> {
    let mut result = Vec::new();
    for (index, item) in info.split(',').enumerate() {
        let item = item.trim();
        if item.is_empty() {
            // a terminal separator leaves an empty last item
            continue;
        }
        let fields: Vec<&str> = item.split(':').collect();
        if fields.len() != 3 {
            return Err(ParseError::item(
                "indel observation",
                index,
                "<compact>:<count>:<ratio>",
                item.to_string(),
            ));
        }
        let token = IndelToken::parse(fields[0])?;
        let count = match fields[1].parse::<f64>() {
            Ok(count) => count,
            Err(_) => {
                return Err(ParseError::item(
                    "indel observation",
                    index,
                    "numeric read count",
                    fields[1].to_string(),
                ))
            }
        };
        let ratio = match fields[2].parse::<f64>() {
            Ok(ratio) => ratio,
            Err(_) => {
                return Err(ParseError::item(
                    "indel observation",
                    index,
                    "numeric read ratio",
                    fields[2].to_string(),
                ))
            }
        };
        result.push(Observation::new(token, count, ratio));
    }
    Ok(result)
}

/// Reduce one barcode's observations to its summary statistics
///
/// The insertion and deletion ratios are ratios of observation record counts,
/// not of read counts. The weighted lengths assume that the `ratio` values of
/// each kind are percentages that sum to roughly 100 for the barcode; if they
/// deviate from 100 by more than `ratio_sum_tolerance` a warning is logged
/// and the weighted length is reported as-is.
///
/// A barcode without any observations has no defined insertion/deletion
/// ratio and is an error.
pub fn barcode_stats(
    barcode: &str,
    observations: &[Observation],
    ratio_sum_tolerance: f64,
) -> Result<BarcodeStats, EmptyBarcodeError> {
    let (insertions, deletions): (Vec<&Observation>, Vec<&Observation>) = observations
        .iter()
        .partition(|o| o.token.kind == IndelKind::Insertion);

    let total = insertions.len() + deletions.len();
    if total == 0 {
        return Err(EmptyBarcodeError::new(barcode.to_string()));
    }
    let insertion_ratio = insertions.len() as f64 / total as f64;
    let deletion_ratio = 1.0 - insertion_ratio;

    let weighted_insertion_length =
        weighted_length(barcode, IndelKind::Insertion, &insertions, ratio_sum_tolerance);
    let weighted_deletion_length =
        weighted_length(barcode, IndelKind::Deletion, &deletions, ratio_sum_tolerance);

    Ok(BarcodeStats {
        barcode: barcode.to_string(),
        insertion_ratio,
        deletion_ratio,
        weighted_insertion_length,
        weighted_deletion_length,
    })
}

/// Read-proportion-weighted mean indel length for one kind
///
/// The ratios are percentages, so the weighted sum is divided by 100 to turn
/// them into fractions. A kind without observations has weighted length 0.
fn weighted_length(
    barcode: &str,
    kind: IndelKind,
    observations: &[&Observation],
    ratio_sum_tolerance: f64,
) -> f64 {
    let mut weighted = 0.0;
    let mut ratio_sum = 0.0;
    for occ in observations {
        weighted += occ.token.length as f64 * occ.ratio;
        ratio_sum += occ.ratio;
    }
    if !observations.is_empty() && (ratio_sum - 100.0).abs() > ratio_sum_tolerance {
        warn!(
            "The {} ratios of barcode {} sum to {:.1}% instead of 100%. Manual review recommended.",
            kind.as_str(),
            barcode,
            ratio_sum
        );
    }
    weighted / 100.0
}

/// One observed indel pattern within a barcode
///
/// `count` is the number of reads exhibiting exactly this indel and `ratio`
/// is the percentage of the barcode's reads exhibiting it. Both come straight
/// from the input report and are never derived here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub token: IndelToken,
    pub count: f64,
    pub ratio: f64,
}

impl Observation {
    pub fn new(token: IndelToken, count: f64, ratio: f64) -> Self {
        Self {
            token,
            count,
            ratio,
        }
    }
}

/// Summary statistics for a single barcode
///
/// The serde field names match the columns of the output table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarcodeStats {
    #[serde(rename = "Barcode")]
    pub barcode: String,
    #[serde(rename = "Ins Ratio")]
    pub insertion_ratio: f64,
    #[serde(rename = "Del Ratio")]
    pub deletion_ratio: f64,
    #[serde(rename = "Weighted Ins Len")]
    pub weighted_insertion_length: f64,
    #[serde(rename = "Weighted Del Len")]
    pub weighted_deletion_length: f64,
}

/// Settings shared by the report reader and the analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Name of the barcode column in the input report
    pub barcode_column: String,
    /// Name of the info-string column in the input report
    pub info_column: String,
    /// Allowed deviation of a kind's ratio sum from 100% before a warning is logged
    pub ratio_sum_tolerance: f64,
    /// Skip barcodes that fail to parse or have no observations instead of
    /// aborting the whole run
    pub skip_invalid: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            barcode_column: "Barcode".to_string(),
            info_column: "Info".to_string(),
            ratio_sum_tolerance: 10.0,
            skip_invalid: false,
        }
    }
}
