use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{info, warn};
use rayon::prelude::*;

use crate::error::IndelstatError;
use crate::report::IndelReport;
use crate::{barcode_stats, AnalyzerConfig, BarcodeStats, PROGRESS_INTERVAL};

/// Computes summary statistics for every barcode of a report
///
/// Barcodes are independent of each other, so the aggregation fans out over
/// a rayon worker pool. Each worker owns one barcode's data exclusively and
/// the results come back in report order.
pub struct IndelAnalyzer {
    config: AnalyzerConfig,
}

impl IndelAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, report: &IndelReport) -> Result<Vec<BarcodeStats>, IndelstatError> {
        self.analyze_with_cancel(report, &AtomicBool::new(false))
    }

    /// Like [`IndelAnalyzer::analyze`], but stops early once `cancel` is set
    ///
    /// Cancellation is best-effort: it is only checked between barcodes, so
    /// barcodes already being processed will finish. A cancelled run fails
    /// instead of returning a partial result table.
    pub fn analyze_with_cancel(
        &self,
        report: &IndelReport,
        cancel: &AtomicBool,
    ) -> Result<Vec<BarcodeStats>, IndelstatError> {
        let progress = AtomicUsize::new(0);
        let total = report.len();

        let results: Result<Vec<Option<BarcodeStats>>, IndelstatError> = report
            .records()
            .par_iter()
            .map(|record| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(IndelstatError::Cancelled);
                }
                let stats = match barcode_stats(
                    &record.barcode,
                    &record.observations,
                    self.config.ratio_sum_tolerance,
                ) {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        if self.config.skip_invalid {
                            warn!("Skipping barcode {}: {}", record.barcode, e);
                            None
                        } else {
                            return Err(e.into());
                        }
                    }
                };
                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                if done % PROGRESS_INTERVAL == 0 {
                    info!("Computing indel statistics... {} out of {}", done, total);
                }
                Ok(stats)
            })
            .collect();

        Ok(results?.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_observations;
    use approx::assert_relative_eq;

    fn test_report() -> IndelReport {
        let mut report = IndelReport::new();
        report.insert(
            "AACGT".to_string(),
            parse_observations("22M1D:1482:50.0, 29M17I:308:100.0, 20M5D:1302:50.0").unwrap(),
        );
        report.insert(
            "GGTCA".to_string(),
            parse_observations("21M1I:1880:100.0").unwrap(),
        );
        report
    }

    #[test]
    fn test_analyze_preserves_report_order() {
        let analyzer = IndelAnalyzer::new(AnalyzerConfig::default());
        let stats = analyzer.analyze(&test_report()).unwrap();
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].barcode, "AACGT");
        assert_relative_eq!(stats[0].insertion_ratio, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(stats[0].deletion_ratio, 2.0 / 3.0, epsilon = 1e-12);
        // (17 * 100) / 100 and (1 * 50 + 5 * 50) / 100
        assert_relative_eq!(stats[0].weighted_insertion_length, 17.0);
        assert_relative_eq!(stats[0].weighted_deletion_length, 3.0);

        assert_eq!(stats[1].barcode, "GGTCA");
        assert_relative_eq!(stats[1].insertion_ratio, 1.0);
        assert_relative_eq!(stats[1].weighted_deletion_length, 0.0);
    }

    #[test]
    fn test_analyze_empty_barcode_policy() {
        let mut report = test_report();
        report.insert("TTTTT".to_string(), Vec::new());

        let analyzer = IndelAnalyzer::new(AnalyzerConfig::default());
        assert!(analyzer.analyze(&report).is_err());

        let mut config = AnalyzerConfig::default();
        config.skip_invalid = true;
        let analyzer = IndelAnalyzer::new(config);
        let stats = analyzer.analyze(&report).unwrap();
        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|s| s.barcode != "TTTTT"));
    }

    #[test]
    fn test_analyze_cancellation() {
        let analyzer = IndelAnalyzer::new(AnalyzerConfig::default());
        let cancel = AtomicBool::new(true);
        let result = analyzer.analyze_with_cancel(&test_report(), &cancel);
        assert!(matches!(result, Err(IndelstatError::Cancelled)));
    }
}
