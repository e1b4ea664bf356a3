pub mod analyze;
pub mod convert;
pub mod encode;
pub mod reap;
pub mod slice;

use sheetanim_engine::AnalysisReport;

/// Below this confidence the detected grid should be checked by hand.
pub const REVIEW_THRESHOLD: f64 = 0.8;

pub fn print_report(report: &AnalysisReport) {
    println!(
        "  Image: {}x{}",
        report.image_size.width, report.image_size.height
    );
    println!(
        "  Grid: {} rows x {} cols ({} frames)",
        report.rows, report.cols, report.total_frames
    );
    println!(
        "  Margin: {} px (separator width {:.1} px)",
        report.margin, report.line_width
    );
    println!(
        "  Confidence: {:.2} ({})",
        report.confidence, report.method
    );
    if report.needs_review(REVIEW_THRESHOLD) {
        println!("  Low confidence: check the grid or pass --rows/--cols explicitly.");
    }
}
