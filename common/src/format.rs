//! 表示用の整形

use crate::types::{AdviceReport, Prediction};

/// "label (63.2%), label (12.0%)" 形式
pub fn format_predictions(predictions: &[Prediction]) -> String {
    predictions
        .iter()
        .map(|p| format!("{} ({:.1}%)", p.label, p.confidence * 100.0))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_report(report: &AdviceReport) -> String {
    format!(
        "Model predictions: {}\nAdvice: {}",
        format_predictions(&report.predictions),
        report.advice
    )
}
