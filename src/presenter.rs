//! 表示境界
//!
//! 機能の結果を表示文にする。エラーはここでログに出し、固定文に置き換える。
//! 呼び出し元へはそれ以上伝播しない。

use crate::error::FarmAssistError;
use crate::orchestrator::Outcome;
use farm_assist_common::{format_report, AdviceContext};

pub const MODEL_NOT_READY: &str = "Model not loaded yet. Please wait a moment and try again.";
pub const MODEL_LOAD_FAILED: &str = "Error loading model.";
pub const WEATHER_FAILED: &str =
    "Weather image analysis failed. Please try again or use temperature input.";
pub const SOIL_FAILED: &str = "Soil analysis failed. Try a clearer image or try again.";
pub const PEST_FAILED: &str =
    "Pest detection failed. Try a clearer close-up image of the affected area.";

/// エラーに対応する固定文
pub fn failure_message(context: AdviceContext, error: &FarmAssistError) -> &'static str {
    match error {
        FarmAssistError::NotReady => MODEL_NOT_READY,
        FarmAssistError::ModelLoad(_) | FarmAssistError::ChecksumMismatch { .. } => {
            MODEL_LOAD_FAILED
        }
        _ => match context {
            AdviceContext::Weather => WEATHER_FAILED,
            AdviceContext::Soil => SOIL_FAILED,
            AdviceContext::Pest => PEST_FAILED,
        },
    }
}

pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Prompt(msg) => msg.to_string(),
        Outcome::Temperature(msg) => msg.to_string(),
        Outcome::Advice(report) => format_report(report),
    }
}

/// 結果を表示文に変換（失敗はログに記録）
pub fn render(context: AdviceContext, result: crate::error::Result<Outcome>) -> String {
    match result {
        Ok(outcome) => render_outcome(&outcome),
        Err(e) => {
            tracing::error!(%context, error = %e, "解析に失敗");
            failure_message(context, &e).to_string()
        }
    }
}
