//! Farm Assist Common Library
//!
//! CLIと対話シェルで共有される型・ルール表・固定応答

pub mod types;
pub mod error;
pub mod advice;
pub mod climate;
pub mod lookup;
pub mod format;

pub use types::{AdviceContext, AdviceReport, Prediction};
pub use error::{Error, Result};
pub use advice::{map_to_advice, search_text, AdviceBook, AdviceRule, RuleTable};
pub use climate::{parse_temperature, recommend_by_temperature, TemperatureBand, TEMPERATURE_PROMPT};
pub use lookup::{finance_text, ivr_reply, price_text, schemes_text, sms_reply, IVR_MENU};
pub use format::{format_predictions, format_report};
