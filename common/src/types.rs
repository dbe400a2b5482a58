//! 分類結果とアドバイスの型定義
//!
//! CLIと対話シェルで共有される型:
//! - Prediction: 分類器の出力（ラベル + 確信度）
//! - AdviceContext: どのルール表を適用するか
//! - AdviceReport: 画像1枚分の最終出力

use serde::{Deserialize, Serialize};

/// 分類器の予測1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// 0.0〜1.0
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// アドバイスの適用領域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceContext {
    Weather,
    Soil,
    Pest,
}

impl AdviceContext {
    pub const ALL: [AdviceContext; 3] = [Self::Weather, Self::Soil, Self::Pest];

    /// 表示用の名前
    pub fn label(&self) -> &'static str {
        match self {
            AdviceContext::Weather => "weather",
            AdviceContext::Soil => "soil",
            AdviceContext::Pest => "pest",
        }
    }
}

impl std::str::FromStr for AdviceContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weather" | "sky" => Ok(AdviceContext::Weather),
            "soil" => Ok(AdviceContext::Soil),
            "pest" | "leaf" | "disease" => Ok(AdviceContext::Pest),
            _ => Err(format!("Unknown context: {}. Use weather, soil, or pest", s)),
        }
    }
}

impl std::fmt::Display for AdviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 画像1枚の解析結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceReport {
    pub context: AdviceContext,
    pub predictions: Vec<Prediction>,
    pub advice: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_str_aliases() {
        assert_eq!("Weather".parse::<AdviceContext>(), Ok(AdviceContext::Weather));
        assert_eq!("sky".parse::<AdviceContext>(), Ok(AdviceContext::Weather));
        assert_eq!(" soil ".parse::<AdviceContext>(), Ok(AdviceContext::Soil));
        assert_eq!("leaf".parse::<AdviceContext>(), Ok(AdviceContext::Pest));
        assert!("market".parse::<AdviceContext>().is_err());
    }

    #[test]
    fn test_context_serde_lowercase() {
        let json = serde_json::to_string(&AdviceContext::Pest).unwrap();
        assert_eq!(json, "\"pest\"");
        let back: AdviceContext = serde_json::from_str("\"soil\"").unwrap();
        assert_eq!(back, AdviceContext::Soil);
    }
}
