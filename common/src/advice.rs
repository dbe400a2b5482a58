//! ラベル → アドバイス変換
//!
//! 分類器の汎用ラベル（ImageNet語彙）を農業向けアドバイス文に変換する。
//! ルールは上から順に評価し、最初に一致したもののアドバイスを返す。
//! どれにも一致しなければ領域ごとのフォールバック文を返す。

use crate::error::{Error, Result};
use crate::types::{AdviceContext, Prediction};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

pub const WEATHER_STORM: &str =
    "Detected cloudy/stormy sky → delay sowing; prefer crops tolerant to excess moisture.";
pub const WEATHER_CLEAR: &str =
    "Detected clear sky → good conditions for sowing many crops (rice/maize depending on temp).";
pub const WEATHER_MIXED: &str =
    "Image suggests mixed conditions: use temperature input for recommendation.";

pub const SOIL_SANDY: &str =
    "Soil seems sandy → low water retention. Suggest: organic compost, mulching.";
pub const SOIL_CLAYEY: &str =
    "Soil seems clayey → may need drainage improvement and organic matter.";
pub const SOIL_VEGETATION: &str =
    "Image shows vegetation/plant matter. Check nutrients (NPK) via lab test.";
pub const SOIL_GENERAL: &str =
    "General check: consider Soil Health Card / lab test for NPK values.";

pub const PEST_FUNGAL: &str =
    "Possible fungal infection detected. Suggest: organic fungicide, improve airflow.";
pub const PEST_INSECT: &str = "Possible insect pest. Suggest: neem oil or biological control.";
pub const PEST_PLANT_ISSUE: &str =
    "Signs detected on leaf/plant; consider lab test or expert evaluation for precise diagnosis.";
pub const PEST_NONE: &str = "No clear pest/disease detected. If symptoms persist, take leaf close-up photos and consult an expert.";

const PLANT_PARTS: &[&str] = &["leaf", "plant", "flower"];

/// ルール1件
///
/// `keywords` の各グループについて、いずれかのキーワードが検索文字列に
/// 含まれていれば一致（グループ間はAND、グループ内はOR）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceRule {
    pub keywords: Vec<Vec<String>>,
    pub advice: String,
}

impl AdviceRule {
    pub fn new(groups: &[&[&str]], advice: &str) -> Self {
        Self {
            keywords: groups
                .iter()
                .map(|g| g.iter().map(|k| k.to_lowercase()).collect())
                .collect(),
            advice: advice.to_string(),
        }
    }

    /// `haystack` は小文字化済みであること
    pub fn matches(&self, haystack: &str) -> bool {
        self.keywords
            .iter()
            .all(|group| group.iter().any(|k| haystack.contains(k.as_str())))
    }
}

/// 領域ごとのルール表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<AdviceRule>,
    pub fallback: String,
}

impl RuleTable {
    /// 最初に一致したルールのアドバイス、なければフォールバック
    pub fn evaluate(&self, haystack: &str) -> &str {
        self.rules
            .iter()
            .find(|r| r.matches(haystack))
            .map(|r| r.advice.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    fn normalize(&mut self) {
        for rule in &mut self.rules {
            for group in &mut rule.keywords {
                for k in group.iter_mut() {
                    *k = k.trim().to_lowercase();
                }
            }
        }
    }

    fn validate(&self, context: AdviceContext) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.keywords.is_empty() {
                return Err(Error::InvalidRules(format!(
                    "{} rule #{} has no keyword groups",
                    context,
                    i + 1
                )));
            }
            // 空グループや空キーワードは常に一致/不一致になり後続ルールを隠す
            if rule
                .keywords
                .iter()
                .any(|g| g.is_empty() || g.iter().any(|k| k.is_empty()))
            {
                return Err(Error::InvalidRules(format!(
                    "{} rule #{} has an empty keyword group",
                    context,
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

/// 3領域分のルール表
///
/// JSONで一部の領域だけ指定した場合、残りは組み込み表を使う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceBook {
    pub weather: RuleTable,
    pub soil: RuleTable,
    pub pest: RuleTable,
}

impl Default for AdviceBook {
    fn default() -> Self {
        Self {
            weather: weather_table(),
            soil: soil_table(),
            pest: pest_table(),
        }
    }
}

impl AdviceBook {
    pub fn table(&self, context: AdviceContext) -> &RuleTable {
        match context {
            AdviceContext::Weather => &self.weather,
            AdviceContext::Soil => &self.soil,
            AdviceContext::Pest => &self.pest,
        }
    }

    /// 予測ラベルからアドバイスを選ぶ
    pub fn advise(&self, predictions: &[Prediction], context: AdviceContext) -> &str {
        self.table(context).evaluate(&search_text(predictions))
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let mut book: Self = serde_json::from_str(json)?;
        for context in AdviceContext::ALL {
            let table = match context {
                AdviceContext::Weather => &mut book.weather,
                AdviceContext::Soil => &mut book.soil,
                AdviceContext::Pest => &mut book.pest,
            };
            table.normalize();
            table.validate(context)?;
        }
        Ok(book)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

lazy_static! {
    static ref DEFAULT_BOOK: AdviceBook = AdviceBook::default();
}

/// 全ラベルを小文字化して空白区切りで連結
pub fn search_text(predictions: &[Prediction]) -> String {
    predictions
        .iter()
        .map(|p| p.label.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 組み込みルール表でアドバイスを返す
pub fn map_to_advice(predictions: &[Prediction], context: AdviceContext) -> &'static str {
    DEFAULT_BOOK.advise(predictions, context)
}

fn weather_table() -> RuleTable {
    RuleTable {
        rules: vec![
            AdviceRule::new(&[&["cloud", "nimbus", "storm"]], WEATHER_STORM),
            AdviceRule::new(&[&["sun", "sky", "clear"]], WEATHER_CLEAR),
        ],
        fallback: WEATHER_MIXED.to_string(),
    }
}

fn soil_table() -> RuleTable {
    RuleTable {
        rules: vec![
            AdviceRule::new(&[&["sand", "dune", "beach"]], SOIL_SANDY),
            AdviceRule::new(&[&["clay", "loam", "pottery"]], SOIL_CLAYEY),
            AdviceRule::new(&[&["plant", "leaf", "moss"]], SOIL_VEGETATION),
        ],
        fallback: SOIL_GENERAL.to_string(),
    }
}

fn pest_table() -> RuleTable {
    RuleTable {
        rules: vec![
            AdviceRule::new(&[PLANT_PARTS, &["fungus", "mildew", "mold"]], PEST_FUNGAL),
            AdviceRule::new(
                &[PLANT_PARTS, &["insect", "bee", "fly", "caterpillar", "worm"]],
                PEST_INSECT,
            ),
            AdviceRule::new(&[PLANT_PARTS], PEST_PLANT_ISSUE),
        ],
        fallback: PEST_NONE.to_string(),
    }
}
