//! 気温による作物推奨（画像を使わない経路）

pub const TEMPERATURE_PROMPT: &str = "Please enter temperature or upload a weather (sky) image.";

/// 気温帯
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
    /// 20℃未満
    Cool,
    /// 20〜30℃
    Warm,
    /// 30℃超〜45℃
    Hot,
    /// 45℃超
    Extreme,
}

impl TemperatureBand {
    pub fn from_celsius(temp: f64) -> Self {
        if temp < 20.0 {
            TemperatureBand::Cool
        } else if temp <= 30.0 {
            TemperatureBand::Warm
        } else if temp <= 45.0 {
            TemperatureBand::Hot
        } else {
            TemperatureBand::Extreme
        }
    }

    pub fn crops(&self) -> &'static str {
        match self {
            TemperatureBand::Cool => "Best crops: Wheat, Barley, Mustard 🌾",
            TemperatureBand::Warm => "Best crops: Rice, Maize, Cotton 🌽",
            TemperatureBand::Hot => "Best crops: Sugarcane, Millets, Sorghum 🌱",
            TemperatureBand::Extreme => "Best crops: Chilli, Bitter Gourd 🌶",
        }
    }
}

/// 入力文字列を気温として解釈
///
/// 空文字・非数値・無限大/NaNは `None`。
pub fn parse_temperature(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|t| t.is_finite())
}

/// 気温入力から推奨文を返す。解釈できない入力には入力を促す文を返す。
pub fn recommend_by_temperature(input: &str) -> &'static str {
    match parse_temperature(input) {
        Some(t) => TemperatureBand::from_celsius(t).crops(),
        None => TEMPERATURE_PROMPT,
    }
}
