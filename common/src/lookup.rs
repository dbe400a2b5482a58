//! 固定表による応答（相場・制度・融資・SMS・IVR）

use crate::climate::{parse_temperature, TemperatureBand};
use lazy_static::lazy_static;
use regex::Regex;

pub const SCHEMES: &[&str] = &[
    "PM-Kisan Samman Nidhi",
    "Crop Insurance Scheme",
    "Soil Health Card",
];

pub const LOAN_OPTIONS: &[&str] = &["NABARD", "Kisan Credit Card"];
pub const INSURANCE_OPTIONS: &[&str] = &["PM Fasal Bima Yojana"];

pub const SMS_UNKNOWN: &str = "Sorry, I didn't understand. Try again.";
pub const SMS_CROP_HINT: &str = "🌾 Enter like: recommend crop temp=20";
pub const SMS_PRICE_HINT: &str = "💹 Try: market price rice";
pub const IVR_INVALID: &str = "☎ Please select a valid option";

lazy_static! {
    static ref TEMP_PARAM: Regex = Regex::new(r"temp\s*=\s*(-?\d+(?:\.\d+)?)").unwrap();
}

/// 作物名から予想価格（₹/quintal）
pub fn expected_price(crop: &str) -> u32 {
    match crop.trim().to_lowercase().as_str() {
        "wheat" => 2200,
        "rice" => 2500,
        _ => 6000,
    }
}

pub fn price_text(crop: &str) -> String {
    format!("₹{}/quintal (expected)", expected_price(crop))
}

pub fn schemes_text() -> String {
    SCHEMES
        .iter()
        .map(|s| format!("✅ {}", s))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn finance_text() -> String {
    format!(
        "💰 Loan Options: {}\n📑 Insurance: {}",
        LOAN_OPTIONS.join(", "),
        INSURANCE_OPTIONS.join(", ")
    )
}

/// SMSクエリへの返信
pub fn sms_reply(query: &str) -> String {
    let query = query.to_lowercase();

    if query.contains("recommend crop") {
        return match TEMP_PARAM
            .captures(&query)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_temperature(m.as_str()))
        {
            Some(t) => format!("🌾 {}", TemperatureBand::from_celsius(t).crops()),
            None => SMS_CROP_HINT.to_string(),
        };
    }

    if query.contains("market price") {
        // "price" は "rice" を含むので単語単位で照合
        let words: Vec<&str> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        for crop in ["wheat", "rice"] {
            if words.contains(&crop) {
                return format!(
                    "💹 {}{} price: ₹{}/quintal",
                    crop[..1].to_uppercase(),
                    &crop[1..],
                    expected_price(crop)
                );
            }
        }
        return SMS_PRICE_HINT.to_string();
    }

    if query.contains("scheme") {
        return format!("✅ {}", SCHEMES.join(", ✅ "));
    }

    SMS_UNKNOWN.to_string()
}

/// IVRメニュー項目
pub const IVR_MENU: &[(&str, &str)] = &[
    ("1", "Crop Recommendation"),
    ("2", "Market Price"),
    ("3", "Govt Schemes"),
];

/// IVR選択肢への返信
pub fn ivr_reply(option: &str) -> &'static str {
    match option.trim() {
        "1" => "🌱 Crop Recommendation: Wheat & Barley (cold climate)",
        "2" => "💹 Market Price: Rice ₹2500/quintal",
        "3" => "🏛 Govt Schemes: PM-Kisan, Crop Insurance",
        _ => IVR_INVALID,
    }
}
