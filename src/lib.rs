//! farm-assist
//!
//! 汎用の事前学習済み画像分類器で画像を分類し、ラベルをキーワード照合で
//! 農業アドバイスに変換する。

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod presenter;
pub mod scanner;
pub mod shell;
