//! 機能ごとの入口
//!
//! 入力の有無を確認 → 画像デコード → 分類 → ルール適用。
//! エラーは `Result` のまま返し、表示文への変換は presenter が行う。

use crate::classifier::ClassifierHandle;
use crate::error::{FarmAssistError, Result};
use crate::scanner::{self, ImageInfo};
use chrono::{DateTime, Local};
use farm_assist_common::{
    parse_temperature, AdviceBook, AdviceContext, AdviceReport, TemperatureBand,
    TEMPERATURE_PROMPT,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const SOIL_PROMPT: &str = "Please upload a soil image first.";
pub const PEST_PROMPT: &str = "Please upload a pest/leaf image first.";

/// 機能呼び出しの結果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 入力が足りないので入力を促す
    Prompt(&'static str),
    Advice(AdviceReport),
    /// 気温のみの経路
    Temperature(&'static str),
}

pub struct Advisor {
    handle: Arc<ClassifierHandle>,
    book: AdviceBook,
}

impl Advisor {
    pub fn new(handle: Arc<ClassifierHandle>, book: AdviceBook) -> Self {
        Self { handle, book }
    }

    pub fn handle(&self) -> &ClassifierHandle {
        &self.handle
    }

    /// 天候: 画像があれば画像、なければ気温で判定
    pub async fn weather(&self, image: Option<&Path>, temperature: Option<&str>) -> Result<Outcome> {
        if let Some(path) = image {
            return self.advise(path, AdviceContext::Weather).await.map(Outcome::Advice);
        }

        match temperature.and_then(parse_temperature) {
            Some(t) => Ok(Outcome::Temperature(TemperatureBand::from_celsius(t).crops())),
            None => Ok(Outcome::Prompt(TEMPERATURE_PROMPT)),
        }
    }

    pub async fn soil(&self, image: Option<&Path>) -> Result<Outcome> {
        match image {
            Some(path) => self.advise(path, AdviceContext::Soil).await.map(Outcome::Advice),
            None => Ok(Outcome::Prompt(SOIL_PROMPT)),
        }
    }

    pub async fn pest(&self, image: Option<&Path>) -> Result<Outcome> {
        match image {
            Some(path) => self.advise(path, AdviceContext::Pest).await.map(Outcome::Advice),
            None => Ok(Outcome::Prompt(PEST_PROMPT)),
        }
    }

    /// 画像1枚: デコード → 分類 → アドバイス
    pub async fn advise(&self, path: &Path, context: AdviceContext) -> Result<AdviceReport> {
        tracing::debug!(path = %path.display(), %context, "画像解析開始");

        let image = scanner::decode_image(path)?;
        let predictions = match self.handle.classify(&image).await {
            // 読み込み失敗は待っても直らないので NotReady と区別する
            Err(FarmAssistError::NotReady) => match self.handle.load_error() {
                Some(msg) => return Err(FarmAssistError::ModelLoad(msg)),
                None => return Err(FarmAssistError::NotReady),
            },
            other => other?,
        };
        let advice = self.book.advise(&predictions, context).to_string();

        Ok(AdviceReport {
            context,
            predictions,
            advice,
        })
    }

    /// フォルダ内の画像を順番に解析する
    ///
    /// 個々の画像の失敗は記録して続行する。
    pub async fn analyze_folder<F>(
        &self,
        folder: &Path,
        context: AdviceContext,
        on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&ImageInfo),
    {
        let images = collect_images(folder)?;
        self.analyze_images(&images, context, on_progress).await
    }

    /// スキャン済みの画像一覧を解析する（件数を先に知りたい場合用）
    pub async fn analyze_images<F>(
        &self,
        images: &[ImageInfo],
        context: AdviceContext,
        mut on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&ImageInfo),
    {
        let mut entries = Vec::with_capacity(images.len());
        for info in images {
            on_progress(info);
            let entry = match self.advise(&info.path, context).await {
                Ok(report) => BatchEntry {
                    file_name: info.file_name.clone(),
                    report: Some(report),
                    error: None,
                },
                Err(e) => {
                    tracing::error!(file = %info.file_name, error = %e, "画像解析に失敗");
                    BatchEntry {
                        file_name: info.file_name.clone(),
                        report: None,
                        error: Some(crate::presenter::failure_message(context, &e).to_string()),
                    }
                }
            };
            entries.push(entry);
        }

        Ok(BatchReport {
            generated_at: Local::now(),
            context,
            entries,
        })
    }
}

/// フォルダをスキャンし、画像がなければ `NoImagesFound`
pub fn collect_images(folder: &Path) -> Result<Vec<ImageInfo>> {
    let images = scanner::scan_folder(folder)?;
    if images.is_empty() {
        return Err(FarmAssistError::NoImagesFound(folder.display().to_string()));
    }
    Ok(images)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AdviceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub generated_at: DateTime<Local>,
    pub context: AdviceContext,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.report.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }
}
