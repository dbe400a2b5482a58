//! MobileNet系ONNXモデルによる分類（tract）
//!
//! 前処理: RGB → input_size×input_size にリサイズ → ImageNet平均/分散で正規化 → NCHW f32
//! 後処理: softmax（任意）→ 上位k件

use super::Classifier;
use crate::config::Config;
use crate::error::{FarmAssistError, Result};
use async_trait::async_trait;
use farm_assist_common::Prediction;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tract_onnx::prelude::*;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

type OnnxPlan = TypedRunnableModel<TypedModel>;

pub struct MobileNetClassifier {
    plan: Arc<OnnxPlan>,
    labels: Arc<Vec<String>>,
    name: String,
    top_k: usize,
    input_size: u32,
    apply_softmax: bool,
}

impl MobileNetClassifier {
    /// 設定に従ってモデルとラベルを読み込む（重い処理はブロッキングスレッドで）
    pub async fn load(config: &Config) -> Result<Self> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&config))
            .await
            .map_err(|e| FarmAssistError::ModelLoad(format!("読み込みタスク異常終了: {}", e)))?
    }

    fn load_blocking(config: &Config) -> Result<Self> {
        let model_path = &config.model_path;
        if !model_path.exists() {
            return Err(FarmAssistError::ModelLoad(format!(
                "モデルファイルが見つかりません: {}",
                model_path.display()
            )));
        }

        if let Some(expected) = &config.model_sha256 {
            verify_checksum(model_path, expected)?;
        }

        let labels = load_labels(&config.labels_path)?;
        tracing::debug!(count = labels.len(), path = %config.labels_path.display(), "ラベル読み込み");

        let plan = build_plan(model_path, config.input_size as usize).map_err(|e| {
            FarmAssistError::ModelLoad(format!("{}: {}", model_path.display(), e))
        })?;

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "onnx".to_string());

        Ok(Self {
            plan: Arc::new(plan),
            labels: Arc::new(labels),
            name,
            top_k: config.top_k,
            input_size: config.input_size,
            apply_softmax: config.apply_softmax,
        })
    }
}

#[async_trait]
impl Classifier for MobileNetClassifier {
    async fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>> {
        let rgb = image.to_rgb8();
        let plan = Arc::clone(&self.plan);
        let labels = Arc::clone(&self.labels);
        let (size, top_k, apply_softmax) = (self.input_size, self.top_k, self.apply_softmax);

        tokio::task::spawn_blocking(move || -> Result<Vec<Prediction>> {
            let scores = run_plan(&plan, &rgb, size)
                .map_err(|e| FarmAssistError::Inference(e.to_string()))?;
            let scores = if apply_softmax { softmax(&scores) } else { scores };
            Ok(rank(&scores, &labels, top_k))
        })
        .await
        .map_err(|e| FarmAssistError::Inference(format!("推論タスク異常終了: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn build_plan(path: &Path, size: usize) -> anyhow::Result<OnnxPlan> {
    let plan = tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, f32::fact([1, 3, size, size]).into())?
        .into_optimized()?
        .into_runnable()?;
    Ok(plan)
}

fn run_plan(plan: &OnnxPlan, rgb: &RgbImage, size: u32) -> anyhow::Result<Vec<f32>> {
    let input = preprocess(rgb, size);
    let outputs = plan.run(tvec!(input.into()))?;
    let first = outputs
        .first()
        .ok_or_else(|| anyhow::anyhow!("モデルの出力がありません"))?;
    let view = first.to_array_view::<f32>()?;
    Ok(view.iter().copied().collect())
}

/// NCHW・ImageNet正規化済みテンソル
fn preprocess(rgb: &RgbImage, size: u32) -> Tensor {
    let resized = image::imageops::resize(rgb, size, size, FilterType::Triangle);
    let side = size as usize;
    tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        let p = resized.get_pixel(x as u32, y as u32);
        (p[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
    })
    .into()
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|v| v / sum).collect()
}

/// 確信度の降順で上位k件
fn rank(scores: &[f32], labels: &[String], top_k: usize) -> Vec<Prediction> {
    // NaN/inf は 0 扱い（total_cmp では NaN が先頭に来る）
    let mut indexed: Vec<(usize, f32)> = scores
        .iter()
        .map(|&s| if s.is_finite() { s } else { 0.0 })
        .enumerate()
        .collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed
        .into_iter()
        .take(top_k)
        .map(|(idx, score)| {
            let label = labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("class {}", idx));
            Prediction::new(label, score.clamp(0.0, 1.0))
        })
        .collect()
}

/// ラベルファイル（1行1ラベル）を読み込む
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FarmAssistError::ModelLoad(format!("ラベルファイル {}: {}", path.display(), e))
    })?;
    Ok(parse_labels(&content))
}

fn parse_labels(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| strip_wordnet_id(l).to_string())
        .collect()
}

/// "n01440764 tench, Tinca tinca" → "tench, Tinca tinca"
fn strip_wordnet_id(line: &str) -> &str {
    match line.split_once(' ') {
        Some((id, rest))
            if id.len() == 9
                && id.starts_with('n')
                && id[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest.trim()
        }
        _ => line,
    }
}

fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let actual = hex::encode(Sha256::digest(&bytes));
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(FarmAssistError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_labels_strips_wordnet_ids() {
        let labels = parse_labels("n01440764 tench, Tinca tinca\n\n  daisy  \nn04285008 sports car\n");
        assert_eq!(labels, vec!["tench, Tinca tinca", "daisy", "sports car"]);
    }

    #[test]
    fn test_strip_wordnet_id_keeps_plain_labels() {
        assert_eq!(strip_wordnet_id("night snake"), "night snake");
        assert_eq!(strip_wordnet_id("n0144 short id"), "n0144 short id");
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_rank_descending_with_fallback_label() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let ranked = rank(&[0.1, 0.7, 0.2], &labels, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], Prediction::new("b", 0.7));
        // ラベル数より出力が多い場合
        assert_eq!(ranked[1].label, "class 2");
    }

    #[test]
    fn test_rank_clamps_confidence() {
        let ranked = rank(&[1.5, -0.2], &[], 5);
        assert_eq!(ranked[0].confidence, 1.0);
        assert_eq!(ranked[1].confidence, 0.0);
    }

    #[test]
    fn test_rank_non_finite_scores_are_zero() {
        let labels: Vec<String> = ["nan", "leaf", "inf"].iter().map(|s| s.to_string()).collect();
        let ranked = rank(&[f32::NAN, 0.4, f32::INFINITY], &labels, 3);
        assert_eq!(ranked[0].label, "leaf");
        assert!(ranked
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.confidence)));
        assert_eq!(ranked[1].confidence, 0.0);
        assert_eq!(ranked[2].confidence, 0.0);
    }

    #[test]
    fn test_preprocess_shape() {
        let img = RgbImage::from_pixel(10, 6, image::Rgb([255, 0, 128]));
        let tensor = preprocess(&img, 8);
        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
    }

    #[test]
    fn test_verify_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"abc").unwrap();

        let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(verify_checksum(&path, expected).is_ok());
        assert!(verify_checksum(&path, &expected.to_uppercase()).is_ok());

        let err = verify_checksum(&path, "00").unwrap_err();
        assert!(matches!(err, FarmAssistError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_model() {
        let dir = tempdir().unwrap();
        let config = Config {
            model_path: dir.path().join("missing.onnx"),
            labels_path: dir.path().join("labels.txt"),
            ..Config::default()
        };
        let err = MobileNetClassifier::load(&config).await.err().unwrap();
        assert!(matches!(err, FarmAssistError::ModelLoad(msg) if msg.contains("missing.onnx")));
    }

    #[tokio::test]
    async fn test_load_invalid_model_bytes() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("broken.onnx");
        let labels = dir.path().join("labels.txt");
        std::fs::write(&model, b"not an onnx file").unwrap();
        std::fs::write(&labels, "daisy\n").unwrap();

        let config = Config {
            model_path: model,
            labels_path: labels,
            ..Config::default()
        };
        let err = MobileNetClassifier::load(&config).await.err().unwrap();
        assert!(matches!(err, FarmAssistError::ModelLoad(_)));
    }
}
