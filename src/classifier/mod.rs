//! 画像分類アダプタ
//!
//! 事前学習済み分類器をプロセス内で一度だけ読み込み、以後は読み取り専用で共有する。
//! 状態遷移: Uninitialized → Loading → Ready / Failed（前進のみ、再試行なし）

mod mobilenet;

pub use mobilenet::{load_labels, MobileNetClassifier};

use crate::error::{FarmAssistError, Result};
use async_trait::async_trait;
use farm_assist_common::Prediction;
use image::DynamicImage;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// 分類器
#[async_trait]
pub trait Classifier: Send + Sync {
    /// 確信度の降順で予測を返す
    async fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>>;

    fn name(&self) -> &str;
}

/// 設定のモデルを読み込む（`ClassifierHandle::initialize` に渡す）
pub async fn load_from_config(config: &crate::config::Config) -> Result<Arc<dyn Classifier>> {
    let classifier = MobileNetClassifier::load(config).await?;
    Ok(Arc::new(classifier))
}

/// 読み込み状態のタグ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStatus::Uninitialized => write!(f, "uninitialized"),
            LoadStatus::Loading => write!(f, "loading"),
            LoadStatus::Ready => write!(f, "ready"),
            LoadStatus::Failed => write!(f, "failed"),
        }
    }
}

enum LoadState {
    Uninitialized,
    Loading,
    Ready(Arc<dyn Classifier>),
    Failed(String),
}

/// 分類器ハンドル
///
/// `Arc<ClassifierHandle>` で共有する。書き込みは初期化時のみ。
pub struct ClassifierHandle {
    state: RwLock<LoadState>,
}

impl Default for ClassifierHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierHandle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LoadState::Uninitialized),
        }
    }

    /// 読み込み済みの分類器からハンドルを作る
    pub fn ready(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            state: RwLock::new(LoadState::Ready(classifier)),
        }
    }

    pub fn status(&self) -> LoadStatus {
        match &*self.read() {
            LoadState::Uninitialized => LoadStatus::Uninitialized,
            LoadState::Loading => LoadStatus::Loading,
            LoadState::Ready(_) => LoadStatus::Ready,
            LoadState::Failed(_) => LoadStatus::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == LoadStatus::Ready
    }

    /// 読み込み失敗時のエラー内容（Failed以外は None）
    pub fn load_error(&self) -> Option<String> {
        match &*self.read() {
            LoadState::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// 分類器を読み込む
    ///
    /// 実際に `load` を呼ぶのは最初の1回だけ。2回目以降は現在の状態を返す:
    /// Ready → Ok、Loading → NotReady、Failed → ModelLoad。
    pub async fn initialize<F, Fut>(&self, load: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Classifier>>>,
    {
        {
            let mut state = self.write();
            match &*state {
                LoadState::Uninitialized => {}
                LoadState::Loading => return Err(FarmAssistError::NotReady),
                LoadState::Ready(_) => return Ok(()),
                LoadState::Failed(msg) => return Err(FarmAssistError::ModelLoad(msg.clone())),
            }
            *state = LoadState::Loading;
        }

        tracing::info!("分類モデルを読み込み中");
        let started = std::time::Instant::now();

        match load().await {
            Ok(classifier) => {
                tracing::info!(
                    model = classifier.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "分類モデル準備完了"
                );
                *self.write() = LoadState::Ready(classifier);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "分類モデルの読み込みに失敗");
                *self.write() = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// 画像を分類する。Ready以外では `NotReady`。
    pub async fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>> {
        // ロックはawaitをまたがない
        let classifier = match &*self.read() {
            LoadState::Ready(c) => Arc::clone(c),
            _ => return Err(FarmAssistError::NotReady),
        };

        let started = std::time::Instant::now();
        let predictions = classifier.classify(image).await?;
        tracing::debug!(
            count = predictions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "推論完了"
        );
        Ok(predictions)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LoadState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LoadState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Prediction::new("daisy", 0.9)])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn fixed() -> Arc<dyn Classifier> {
        Arc::new(FixedClassifier {
            calls: AtomicUsize::new(0),
        })
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[tokio::test]
    async fn test_classify_before_initialize_is_not_ready() {
        let handle = ClassifierHandle::new();
        assert_eq!(handle.status(), LoadStatus::Uninitialized);

        let err = handle.classify(&blank()).await.unwrap_err();
        assert!(matches!(err, FarmAssistError::NotReady));
        assert!(handle.load_error().is_some_and(|msg| msg.contains("missing.onnx")));
    }

    #[tokio::test]
    async fn test_initialize_then_classify() {
        let handle = ClassifierHandle::new();
        handle.initialize(|| async { Ok(fixed()) }).await.unwrap();
        assert_eq!(handle.status(), LoadStatus::Ready);

        let preds = handle.classify(&blank()).await.unwrap();
        assert_eq!(preds[0].label, "daisy");
    }

    #[tokio::test]
    async fn test_initialize_runs_loader_once() {
        let handle = ClassifierHandle::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            handle
                .initialize(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(fixed())
                })
                .await
                .unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_terminal() {
        let handle = ClassifierHandle::new();
        let err = handle
            .initialize(|| async { Err(FarmAssistError::ModelLoad("missing.onnx".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, FarmAssistError::ModelLoad(_)));
        assert_eq!(handle.status(), LoadStatus::Failed);

        // 再初期化はしない
        let err = handle.initialize(|| async { Ok(fixed()) }).await.unwrap_err();
        assert!(matches!(err, FarmAssistError::ModelLoad(msg) if msg.contains("missing.onnx")));
        assert_eq!(handle.status(), LoadStatus::Failed);

        let err = handle.classify(&blank()).await.unwrap_err();
        assert!(matches!(err, FarmAssistError::NotReady));
    }

    #[tokio::test]
    async fn test_classify_while_loading_is_not_ready() {
        let handle = Arc::new(ClassifierHandle::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let loader = Arc::clone(&handle);
        let task = tokio::spawn(async move {
            loader
                .initialize(|| async move {
                    let _ = rx.await;
                    Ok(fixed())
                })
                .await
        });

        // Loadingに入るまで待つ
        while handle.status() != LoadStatus::Loading {
            tokio::task::yield_now().await;
        }
        assert!(matches!(
            handle.classify(&blank()).await,
            Err(FarmAssistError::NotReady)
        ));
        assert!(matches!(
            handle.initialize(|| async { Ok(fixed()) }).await,
            Err(FarmAssistError::NotReady)
        ));

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(handle.is_ready());
    }
}
