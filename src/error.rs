use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmAssistError {
    #[error("分類モデルの準備ができていません")]
    NotReady,

    #[error("入力画像エラー: {0}")]
    Input(String),

    #[error("推論エラー: {0}")]
    Inference(String),

    #[error("モデル読み込みエラー: {0}")]
    ModelLoad(String),

    #[error("モデルのチェックサムが一致しません (期待値: {expected}, 実際: {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("入力エラー: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] farm_assist_common::Error),
}

pub type Result<T> = std::result::Result<T, FarmAssistError>;
