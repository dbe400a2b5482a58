use clap::{Parser, Subcommand};
use farm_assist_common::AdviceContext;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "farm-assist")]
#[command(about = "画像分類による農業アドバイスCLI（天候・土壌・病害虫・相場）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時: ~/.config/farm-assist/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 空の画像または気温から作物を推奨
    Weather {
        /// 空の画像
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 気温（℃）。画像がない場合に使用
        #[arg(short, long, allow_hyphen_values = true)]
        temperature: Option<String>,
    },

    /// 土壌画像を解析
    Soil {
        /// 土壌画像
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// 葉・害虫画像から病害虫を判定
    Pest {
        /// 葉・害虫の画像
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// フォルダ内の画像を一括解析してJSONを出力
    Analyze {
        /// 画像フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 解析の種類 (weather/soil/pest)
        #[arg(short, long)]
        context: AdviceContext,

        /// 出力JSONファイル（デフォルト: 入力フォルダ/advice.json）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 作物の予想価格
    Price {
        /// 作物名 (wheat/rice/...)
        #[arg(required = true)]
        crop: String,
    },

    /// 政府の支援制度一覧
    Schemes,

    /// 融資・保険の案内
    Finance,

    /// SMSクエリへの返信をシミュレート
    Sms {
        /// クエリ（例: recommend crop temp=25）
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// IVRメニューをシミュレート
    Ivr {
        /// 選択肢（省略時はメニューを表示）
        option: Option<String>,
    },

    /// 対話モード（モデルは起動時に一度だけ読み込む）
    Shell,

    /// 設定を表示/編集
    Config {
        /// モデルファイル（.onnx）を設定
        #[arg(long)]
        set_model: Option<PathBuf>,

        /// ラベルファイルを設定
        #[arg(long)]
        set_labels: Option<PathBuf>,

        /// アドバイスルールJSONを設定
        #[arg(long)]
        set_rules: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
