use clap::Parser;
use dialoguer::Select;
use farm_assist::{classifier, cli, config, error, logging, orchestrator, presenter, shell};
use farm_assist_common::{
    finance_text, ivr_reply, price_text, schemes_text, sms_reply, AdviceContext, IVR_MENU,
};
use classifier::ClassifierHandle;
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use orchestrator::Advisor;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Weather { image, temperature } => {
            let advisor = advisor_for(&config, image.is_some()).await?;
            let result = advisor.weather(image.as_deref(), temperature.as_deref()).await;
            println!("{}", presenter::render(AdviceContext::Weather, result));
        }

        Commands::Soil { image } => {
            let advisor = advisor_for(&config, image.is_some()).await?;
            let result = advisor.soil(image.as_deref()).await;
            println!("{}", presenter::render(AdviceContext::Soil, result));
        }

        Commands::Pest { image } => {
            let advisor = advisor_for(&config, image.is_some()).await?;
            let result = advisor.pest(image.as_deref()).await;
            println!("{}", presenter::render(AdviceContext::Pest, result));
        }

        Commands::Analyze { folder, context, output } => {
            println!("🌾 farm-assist - 一括解析 ({})\n", context);
            let images = orchestrator::collect_images(&folder)?;

            println!("[1/3] モデルを読み込み中...");
            let handle = Arc::new(ClassifierHandle::new());
            handle
                .initialize(|| classifier::load_from_config(&config))
                .await?;
            println!("✔ モデル準備完了\n");

            println!("[2/3] 画像を解析中... ({}枚)", images.len());
            let advisor = Advisor::new(handle, config.advice_book()?);
            let pb = ProgressBar::new(images.len() as u64);
            pb.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            let report = advisor
                .analyze_images(&images, context, |info| {
                    pb.set_message(info.file_name.clone());
                    pb.inc(1);
                })
                .await?;
            pb.finish_and_clear();
            println!(
                "✔ 解析完了: 成功 {} / 失敗 {}\n",
                report.succeeded(),
                report.failed()
            );

            println!("[3/3] 結果を保存中...");
            let output = output.unwrap_or_else(|| folder.join("advice.json"));
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&output, json)?;
            println!("✔ 結果を保存: {}", output.display());
        }

        Commands::Price { crop } => {
            println!("{}", price_text(&crop));
        }

        Commands::Schemes => {
            println!("{}", schemes_text());
        }

        Commands::Finance => {
            println!("{}", finance_text());
        }

        Commands::Sms { query } => {
            println!("{}", sms_reply(&query.join(" ")));
        }

        Commands::Ivr { option } => {
            let option = match option {
                Some(o) => o,
                None => {
                    let items: Vec<String> = IVR_MENU
                        .iter()
                        .map(|(key, label)| format!("{}. {}", key, label))
                        .collect();
                    let selected = Select::new()
                        .with_prompt("☎ Select an option")
                        .items(&items)
                        .default(0)
                        .interact()?;
                    IVR_MENU[selected].0.to_string()
                }
            };
            println!("{}", ivr_reply(&option));
        }

        Commands::Shell => {
            shell::run(config).await?;
        }

        Commands::Config { set_model, set_labels, set_rules, show } => {
            let mut config = config;
            let changed = set_model.is_some() || set_labels.is_some() || set_rules.is_some();

            if let Some(path) = set_model {
                config.model_path = absolute(path);
            }
            if let Some(path) = set_labels {
                config.labels_path = absolute(path);
            }
            if let Some(path) = set_rules {
                // 保存前に検証
                farm_assist_common::AdviceBook::from_file(&path)?;
                config.rules_path = Some(absolute(path));
            }
            if changed {
                config.save_to(&config_path)?;
                println!("✔ 設定を保存しました: {}", config_path.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  モデル: {}", config.model_path.display());
                println!("  ラベル: {}", config.labels_path.display());
                println!(
                    "  ルール: {}",
                    config
                        .rules_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "組み込み".into())
                );
                println!("  上位件数: {}", config.top_k);
                println!("  入力サイズ: {}px", config.input_size);
                println!("  チェックサム検証: {}", if config.model_sha256.is_some() { "有効" } else { "無効" });
            }
        }
    }

    Ok(())
}

/// 画像がある場合だけモデルを読み込む。読み込み失敗は表示側で固定文になる。
async fn advisor_for(config: &Config, needs_model: bool) -> Result<Advisor> {
    let handle = Arc::new(ClassifierHandle::new());
    if needs_model {
        let _ = handle
            .initialize(|| classifier::load_from_config(config))
            .await;
    }
    Ok(Advisor::new(handle, config.advice_book()?))
}

fn absolute(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}
