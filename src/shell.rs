//! 対話モード
//!
//! 起動時にモデル読み込みをバックグラウンドで開始し、読み込み中の要求には
//! 「準備中」の固定文を返す。セッション中に再読み込みはしない。

use crate::classifier::{self, ClassifierHandle};
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::Advisor;
use crate::presenter;
use dialoguer::Input;
use farm_assist_common::{
    finance_text, ivr_reply, parse_temperature, price_text, schemes_text, sms_reply,
    AdviceContext,
};
use std::path::PathBuf;
use std::sync::Arc;

const HELP: &str = "\
commands:
  weather <image|temperature>   sky image or temperature (°C)
  soil <image>                  soil image
  pest <image>                  leaf / pest image
  price <crop>                  expected market price
  schemes | finance             government schemes / loans
  sms <query>                   SMS reply (e.g. recommend crop temp=25)
  ivr <1-3>                     IVR reply
  status                        model status
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Weather {
        image: Option<PathBuf>,
        temperature: Option<String>,
    },
    Soil(Option<PathBuf>),
    Pest(Option<PathBuf>),
    Price(String),
    Schemes,
    Finance,
    Sms(String),
    Ivr(String),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// 1行を解釈
pub fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    let path_arg = || (!rest.is_empty()).then(|| PathBuf::from(rest));

    match head.to_lowercase().as_str() {
        "" => ShellCommand::Empty,
        "weather" => {
            if parse_temperature(rest).is_some() {
                ShellCommand::Weather {
                    image: None,
                    temperature: Some(rest.to_string()),
                }
            } else {
                ShellCommand::Weather {
                    image: path_arg(),
                    temperature: None,
                }
            }
        }
        "soil" => ShellCommand::Soil(path_arg()),
        "pest" => ShellCommand::Pest(path_arg()),
        "price" => ShellCommand::Price(rest.to_string()),
        "schemes" | "scheme" => ShellCommand::Schemes,
        "finance" => ShellCommand::Finance,
        "sms" => ShellCommand::Sms(rest.to_string()),
        "ivr" => ShellCommand::Ivr(rest.to_string()),
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(head.to_string()),
    }
}

pub async fn run(config: Config) -> Result<()> {
    let book = config.advice_book()?;
    let handle = Arc::new(ClassifierHandle::new());

    // ページ読み込み時と同じく、起動直後に一度だけ読み込みを開始
    let loader = Arc::clone(&handle);
    let load_config = config.clone();
    tokio::spawn(async move {
        let _ = loader
            .initialize(|| classifier::load_from_config(&load_config))
            .await;
    });

    let advisor = Advisor::new(handle, book);
    println!("🌾 farm-assist shell  (help で一覧、quit で終了)\n");

    loop {
        let line = tokio::task::block_in_place(|| {
            Input::<String>::new()
                .with_prompt("farm-assist")
                .allow_empty(true)
                .interact_text()
        });
        let line = match line {
            Ok(l) => l,
            // 入力終端
            Err(_) => break,
        };

        let reply = match parse_line(&line) {
            ShellCommand::Empty => continue,
            ShellCommand::Quit => break,
            ShellCommand::Help => HELP.to_string(),
            ShellCommand::Status => format!("model: {}", advisor.handle().status()),
            ShellCommand::Weather { image, temperature } => presenter::render(
                AdviceContext::Weather,
                advisor.weather(image.as_deref(), temperature.as_deref()).await,
            ),
            ShellCommand::Soil(image) => {
                presenter::render(AdviceContext::Soil, advisor.soil(image.as_deref()).await)
            }
            ShellCommand::Pest(image) => {
                presenter::render(AdviceContext::Pest, advisor.pest(image.as_deref()).await)
            }
            ShellCommand::Price(crop) => price_text(&crop),
            ShellCommand::Schemes => schemes_text(),
            ShellCommand::Finance => finance_text(),
            ShellCommand::Sms(query) => sms_reply(&query),
            ShellCommand::Ivr(option) => ivr_reply(&option).to_string(),
            ShellCommand::Unknown(cmd) => format!("unknown command: {} (try help)", cmd),
        };
        println!("{}\n", reply);
    }

    Ok(())
}
