//! 程序入口：初始化日志、解析配置，运行单次命令或交互式编辑器

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::SubscriberBuilder;

use site_i18n_admin::api::client::{HttpSiteApi, SiteApi};
use site_i18n_admin::config::{Config, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use site_i18n_admin::model::field_store::{FieldRecord, Lang};
use site_i18n_admin::vm::bridge::*;
use site_i18n_admin::vm::controller::{LoadOutcome, SaveOutcome, SyncController};

#[derive(Parser)]
#[command(name = "site_i18n_admin")]
#[command(about = "站点双语（ru/uz）内容编辑工具")]
struct Cli {
    /// 后端根地址
    #[arg(long, global = true, env = "SITE_ADMIN_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// 请求超时（秒）
    #[arg(long, global = true, env = "SITE_ADMIN_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 交互式编辑（默认）
    Shell,

    /// 列出字段
    List {
        /// 按路径或文本过滤（不区分大小写）
        #[arg(short, long, default_value = "")]
        search: String,

        /// 以JSON输出
        #[arg(long)]
        json: bool,
    },

    /// 修改并立即保存单个字段
    Set {
        path: String,
        /// ru 或 uz
        lang: String,
        value: String,
    },

    /// 导出 `{ i18n: { ru, uz } }` 到文件
    Export {
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志输出（写到 stderr，避免干扰命令输出）
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::new(&cli.api_base, cli.timeout)?;
    tracing::info!("后端地址: {}", config.api_base);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli.command.unwrap_or(Commands::Shell), config))
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let ctrl = SyncController::new(HttpSiteApi::new(&config)?);

    match command {
        Commands::Shell => shell(&ctrl).await,
        Commands::List { search, json } => {
            ctrl.reload().await?;
            let store = ctrl.store();
            if json {
                let rows: BTreeMap<String, FieldRecord> = store
                    .search(&search)
                    .into_iter()
                    .filter_map(|p| store.get(&p).cloned().map(|r| (p, r)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", render_store(&store, &search));
            }
            Ok(())
        }
        Commands::Set { path, lang, value } => {
            ctrl.reload().await?;
            let lang: Lang = lang.parse()?;
            if !ctrl.update_value(&path, lang, &value) {
                bail!("未知路径: {}", path);
            }
            match ctrl.save_field(&path).await {
                SaveOutcome::Saved => println!("已保存 {}:{}", lang, path),
                SaveOutcome::Skipped => println!("{}", STATUS_NO_CHANGES),
                SaveOutcome::Failed(message) => bail!(message),
                SaveOutcome::Discarded => bail!("保存结果已作废"),
            }
            Ok(())
        }
        Commands::Export { output } => {
            ctrl.reload().await?;
            ctrl.export(&output)?;
            println!("已导出到 {}", output.display());
            Ok(())
        }
    }
}

async fn shell<A: SiteApi>(ctrl: &SyncController<A>) -> Result<()> {
    println!("{}", STATUS_LOADING);
    report_reload(ctrl).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("[{}] > ", ctrl.dirty_count());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}{}", STATUS_ERROR_PREFIX, e);
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }
        execute(ctrl, command).await;
    }

    let dirty = ctrl.dirty_count();
    if dirty > 0 {
        tracing::warn!("退出时仍有 {} 个未保存的字段", dirty);
    }
    Ok(())
}

async fn report_reload<A: SiteApi>(ctrl: &SyncController<A>) {
    match ctrl.reload().await {
        Ok(LoadOutcome::Loaded(count)) => println!("已加载 {} 个字段", count),
        Ok(LoadOutcome::Superseded) => {}
        Err(e) => println!("{}{}", STATUS_ERROR_PREFIX, e),
    }
}

async fn execute<A: SiteApi>(ctrl: &SyncController<A>, command: ShellCommand) {
    match command {
        ShellCommand::List(query) => print!("{}", render_store(&ctrl.store(), &query)),
        ShellCommand::Show(path) => match ctrl.field(&path) {
            Some(record) => print!("{}", render_field(&path, &record)),
            None => println!("{}未知路径: {}", STATUS_ERROR_PREFIX, path),
        },
        ShellCommand::Edit { path, lang, text } => {
            if !ctrl.update_value(&path, lang, &text) {
                println!("{}未知路径: {}", STATUS_ERROR_PREFIX, path);
            }
        }
        ShellCommand::Save(path) => match ctrl.save_field(&path).await {
            SaveOutcome::Saved => println!("已保存 {}", path),
            SaveOutcome::Skipped => println!("{}", STATUS_NO_CHANGES),
            SaveOutcome::Failed(message) => println!("{}{}", STATUS_ERROR_PREFIX, message),
            SaveOutcome::Discarded => println!("保存结果已作废"),
        },
        ShellCommand::SaveAll => {
            ctrl.save_all().await;
            println!("{}", ctrl.global_message());
        }
        ShellCommand::Push => {
            // 成功与失败都会写入全局消息
            let _ = ctrl.save_document().await;
            println!("{}", ctrl.global_message());
        }
        ShellCommand::Reload => {
            let dirty = ctrl.dirty_count();
            if dirty > 0 {
                println!("丢弃 {} 个未保存的字段", dirty);
            }
            report_reload(ctrl).await;
        }
        ShellCommand::Import(file) => match ctrl.import_file(Path::new(&file)) {
            Ok((applied, unknown)) => println!("已套用 {} 项草稿，忽略 {} 个未知路径", applied, unknown),
            Err(e) => println!("{}{}", STATUS_ERROR_PREFIX, e),
        },
        ShellCommand::Export(file) => match ctrl.export(Path::new(&file)) {
            Ok(()) => println!("已导出到 {}", file),
            Err(e) => println!("{}{}", STATUS_ERROR_PREFIX, e),
        },
        ShellCommand::Status => {
            println!("变更字段: {}", ctrl.dirty_count());
            if let Some(error) = ctrl.load_error() {
                println!("{}{}", STATUS_ERROR_PREFIX, error);
            }
            let message = ctrl.global_message();
            if !message.is_empty() {
                println!("{}", message);
            }
        }
        ShellCommand::Help => println!("{}", HELP_TEXT),
        ShellCommand::Quit => {}
    }
}
