//! VM桥接层：命令行界面与同步控制器之间的文本协议
//!
//! 包含状态文案常量、交互命令解析与字段表的文本渲染

use crate::model::field_store::{group_by_first_segment, FieldRecord, FieldStatus, FieldStore, Lang};

// === 常量定义（消除魔法值） ===
pub const STATUS_LOADING: &str = "正在加载站点数据...";
pub const STATUS_NO_CHANGES: &str = "没有需要保存的变更";
pub const STATUS_SAVE_ALL_BUSY: &str = "全部保存正在进行中";
pub const STATUS_NO_FIELDS: &str = "没有找到字段";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";

pub const HELP_TEXT: &str = "\
命令:
  list [关键字]              按分组列出字段（可按路径/文本过滤）
  show <路径>                查看单个字段
  edit <路径> <ru|uz> <文本>  修改草稿
  save <路径>                保存单个字段
  save-all                   逐个保存全部变更
  push                       整体保存（PUT /site）
  reload                     重新加载（丢弃未保存的草稿）
  import <文件>              从文件套用草稿
  export <文件>              导出当前草稿
  status                     查看变更数量与全局消息
  help                       显示帮助
  quit                       退出";

/// 交互命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List(String),
    Show(String),
    Edit { path: String, lang: Lang, text: String },
    Save(String),
    SaveAll,
    Push,
    Reload,
    Import(String),
    Export(String),
    Status,
    Help,
    Quit,
}

/// 解析一行输入；空行返回 Ok(None)
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };

    let require = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("{} 需要参数: {}", verb, what))
        } else {
            Ok(rest.to_string())
        }
    };

    let cmd = match verb {
        "list" | "ls" => ShellCommand::List(rest.to_string()),
        "show" => ShellCommand::Show(require("<路径>")?),
        "edit" => {
            // 文本部分原样保留（包括内部空格）
            let mut parts = rest.splitn(3, ' ');
            let path = parts.next().filter(|s| !s.is_empty());
            let lang = parts.next();
            let text = parts.next().unwrap_or("");
            match (path, lang) {
                (Some(path), Some(lang)) => ShellCommand::Edit {
                    path: path.to_string(),
                    lang: lang.parse().map_err(|e: crate::model::error::AdminError| e.to_string())?,
                    text: unescape_text(text),
                },
                _ => return Err("用法: edit <路径> <ru|uz> <文本>".to_string()),
            }
        }
        "save" => ShellCommand::Save(require("<路径>")?),
        "save-all" => ShellCommand::SaveAll,
        "push" => ShellCommand::Push,
        "reload" => ShellCommand::Reload,
        "import" => ShellCommand::Import(require("<文件>")?),
        "export" => ShellCommand::Export(require("<文件>")?),
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("未知命令: {}（输入 help 查看帮助）", other)),
    };
    Ok(Some(cmd))
}

/// 命令行中用 `\n` 输入换行
fn unescape_text(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn status_label(record: &FieldRecord) -> &'static str {
    match record.status {
        FieldStatus::Idle if record.is_dirty() => "*",
        FieldStatus::Idle => " ",
        FieldStatus::Saving => "…",
        FieldStatus::Saved => "✓",
        FieldStatus::Error => "!",
    }
}

/// 渲染单个字段（多行）
pub fn render_field(path: &str, record: &FieldRecord) -> String {
    let mut out = format!("[{}] {}\n", status_label(record), path);
    for lang in Lang::ALL {
        out.push_str(&format!(
            "    {} ({}): {}\n",
            lang.as_str().to_uppercase(),
            record.kind(lang),
            record.text(lang).replace('\n', "\\n")
        ));
    }
    if !record.error.is_empty() {
        out.push_str(&format!("    {}{}\n", STATUS_ERROR_PREFIX, record.error));
    }
    out
}

/// 按第一段分组渲染过滤后的字段表
pub fn render_store(store: &FieldStore, query: &str) -> String {
    let paths = store.search(query);
    if paths.is_empty() {
        return format!("{}\n", STATUS_NO_FIELDS);
    }
    let mut out = String::new();
    for (group, members) in group_by_first_segment(&paths) {
        out.push_str(&format!("== {} ({})\n", group, members.len()));
        for path in &members {
            if let Some(record) = store.get(path) {
                out.push_str(&render_field(path, record));
            }
        }
    }
    out
}
