//! 按类型还原：保存前把编辑文本转换回叶子原本的 JSON 类型

use serde_json::{Number, Value};
use thiserror::Error;

use crate::model::leaf::LeafKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无法将 \"{text}\" 转换为 {kind} 类型")]
pub struct ParseError {
    pub text: String,
    pub kind: LeafKind,
}

/// 将编辑文本按记录的类型转换为 JSON 值。
///
/// - `number`：去掉首尾空白后整体解析为整数或有限浮点数，空串失败
/// - `boolean`：不区分大小写，`true`/`1` 与 `false`/`0`
/// - `null`：空白或 `null` 为 null，其余文本按字符串保留
/// - `string`：原样返回
pub fn parse_typed(text: &str, kind: LeafKind) -> Result<Value, ParseError> {
    let fail = || ParseError {
        text: text.to_string(),
        kind,
    };

    match kind {
        LeafKind::String => Ok(Value::String(text.to_string())),
        LeafKind::Number => parse_number(text.trim()).map(Value::Number).ok_or_else(fail),
        LeafKind::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        LeafKind::Null => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                Ok(Value::Null)
            } else {
                Ok(Value::String(text.to_string()))
            }
        }
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::from(u));
    }
    // NaN / inf 在 JSON 中不可表示，from_f64 返回 None
    s.parse::<f64>().ok().and_then(Number::from_f64)
}
