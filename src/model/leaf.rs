//! 叶子展平（Leaf Flatten）：把嵌套 JSON 展开为 “路径 → 叶子值” 的平面表，并支持按路径回写
//!
//! 路径规则：对象键以 `parent.key` 拼接，数组元素以 `parent.index` 拼接。
//! 键名中出现的 `.` 与 `\` 分别转义为 `\.` 与 `\\`，保证路径唯一。

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// 路径分隔符
pub const PATH_SEPARATOR: char = '.';
const ESCAPE: char = '\\';

/// 叶子节点的原始 JSON 类型（用于保存时还原）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafKind {
    String,
    Number,
    Boolean,
    Null,
}

impl LeafKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeafKind::String => "string",
            LeafKind::Number => "number",
            LeafKind::Boolean => "boolean",
            LeafKind::Null => "null",
        }
    }
}

impl std::fmt::Display for LeafKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 值分类结果：叶子（带类型）或容器（对象/数组，本身不是叶子）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Leaf(LeafKind),
    Container,
}

/// 平面表中的一个叶子：类型 + 可编辑文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafValue {
    pub kind: LeafKind,
    pub text: String,
}

/// 判断 JSON 值的类别
pub fn classify(v: &Value) -> ValueClass {
    match v {
        Value::Object(_) | Value::Array(_) => ValueClass::Container,
        Value::String(_) => ValueClass::Leaf(LeafKind::String),
        Value::Number(_) => ValueClass::Leaf(LeafKind::Number),
        Value::Bool(_) => ValueClass::Leaf(LeafKind::Boolean),
        Value::Null => ValueClass::Leaf(LeafKind::Null),
    }
}

/// 叶子值的规范文本形式；容器返回 None
pub fn leaf_of(v: &Value) -> Option<LeafValue> {
    let text = match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // null 的可编辑文本为空串
        Value::Null => String::new(),
        Value::Object(_) | Value::Array(_) => return None,
    };
    let ValueClass::Leaf(kind) = classify(v) else {
        return None;
    };
    Some(LeafValue { kind, text })
}

/// 转义单个对象键，使其可以安全拼入路径
pub fn escape_segment(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if c == PATH_SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// 将路径拆分为未转义的段
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => {
                // 末尾孤立的反斜杠按字面保留
                current.push(chars.next().unwrap_or(ESCAPE));
            }
            PATH_SEPARATOR => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// 路径中是否有某一段本身含 `.`（服务端按点号寻址时无法表达）
pub fn has_escaped_separator(path: &str) -> bool {
    split_path(path).iter().any(|s| s.contains(PATH_SEPARATOR))
}

fn join(parent: Option<&str>, segment: &str) -> String {
    match parent {
        Some(parent) => format!("{}{}{}", parent, PATH_SEPARATOR, segment),
        None => segment.to_string(),
    }
}

/// 展平容器；根为非容器时返回空表
///
/// 根节点本身没有路径，空键名同样占一级：`{"": {"x": 1}}` 的叶子路径是 `.x`
pub fn flatten(root: &Value) -> BTreeMap<String, LeafValue> {
    fn walk(out: &mut BTreeMap<String, LeafValue>, v: &Value, path: Option<&str>) {
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    walk(out, child, Some(&join(path, &escape_segment(k))));
                }
            }
            Value::Array(arr) => {
                for (idx, child) in arr.iter().enumerate() {
                    walk(out, child, Some(&join(path, &idx.to_string())));
                }
            }
            leaf => {
                if let (Some(path), Some(lv)) = (path, leaf_of(leaf)) {
                    out.insert(path.to_string(), lv);
                }
            }
        }
    }

    let mut out = BTreeMap::new();
    if classify(root) == ValueClass::Container {
        walk(&mut out, root, None);
    }
    out
}

/// 规范十进制下标（无前导零）
fn as_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || (segment.len() > 1 && segment.starts_with('0')) {
        return None;
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn empty_container_for(next: &str) -> Value {
    if as_index(next).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// 按路径把值写入文档：沿用已有结构，缺失的中间容器按下一段是否为下标自动创建。
/// 叶子或类型不符的中间节点会被替换。
pub fn write_leaf(root: &mut Value, path: &str, value: Value) {
    let segments = split_path(path);
    let mut slot = root;
    for (i, seg) in segments.iter().enumerate() {
        let next = segments.get(i + 1).map(String::as_str);
        slot = child_slot(slot, seg, next);
    }
    *slot = value;
}

fn child_slot<'a>(parent: &'a mut Value, seg: &str, next: Option<&str>) -> &'a mut Value {
    let index = as_index(seg);
    // 数组只接受下标段，其余情况一律按对象处理
    let keep_array = parent.is_array() && index.is_some();
    if !keep_array && !parent.is_object() {
        *parent = Value::Object(Map::new());
    }

    let slot = match parent {
        Value::Array(arr) => {
            let idx = index.unwrap_or(arr.len());
            while arr.len() <= idx {
                arr.push(Value::Null);
            }
            &mut arr[idx]
        }
        Value::Object(map) => map.entry(seg.to_string()).or_insert(Value::Null),
        _ => unreachable!("父节点已被规范为容器"),
    };
    if let Some(next) = next {
        if !is_container(slot) {
            *slot = empty_container_for(next);
        }
    }
    slot
}

fn is_container(v: &Value) -> bool {
    classify(v) == ValueClass::Container
}

/// 按路径写入是否会让叶子与容器互相覆盖：
/// 途经的节点是叶子、数组遇到非下标段，或目标位置已经是容器
pub fn shape_conflict(root: &Value, path: &str) -> bool {
    let mut node = root;
    for seg in split_path(path) {
        let child = match node {
            Value::Object(map) => map.get(&seg),
            Value::Array(arr) => match as_index(&seg) {
                Some(idx) => arr.get(idx),
                None => return true,
            },
            _ => return true,
        };
        match child {
            Some(child) => node = child,
            None => return false,
        }
    }
    is_container(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::serializer::parse_typed;
    use serde_json::json;

    type Entries = Vec<(Vec<String>, Value)>;

    /// 从平面表重建文档：某一层的段恰好是 `0..n` 时重建为数组，否则为对象
    fn unflatten(flat: &BTreeMap<String, LeafValue>) -> Value {
        let entries = flat
            .iter()
            .map(|(path, leaf)| (split_path(path), parse_typed(&leaf.text, leaf.kind).unwrap()))
            .collect();
        build(entries)
    }

    fn build(entries: Entries) -> Value {
        let mut children: BTreeMap<String, Entries> = BTreeMap::new();
        for (mut segments, value) in entries {
            let rest = segments.split_off(1);
            children.entry(segments.remove(0)).or_default().push((rest, value));
        }
        let node = |mut group: Entries| {
            if group.len() == 1 && group[0].0.is_empty() {
                group.remove(0).1
            } else {
                build(group)
            }
        };

        let is_array = !children.is_empty()
            && (0..children.len()).all(|i| children.contains_key(&i.to_string()));
        if is_array {
            (0..children.len())
                .map(|i| node(children.remove(&i.to_string()).unwrap()))
                .collect()
        } else {
            Value::Object(children.into_iter().map(|(k, group)| (k, node(group))).collect())
        }
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(classify(&json!("x")), ValueClass::Leaf(LeafKind::String));
        assert_eq!(classify(&json!(1.5)), ValueClass::Leaf(LeafKind::Number));
        assert_eq!(classify(&json!(false)), ValueClass::Leaf(LeafKind::Boolean));
        assert_eq!(classify(&json!(null)), ValueClass::Leaf(LeafKind::Null));
        assert_eq!(classify(&json!({})), ValueClass::Container);
        assert_eq!(classify(&json!([])), ValueClass::Container);
    }

    #[test]
    fn test_null_leaf_has_empty_text() {
        let leaf = leaf_of(&json!(null)).unwrap();
        assert_eq!(leaf.kind, LeafKind::Null);
        assert_eq!(leaf.text, "");
        assert!(leaf_of(&json!({"a": 1})).is_none());
    }

    #[test]
    fn test_flatten_mixed_document() {
        let flat = flatten(&json!({"a": {"b": "x"}, "c": [1, 2]}));

        assert_eq!(flat.len(), 3, "应该恰好有3个叶子");
        assert_eq!(flat["a.b"], LeafValue { kind: LeafKind::String, text: "x".into() });
        assert_eq!(flat["c.0"], LeafValue { kind: LeafKind::Number, text: "1".into() });
        assert_eq!(flat["c.1"], LeafValue { kind: LeafKind::Number, text: "2".into() });
    }

    #[test]
    fn test_flatten_nested_arrays_and_bools() {
        let flat = flatten(&json!({
            "menu": [{"title": "Главная", "visible": true}, ["a", null]]
        }));

        let paths: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["menu.0.title", "menu.0.visible", "menu.1.0", "menu.1.1"]);
        assert_eq!(flat["menu.0.visible"].kind, LeafKind::Boolean);
        assert_eq!(flat["menu.0.visible"].text, "true");
        assert_eq!(flat["menu.1.1"].kind, LeafKind::Null);
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let doc = json!({"hero": {"title": "Salom", "count": 3}, "list": ["x"]});
        assert_eq!(flatten(&doc), flatten(&doc));
    }

    #[test]
    fn test_flatten_non_container_root_is_empty() {
        assert!(flatten(&json!("plain")).is_empty());
        assert!(flatten(&Value::Null).is_empty());
    }

    #[test]
    fn test_keys_with_dots_are_escaped() {
        let flat = flatten(&json!({"key.with.dots": {"inner": "v"}, "back\\slash": "w"}));

        assert!(flat.contains_key("key\\.with\\.dots.inner"));
        assert!(flat.contains_key("back\\\\slash"));
        assert_eq!(split_path("key\\.with\\.dots.inner"), vec!["key.with.dots", "inner"]);
        assert_eq!(split_path("back\\\\slash"), vec!["back\\slash"]);
        assert!(has_escaped_separator("key\\.with\\.dots.inner"));
        assert!(!has_escaped_separator("back\\\\slash"));
    }

    #[test]
    fn test_round_trip_reconstructs_original() {
        let doc = json!({
            "hero": {"title": "Сайт", "subtitle": "", "rating": 4.5, "flag": false, "none": null},
            "items": [{"name": "a"}, {"name": "b"}, "c", 7, 8, 9, 10, 11, 12, 13, 14],
            "odd.key": "dot"
        });

        assert_eq!(unflatten(&flatten(&doc)), doc);
    }

    #[test]
    fn test_round_trip_array_root_and_numeric_keys() {
        let list = json!(["a", "b", {"c": [true, null]}]);
        assert_eq!(unflatten(&flatten(&list)), list);

        let numbered = json!({"nav": {"0": "zero", "b": "bee"}});
        assert_eq!(unflatten(&flatten(&numbered)), numbered);
    }

    #[test]
    fn test_empty_key_keeps_its_level() {
        let doc = json!({"": {"x": "inner", "": "deep"}, "x": "outer"});
        let flat = flatten(&doc);

        let paths: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(paths, vec![".", ".x", "x"]);
        assert_eq!(flat[".x"].text, "inner");
        assert_eq!(flat["x"].text, "outer");
        assert_eq!(split_path("."), vec!["", ""]);
        assert_eq!(unflatten(&flat), doc);

        let leaf_at_empty_key = flatten(&json!({"": "v"}));
        assert_eq!(leaf_at_empty_key[""].text, "v");
    }

    #[test]
    fn test_shape_conflict() {
        let doc = json!({"a": "text", "b": {"c": "x"}, "list": ["q"]});

        assert!(shape_conflict(&doc, "a.b"), "叶子下面不能再写子节点");
        assert!(shape_conflict(&doc, "b"), "容器不能被叶子覆盖");
        assert!(shape_conflict(&doc, "list.name"), "数组只接受下标");
        assert!(!shape_conflict(&doc, "a"));
        assert!(!shape_conflict(&doc, "b.d.e"));
        assert!(!shape_conflict(&doc, "list.3"));
        assert!(!shape_conflict(&doc, "fresh.0"));
    }

    #[test]
    fn test_write_leaf_keeps_existing_structure() {
        let mut doc = json!({"nav": {"0": "object key"}, "list": ["a", "b"]});

        write_leaf(&mut doc, "nav.0", json!("changed"));
        write_leaf(&mut doc, "list.1", json!("B"));
        write_leaf(&mut doc, "fresh.0.title", json!("new"));

        assert_eq!(doc["nav"], json!({"0": "changed"}), "已有对象不应被改成数组");
        assert_eq!(doc["list"], json!(["a", "B"]));
        assert_eq!(doc["fresh"], json!([{"title": "new"}]));
    }
}
