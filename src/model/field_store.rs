//! FieldStore：双语字段表的编辑草稿、已保存基线与脏状态

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::error::AdminError;
use crate::model::leaf::{flatten, shape_conflict, split_path, write_leaf, LeafKind, LeafValue};
use crate::model::serializer::parse_typed;

/// 站点支持的语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ru,
    Uz,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::Ru, Lang::Uz];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Ru => "ru",
            Lang::Uz => "uz",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" => Ok(Lang::Ru),
            "uz" => Ok(Lang::Uz),
            other => Err(AdminError::State(format!("未知语言: {}", other))),
        }
    }
}

/// 单个字段的保存状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// 最近一次确认持久化的文本
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SavedText {
    pub ru: String,
    pub uz: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRecord {
    pub ru: String,
    pub uz: String,
    pub ru_kind: LeafKind,
    pub uz_kind: LeafKind,
    /// 该语言的内容树中是否真的有这个叶子
    pub ru_present: bool,
    pub uz_present: bool,
    pub saved: SavedText,
    pub status: FieldStatus,
    pub error: String,
}

impl FieldRecord {
    fn from_leaves(ru: Option<&LeafValue>, uz: Option<&LeafValue>) -> Self {
        // 某语言缺失该路径时按空字符串处理
        let split = |leaf: Option<&LeafValue>| match leaf {
            Some(l) => (l.text.clone(), l.kind, true),
            None => (String::new(), LeafKind::String, false),
        };
        let (ru, ru_kind, ru_present) = split(ru);
        let (uz, uz_kind, uz_present) = split(uz);
        Self {
            saved: SavedText {
                ru: ru.clone(),
                uz: uz.clone(),
            },
            ru,
            uz,
            ru_kind,
            uz_kind,
            ru_present,
            uz_present,
            status: FieldStatus::Idle,
            error: String::new(),
        }
    }

    pub fn text(&self, lang: Lang) -> &str {
        match lang {
            Lang::Ru => &self.ru,
            Lang::Uz => &self.uz,
        }
    }

    pub fn kind(&self, lang: Lang) -> LeafKind {
        match lang {
            Lang::Ru => self.ru_kind,
            Lang::Uz => self.uz_kind,
        }
    }

    pub fn present(&self, lang: Lang) -> bool {
        match lang {
            Lang::Ru => self.ru_present,
            Lang::Uz => self.uz_present,
        }
    }

    pub fn saved_text(&self, lang: Lang) -> &str {
        match lang {
            Lang::Ru => &self.saved.ru,
            Lang::Uz => &self.saved.uz,
        }
    }

    /// 该语言的草稿是否不同于已保存值
    pub fn lang_dirty(&self, lang: Lang) -> bool {
        self.text(lang) != self.saved_text(lang)
    }

    pub fn is_dirty(&self) -> bool {
        self.ru != self.saved.ru || self.uz != self.saved.uz
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// 两种语言各自的内容树（`site.i18n`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct I18nTrees {
    #[serde(default = "empty_object")]
    pub ru: Value,
    #[serde(default = "empty_object")]
    pub uz: Value,
}

impl Default for I18nTrees {
    fn default() -> Self {
        Self {
            ru: empty_object(),
            uz: empty_object(),
        }
    }
}

impl I18nTrees {
    pub fn tree(&self, lang: Lang) -> &Value {
        match lang {
            Lang::Ru => &self.ru,
            Lang::Uz => &self.uz,
        }
    }

    fn tree_mut(&mut self, lang: Lang) -> &mut Value {
        match lang {
            Lang::Ru => &mut self.ru,
            Lang::Uz => &mut self.uz,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStore {
    fields: BTreeMap<String, FieldRecord>,
}

impl FieldStore {
    /// 分别展平两棵语言树，按路径并集构建字段表
    pub fn build(trees: &I18nTrees) -> Self {
        let ru_flat = flatten(&trees.ru);
        let uz_flat = flatten(&trees.uz);

        let mut fields = BTreeMap::new();
        for path in ru_flat.keys().chain(uz_flat.keys()) {
            if fields.contains_key(path) {
                continue;
            }
            let record = FieldRecord::from_leaves(ru_flat.get(path), uz_flat.get(path));
            fields.insert(path.clone(), record);
        }
        tracing::debug!("字段表构建完成: ru {} 个叶子, uz {} 个叶子, 合计 {} 个路径",
            ru_flat.len(), uz_flat.len(), fields.len());
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FieldRecord> {
        self.fields.get(path)
    }

    /// 按字典序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldRecord)> {
        self.fields.iter()
    }

    pub fn paths(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// 修改某语言的草稿；路径不存在时不做任何事并返回 false
    pub fn update(&mut self, path: &str, lang: Lang, text: &str) -> bool {
        let Some(record) = self.fields.get_mut(path) else {
            return false;
        };
        match lang {
            Lang::Ru => record.ru = text.to_string(),
            Lang::Uz => record.uz = text.to_string(),
        }
        record.status = FieldStatus::Idle;
        record.error.clear();
        true
    }

    pub fn dirty_count(&self) -> usize {
        self.fields.values().filter(|r| r.is_dirty()).count()
    }

    pub fn dirty_paths(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, r)| r.is_dirty())
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn mark_saving(&mut self, path: &str) {
        if let Some(record) = self.fields.get_mut(path) {
            record.status = FieldStatus::Saving;
            record.error.clear();
        }
    }

    /// 推进已保存基线为实际发送的文本；保存期间又被编辑的字段回到 idle
    pub fn mark_saved(&mut self, path: &str, sent: SavedText) {
        if let Some(record) = self.fields.get_mut(path) {
            // 与旧基线不同的语言已经写到服务端
            record.ru_present |= sent.ru != record.saved.ru;
            record.uz_present |= sent.uz != record.saved.uz;
            record.saved = sent;
            record.status = if record.is_dirty() {
                FieldStatus::Idle
            } else {
                FieldStatus::Saved
            };
            record.error.clear();
        }
    }

    pub fn mark_failed(&mut self, path: &str, message: String) {
        if let Some(record) = self.fields.get_mut(path) {
            record.status = FieldStatus::Error;
            record.error = message;
        }
    }

    /// 大小写不敏感地匹配路径或任一语言的文本；空查询返回全部
    pub fn search(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return self.paths();
        }
        let normalized = query.to_lowercase();
        self.fields
            .iter()
            .filter(|(path, r)| {
                path.to_lowercase().contains(&normalized)
                    || r.ru.to_lowercase().contains(&normalized)
                    || r.uz.to_lowercase().contains(&normalized)
            })
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// 任一语言中为空白的字符串字段，形如 `ru:hero.title`
    pub fn empty_string_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (path, record) in &self.fields {
            for lang in Lang::ALL {
                if record.kind(lang) == LeafKind::String && record.text(lang).trim().is_empty() {
                    out.push(format!("{}:{}", lang, path));
                }
            }
        }
        out
    }

    /// 按当前草稿重建两棵语言树，写在给定模板之上以保留未展平的结构。
    ///
    /// 某语言原本没有且未编辑过的路径不写入；会让叶子与容器互相覆盖的写入直接拒绝
    pub fn to_trees(&self, template: &I18nTrees) -> Result<I18nTrees, AdminError> {
        let mut trees = template.clone();
        for (path, record) in &self.fields {
            for lang in Lang::ALL {
                if !record.present(lang) && !record.lang_dirty(lang) {
                    continue;
                }
                let value = parse_typed(record.text(lang), record.kind(lang)).map_err(|source| {
                    AdminError::FieldParse {
                        lang,
                        path: path.clone(),
                        source,
                    }
                })?;
                let tree = trees.tree_mut(lang);
                if shape_conflict(tree, path) {
                    return Err(AdminError::ShapeConflict {
                        lang,
                        path: path.clone(),
                    });
                }
                write_leaf(tree, path, value);
            }
        }
        Ok(trees)
    }

    /// 整体保存成功后，所有字段的基线推进为发送时的草稿
    pub fn mark_all_saved(&mut self, sent: &FieldStore) {
        for (path, snapshot) in &sent.fields {
            self.mark_saved(
                path,
                SavedText {
                    ru: snapshot.ru.clone(),
                    uz: snapshot.uz.clone(),
                },
            );
        }
    }
}

/// 按路径第一段分组，组名排序；第一段为空时归入 `other`
pub fn group_by_first_segment(paths: &[String]) -> Vec<(String, Vec<String>)> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths {
        let first = split_path(path).into_iter().next().unwrap_or_default();
        let name = if first.is_empty() { "other".to_string() } else { first };
        grouped.entry(name).or_default().push(path.clone());
    }
    grouped.into_iter().collect()
}
