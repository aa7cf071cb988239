//! 同步控制器：加载、单字段保存、全部保存与整体保存
//!
//! 状态放在 `RefCell`/`Cell` 中，方法只取 `&self`，让界面事件可以在 await 点之间交错；
//! 任何借用都不跨越 await。每次重新加载递增代数，旧代数的保存结果一律丢弃。

use std::cell::{Cell, Ref, RefCell};
use std::path::Path;

use serde::Deserialize;

use crate::api::client::{remote_path, I18nDocument, SiteApi};
use crate::model::error::AdminError;
use crate::model::field_store::{FieldRecord, FieldStore, I18nTrees, Lang, SavedText};
use crate::model::leaf::{flatten, has_escaped_separator, shape_conflict};
use crate::model::serializer::parse_typed;
use crate::utils::fs::{read_json_file, write_json_file};
use crate::vm::bridge::{STATUS_NO_CHANGES, STATUS_SAVE_ALL_BUSY};

/// 重新加载结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// 字段表已按新数据重建，附带字段数
    Loaded(usize),
    /// 期间又发起了新的加载，本次结果已忽略
    Superseded,
}

/// 单字段保存结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 字段不存在或没有改动
    Skipped,
    Saved,
    Failed(String),
    /// 保存期间发生了重新加载，结果已作废
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveAllSummary {
    pub attempted: usize,
    pub saved: usize,
    pub failed: usize,
    pub skipped: usize,
    pub discarded: usize,
}

impl SaveAllSummary {
    pub fn message(&self) -> String {
        if self.attempted == 0 {
            return STATUS_NO_CHANGES.to_string();
        }
        let mut msg = format!("已保存 {} 个变更字段", self.attempted);
        if self.failed > 0 {
            msg.push_str(&format!("（其中 {} 个失败）", self.failed));
        }
        msg
    }
}

/// 导出文件的格式：`{ i18n: { ru, uz } }`
#[derive(Debug, Deserialize)]
struct ExportedDocument {
    #[serde(default)]
    i18n: I18nTrees,
}

pub struct SyncController<A: SiteApi> {
    api: A,
    store: RefCell<FieldStore>,
    /// 最近一次拉取的原始语言树，整体保存时作为回写模板
    template: RefCell<I18nTrees>,
    generation: Cell<u64>,
    is_loading: Cell<bool>,
    is_saving_all: Cell<bool>,
    load_error: RefCell<Option<String>>,
    global_message: RefCell<String>,
}

impl<A: SiteApi> SyncController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            store: RefCell::new(FieldStore::default()),
            template: RefCell::new(I18nTrees::default()),
            generation: Cell::new(0),
            is_loading: Cell::new(false),
            is_saving_all: Cell::new(false),
            load_error: RefCell::new(None),
            global_message: RefCell::new(String::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> Ref<'_, FieldStore> {
        self.store.borrow()
    }

    pub fn field(&self, path: &str) -> Option<FieldRecord> {
        self.store.borrow().get(path).cloned()
    }

    pub fn dirty_count(&self) -> usize {
        self.store.borrow().dirty_count()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    pub fn is_saving_all(&self) -> bool {
        self.is_saving_all.get()
    }

    pub fn load_error(&self) -> Option<String> {
        self.load_error.borrow().clone()
    }

    pub fn global_message(&self) -> String {
        self.global_message.borrow().clone()
    }

    /// 丢弃整个字段表并从后端重建；未保存的草稿随之丢失
    pub async fn reload(&self) -> Result<LoadOutcome, AdminError> {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.is_loading.set(true);
        *self.load_error.borrow_mut() = None;

        let result = self.api.fetch_site().await;

        if self.generation.get() != generation {
            tracing::info!("加载结果已被更新的加载请求取代，忽略");
            return Ok(LoadOutcome::Superseded);
        }
        self.is_loading.set(false);

        match result {
            Ok(trees) => {
                let store = FieldStore::build(&trees);
                let count = store.len();
                *self.store.borrow_mut() = store;
                *self.template.borrow_mut() = trees;
                tracing::info!("站点数据加载成功: {} 个字段", count);
                Ok(LoadOutcome::Loaded(count))
            }
            Err(source) => {
                *self.store.borrow_mut() = FieldStore::default();
                *self.template.borrow_mut() = I18nTrees::default();
                let err = AdminError::Load(source);
                *self.load_error.borrow_mut() = Some(err.to_string());
                tracing::error!("{}", err);
                Err(err)
            }
        }
    }

    /// 修改草稿；路径不存在时返回 false
    pub fn update_value(&self, path: &str, lang: Lang, text: &str) -> bool {
        self.store.borrow_mut().update(path, lang, text)
    }

    /// 先完成所有改动语言的类型还原，再逐个语言发送
    async fn persist(&self, path: &str, record: &FieldRecord) -> Result<SavedText, AdminError> {
        let mut pending = Vec::with_capacity(Lang::ALL.len());
        for lang in Lang::ALL {
            if !record.lang_dirty(lang) {
                continue;
            }
            if has_escaped_separator(path) {
                return Err(AdminError::UnaddressablePath(path.to_string()));
            }
            if !record.present(lang) && shape_conflict(self.template.borrow().tree(lang), path) {
                return Err(AdminError::ShapeConflict {
                    lang,
                    path: path.to_string(),
                });
            }
            let value = parse_typed(record.text(lang), record.kind(lang)).map_err(|source| {
                AdminError::FieldParse {
                    lang,
                    path: path.to_string(),
                    source,
                }
            })?;
            pending.push((lang, value));
        }

        for (lang, value) in pending {
            self.api
                .patch_leaf(&remote_path(lang, path), &value)
                .await
                .map_err(|source| AdminError::Save {
                    lang,
                    path: path.to_string(),
                    source,
                })?;
            tracing::debug!("已发送 {}:{} = {}", lang, path, value);
        }

        Ok(SavedText {
            ru: record.ru.clone(),
            uz: record.uz.clone(),
        })
    }

    /// 保存单个字段；失败只记录在该字段上
    pub async fn save_field(&self, path: &str) -> SaveOutcome {
        let record = match self.store.borrow().get(path) {
            Some(r) if r.is_dirty() => r.clone(),
            _ => return SaveOutcome::Skipped,
        };
        let generation = self.generation.get();
        self.store.borrow_mut().mark_saving(path);

        let result = self.persist(path, &record).await;

        if self.generation.get() != generation {
            tracing::warn!("字段 {} 的保存结果在重新加载后到达，已丢弃", path);
            return SaveOutcome::Discarded;
        }

        match result {
            Ok(sent) => {
                self.store.borrow_mut().mark_saved(path, sent);
                tracing::info!("字段保存成功: {}", path);
                SaveOutcome::Saved
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("字段保存失败: {}", message);
                self.store.borrow_mut().mark_failed(path, message.clone());
                SaveOutcome::Failed(message)
            }
        }
    }

    /// 按字典序逐个保存当前所有脏字段，单个失败不会中断批次
    pub async fn save_all(&self) -> SaveAllSummary {
        if self.is_saving_all.get() {
            tracing::warn!("{}", STATUS_SAVE_ALL_BUSY);
            return SaveAllSummary::default();
        }
        self.is_saving_all.set(true);
        self.global_message.borrow_mut().clear();

        let dirty = self.store.borrow().dirty_paths();
        let mut summary = SaveAllSummary {
            attempted: dirty.len(),
            ..SaveAllSummary::default()
        };
        tracing::info!("开始保存全部变更: {} 个字段", dirty.len());

        for path in &dirty {
            match self.save_field(path).await {
                SaveOutcome::Saved => summary.saved += 1,
                SaveOutcome::Failed(_) => summary.failed += 1,
                SaveOutcome::Skipped => summary.skipped += 1,
                SaveOutcome::Discarded => summary.discarded += 1,
            }
        }

        *self.global_message.borrow_mut() = summary.message();
        self.is_saving_all.set(false);
        tracing::info!("全部保存完成: {:?}", summary);
        summary
    }

    /// 用当前草稿重建两棵语言树
    pub fn build_trees(&self) -> Result<I18nTrees, AdminError> {
        let template = self.template.borrow();
        self.store.borrow().to_trees(&template)
    }

    /// 整体保存（`PUT /site`）：任一语言有空白文本时拒绝
    pub async fn save_document(&self) -> Result<usize, AdminError> {
        let result = self.publish().await;
        let message = match &result {
            Ok(count) => format!("已整体保存 {} 个字段", count),
            Err(e) => e.to_string(),
        };
        *self.global_message.borrow_mut() = message;
        result
    }

    async fn publish(&self) -> Result<usize, AdminError> {
        let snapshot = self.store.borrow().clone();
        let empty = snapshot.empty_string_fields();
        if !empty.is_empty() {
            return Err(AdminError::EmptyFields(empty));
        }
        let trees = {
            let template = self.template.borrow();
            snapshot.to_trees(&template)?
        };
        let generation = self.generation.get();

        self.api
            .put_document(&trees)
            .await
            .map_err(AdminError::Publish)?;

        if self.generation.get() != generation {
            tracing::warn!("整体保存的结果在重新加载后到达，不更新本地基线");
            return Ok(snapshot.len());
        }
        self.store.borrow_mut().mark_all_saved(&snapshot);
        *self.template.borrow_mut() = trees;
        tracing::info!("整体保存成功: {} 个字段", snapshot.len());
        Ok(snapshot.len())
    }

    /// 把文件中的语言树作为草稿套用到已有路径上，返回 (套用数, 忽略的未知路径数)
    pub fn import_drafts(&self, trees: &I18nTrees) -> (usize, usize) {
        let mut applied = 0;
        let mut unknown = 0;
        let mut store = self.store.borrow_mut();
        for lang in Lang::ALL {
            for (path, leaf) in flatten(trees.tree(lang)) {
                let current = store.get(&path).map(|r| r.text(lang) == leaf.text);
                match current {
                    None => unknown += 1,
                    Some(true) => {}
                    Some(false) => {
                        store.update(&path, lang, &leaf.text);
                        applied += 1;
                    }
                }
            }
        }
        tracing::info!("导入草稿: 套用 {} 项, 忽略 {} 个未知路径", applied, unknown);
        (applied, unknown)
    }

    pub fn import_file(&self, path: &Path) -> Result<(usize, usize), AdminError> {
        let doc: ExportedDocument = read_json_file(path)?;
        Ok(self.import_drafts(&doc.i18n))
    }

    /// 导出当前草稿为 `{ i18n: { ru, uz } }` 文件
    pub fn export(&self, path: &Path) -> Result<(), AdminError> {
        let trees = self.build_trees()?;
        write_json_file(path, &I18nDocument { i18n: &trees })
    }
}
