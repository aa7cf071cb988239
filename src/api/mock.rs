//! 测试用内存后端：记录调用、按路径注入失败、可在 GET/PATCH 中途挂起

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use tokio::sync::Notify;

use crate::api::client::{ApiError, SiteApi};
use crate::model::field_store::I18nTrees;

/// 挂起点：进入时通知 `entered`，等待 `release` 后继续
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct MockSiteApi {
    /// 依次返回的 GET 结果；只剩一个时重复返回
    pub documents: RefCell<VecDeque<I18nTrees>>,
    pub fail_fetch: Cell<bool>,
    pub fail_patch_paths: RefCell<HashSet<String>>,
    pub fail_put: Cell<bool>,
    pub patches: RefCell<Vec<(String, Value)>>,
    pub puts: RefCell<Vec<I18nTrees>>,
    pub fetches: Cell<usize>,
    /// 每次 PATCH 都会挂起
    pub patch_gate: Option<Rc<Gate>>,
    /// 只挂起下一次 GET
    pub fetch_gate: RefCell<Option<Rc<Gate>>>,
}

impl MockSiteApi {
    pub fn with_documents(docs: Vec<I18nTrees>) -> Self {
        Self {
            documents: RefCell::new(docs.into()),
            ..Self::default()
        }
    }

    pub fn fail_patch(&self, remote_path: &str) {
        self.fail_patch_paths.borrow_mut().insert(remote_path.to_string());
    }

    pub fn patched_paths(&self) -> Vec<String> {
        self.patches.borrow().iter().map(|(p, _)| p.clone()).collect()
    }

    fn status(method: &'static str, status: u16) -> ApiError {
        ApiError::Status {
            method,
            path: "/site".into(),
            status,
        }
    }
}

impl SiteApi for MockSiteApi {
    async fn fetch_site(&self) -> Result<I18nTrees, ApiError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.fail_fetch.get() {
            return Err(Self::status("GET", 503));
        }
        let doc = {
            let mut docs = self.documents.borrow_mut();
            if docs.len() > 1 {
                docs.pop_front().unwrap_or_default()
            } else {
                docs.front().cloned().unwrap_or_default()
            }
        };
        let gate = self.fetch_gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(doc)
    }

    async fn patch_leaf(&self, path: &str, value: &Value) -> Result<(), ApiError> {
        if let Some(gate) = &self.patch_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_patch_paths.borrow().contains(path) {
            return Err(Self::status("PATCH", 500));
        }
        self.patches.borrow_mut().push((path.to_string(), value.clone()));
        Ok(())
    }

    async fn put_document(&self, trees: &I18nTrees) -> Result<Value, ApiError> {
        if self.fail_put.get() {
            return Err(Self::status("PUT", 400));
        }
        self.puts.borrow_mut().push(trees.clone());
        Ok(serde_json::json!({ "i18n": trees }))
    }
}
