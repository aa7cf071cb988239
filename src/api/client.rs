//! 站点后端 HTTP 接口：`GET /site`、`PATCH /site`（单叶子）、`PUT /site`（整体文档）

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::model::field_store::I18nTrees;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{method} {path} 失败，状态码 {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },
    #[error("响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),
}

/// `GET /site` 的响应体：`{ site: { i18n: { ru, uz } } }`，缺失层级按空对象处理
#[derive(Debug, Default, Deserialize)]
struct SiteEnvelope {
    #[serde(default)]
    site: SiteBody,
}

#[derive(Debug, Default, Deserialize)]
struct SiteBody {
    #[serde(default)]
    i18n: I18nTrees,
}

/// 单叶子更新请求体
#[derive(Debug, Serialize)]
struct LeafPatch<'a> {
    path: &'a str,
    value: &'a Value,
}

/// 整体保存请求体
#[derive(Debug, Serialize)]
pub struct I18nDocument<'a> {
    pub i18n: &'a I18nTrees,
}

/// 后端访问接缝；控制器只依赖此 trait
#[allow(async_fn_in_trait)]
pub trait SiteApi {
    /// 拉取两种语言的内容树
    async fn fetch_site(&self) -> Result<I18nTrees, ApiError>;

    /// 持久化单个叶子；`path` 形如 `site.i18n.ru.hero.title`
    async fn patch_leaf(&self, path: &str, value: &Value) -> Result<(), ApiError>;

    /// 用整份 `{ i18n: { ru, uz } }` 覆盖站点内容，返回服务端的新文档
    async fn put_document(&self, trees: &I18nTrees) -> Result<Value, ApiError>;
}

/// 持久化路径：`site.i18n.<lang>.<leaf>`
pub fn remote_path(lang: crate::model::field_store::Lang, leaf_path: &str) -> String {
    format!("site.i18n.{}.{}", lang, leaf_path)
}

pub struct HttpSiteApi {
    client: Client,
    base: String,
}

impl HttpSiteApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: config.api_base.clone(),
        })
    }

    fn site_url(&self) -> String {
        format!("{}/site", self.base)
    }

    fn check(method: &'static str, status: StatusCode) -> Result<(), ApiError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                method,
                path: "/site".into(),
                status: status.as_u16(),
            })
        }
    }
}

impl SiteApi for HttpSiteApi {
    async fn fetch_site(&self) -> Result<I18nTrees, ApiError> {
        let response = self.client.get(self.site_url()).send().await?;
        Self::check("GET", response.status())?;
        let body = response.bytes().await?;
        let envelope: SiteEnvelope = serde_json::from_slice(&body)?;
        tracing::debug!("GET /site 返回 {} 字节", body.len());
        Ok(envelope.site.i18n)
    }

    async fn patch_leaf(&self, path: &str, value: &Value) -> Result<(), ApiError> {
        let response = self
            .client
            .patch(self.site_url())
            .json(&LeafPatch { path, value })
            .send()
            .await?;
        Self::check("PATCH", response.status()).map_err(|e| match e {
            ApiError::Status { method, status, .. } => ApiError::Status {
                method,
                path: format!("/site ({})", path),
                status,
            },
            other => other,
        })
    }

    async fn put_document(&self, trees: &I18nTrees) -> Result<Value, ApiError> {
        let response = self
            .client
            .put(self.site_url())
            .json(&I18nDocument { i18n: trees })
            .send()
            .await?;
        Self::check("PUT", response.status())?;
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field_store::Lang;
    use serde_json::json;

    #[test]
    fn test_envelope_extracts_trees() {
        let body = json!({"site": {"i18n": {"ru": {"a": "б"}, "uz": {"a": "b"}}, "theme": "dark"}});
        let envelope: SiteEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.site.i18n.ru, json!({"a": "б"}));
        assert_eq!(envelope.site.i18n.uz, json!({"a": "b"}));
    }

    #[test]
    fn test_envelope_missing_levels_default_to_empty_objects() {
        let envelope: SiteEnvelope = serde_json::from_value(json!({})).unwrap();
        assert_eq!(envelope.site.i18n, I18nTrees::default());

        let envelope: SiteEnvelope = serde_json::from_value(json!({"site": {"i18n": {"ru": {"x": "y"}}}})).unwrap();
        assert_eq!(envelope.site.i18n.uz, json!({}));
    }

    #[test]
    fn test_request_bodies() {
        let value = json!(3);
        let patch = serde_json::to_value(LeafPatch { path: "site.i18n.uz.hero.count", value: &value }).unwrap();
        assert_eq!(patch, json!({"path": "site.i18n.uz.hero.count", "value": 3}));

        let trees = I18nTrees { ru: json!({"t": "р"}), uz: json!({"t": "u"}) };
        let doc = serde_json::to_value(I18nDocument { i18n: &trees }).unwrap();
        assert_eq!(doc, json!({"i18n": {"ru": {"t": "р"}, "uz": {"t": "u"}}}));
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path(Lang::Ru, "menu.0"), "site.i18n.ru.menu.0");
    }

    #[test]
    fn test_status_error_message() {
        let err = HttpSiteApi::check("GET", StatusCode::INTERNAL_SERVER_ERROR).unwrap_err();
        assert_eq!(err.to_string(), "GET /site 失败，状态码 500");
        assert!(HttpSiteApi::check("PATCH", StatusCode::NO_CONTENT).is_ok());
    }
}
