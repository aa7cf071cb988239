//! 错误分类：加载失败、类型还原失败、保存失败及本地状态错误

use thiserror::Error;

use crate::api::client::ApiError;
use crate::model::field_store::Lang;
use crate::model::serializer::ParseError;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("加载站点数据失败: {0}")]
    Load(#[source] ApiError),
    #[error("字段 {lang}:{path} 类型还原失败: {source}")]
    FieldParse {
        lang: Lang,
        path: String,
        #[source]
        source: ParseError,
    },
    #[error("保存 {lang}:{path} 失败: {source}")]
    Save {
        lang: Lang,
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("整体保存失败: {0}")]
    Publish(#[source] ApiError),
    #[error("字段 {lang}:{path} 与该语言现有结构冲突（叶子与容器不能互相覆盖）")]
    ShapeConflict { lang: Lang, path: String },
    #[error("路径无法按点号寻址，请使用整体保存: {0}")]
    UnaddressablePath(String),
    #[error("以下字段在两种语言中都必须填写: {}", .0.join(", "))]
    EmptyFields(Vec<String>),
    #[error("状态错误: {0}")]
    State(String),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON解析失败: {0}")]
    Json(#[from] serde_json::Error),
}
