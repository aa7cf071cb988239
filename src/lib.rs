//! 站点双语内容编辑库
//!
//! 提供JSON展平、双语字段表、按类型还原与后端同步功能
//! 遵循MVVM架构模式：model 管数据，api 管后端，vm 管界面交互

pub mod api;
pub mod config;
pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::error::AdminError;
pub use model::field_store::{FieldRecord, FieldStatus, FieldStore, I18nTrees, Lang};
pub use model::leaf::{flatten, LeafKind, LeafValue};
pub use model::serializer::{parse_typed, ParseError};
pub use vm::controller::{LoadOutcome, SaveAllSummary, SaveOutcome, SyncController};
