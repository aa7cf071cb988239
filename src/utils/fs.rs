//! IO helper: JSON file read/write for exported i18n documents

use std::{fs::File, io::BufReader, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::model::error::AdminError;

/// 从文件读取JSON数据
pub fn read_json_file<T: DeserializeOwned>(p: &Path) -> Result<T, AdminError> {
    let f = File::open(p)?;
    let rdr = BufReader::new(f);
    let v = serde_json::from_reader(rdr)?;
    Ok(v)
}

/// 将JSON数据保存到文件（格式化输出）
pub fn write_json_file<T: Serialize + ?Sized>(p: &Path, value: &T) -> Result<(), AdminError> {
    let f = File::create(p)?;
    serde_json::to_writer_pretty(f, value)?;
    tracing::info!("JSON文件已保存到: {}", p.display());
    Ok(())
}
