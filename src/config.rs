//! 运行配置：后端地址与超时，启动时显式注入

use reqwest::Url;

use crate::model::error::AdminError;

pub const DEFAULT_API_BASE: &str = "http://localhost:5050";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 不带末尾 `/` 的后端根地址
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// 校验并规范化后端地址
    pub fn new(api_base: &str, timeout_secs: u64) -> Result<Self, AdminError> {
        let trimmed = api_base.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|e| AdminError::Config(format!("无效的后端地址 {}: {}", api_base, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AdminError::Config(format!("不支持的协议: {}", url.scheme())));
        }
        if timeout_secs == 0 {
            return Err(AdminError::Config("超时时间必须大于0".into()));
        }
        Ok(Self {
            api_base: trimmed.to_string(),
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = Config::new("https://api.example.uz/", 5).unwrap();
        assert_eq!(config.api_base, "https://api.example.uz");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(Config::new("not a url", 5), Err(AdminError::Config(_))));
        assert!(matches!(Config::new("ftp://host", 5), Err(AdminError::Config(_))));
        assert!(matches!(Config::new(DEFAULT_API_BASE, 0), Err(AdminError::Config(_))));
    }

    #[test]
    fn test_default_points_to_local_backend() {
        assert_eq!(Config::default().api_base, "http://localhost:5050");
    }
}
