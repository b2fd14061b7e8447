use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 导入管线配置的根结构。
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            geometry: GeometryConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl ImportConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ZMODEL_CONFIG`，否则寻找
    /// `./config/default.toml`。若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("ZMODEL_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 几何规范化参数。
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryConfig {
    /// 来源坐标到模型单位的缩放系数，在点构造时应用一次。
    #[serde(default = "GeometryConfig::default_unit_factor")]
    pub unit_factor: f64,
    /// 样条折线化精度，透传给来源工具包。
    #[serde(default = "GeometryConfig::default_spline_precision")]
    pub spline_precision: u32,
}

impl GeometryConfig {
    fn default_unit_factor() -> f64 {
        1.0
    }

    fn default_spline_precision() -> u32 {
        1
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            unit_factor: Self::default_unit_factor(),
            spline_precision: Self::default_spline_precision(),
        }
    }
}

/// 导出分批参数，仅影响吞吐，不影响正确性。
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "ExportConfig::default_batch_size")]
    pub component_batch_size: usize,
}

impl ExportConfig {
    fn default_batch_size() -> usize {
        10_000
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            component_batch_size: Self::default_batch_size(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = ImportConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.geometry.unit_factor, 1.0);
        assert_eq!(cfg.geometry.spline_precision, 1);
        assert_eq!(cfg.export.component_batch_size, 10_000);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [geometry]
            unit_factor = 25.4
            spline_precision = 4

            [export]
            component_batch_size = 500
            "#
        )
        .unwrap();

        let cfg = ImportConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.geometry.unit_factor, 25.4);
        assert_eq!(cfg.geometry.spline_precision, 4);
        assert_eq!(cfg.export.component_batch_size, 500);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "geometry = 'not a table'").unwrap();
        assert!(matches!(
            ImportConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
