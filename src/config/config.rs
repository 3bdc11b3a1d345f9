use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};
use tracing::{debug, error};

use crate::core::porter::convert::{ConvertOptions, DEFAULT_OUTPUT_SUFFIX};
use crate::core::porter::manifest::DEFAULT_ATTRIBUTION;
use crate::core::porter::rules::{RuleSet, RuleSetKind, DEFAULT_NAMESPACE};
use crate::result::CoreResult;
use crate::utils::file_ops::porter_subdir;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub debug: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PorterConfig {
    pub namespace: String,
    pub rule_set: RuleSetKind,
    pub attribution: String,
    pub output_suffix: String,
    /// 为空时输出到输入文件所在目录
    pub output_dir: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub launcher: Launcher,
    pub porter: PorterConfig,
}

impl Default for Config {
    fn default() -> Self {
        get_default_config()
    }
}

impl Config {
    pub fn convert_options(&self) -> CoreResult<ConvertOptions> {
        let rules = RuleSet::from_kind(self.porter.rule_set).with_namespace(&self.porter.namespace)?;
        Ok(ConvertOptions {
            rules,
            attribution: self.porter.attribution.clone(),
            output_suffix: self.porter.output_suffix.clone(),
        })
    }
}

pub fn get_config_file_path() -> PathBuf {
    porter_subdir("config").join("settings.toml")
}

pub fn get_default_config() -> Config {
    Config {
        launcher: Launcher { debug: false },
        porter: PorterConfig {
            namespace: DEFAULT_NAMESPACE.to_string(),
            rule_set: RuleSetKind::Table,
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            output_dir: "".to_string(),
        },
    }
}

fn to_io_error<E: std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

pub fn ensure_config_file(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    if !path.exists() {
        write_config_to(path, &get_default_config())?;
    }
    Ok(())
}

pub fn read_config() -> io::Result<Config> {
    read_config_from(&get_config_file_path())
}

/// 读取配置文件并补充缺失部分
pub fn read_config_from(path: &Path) -> io::Result<Config> {
    ensure_config_file(path)?;
    let content = fs::read_to_string(path)?;

    let config: Config = match toml::from_str(&content) {
        Ok(parsed_config) => parsed_config,
        Err(err) => {
            error!("Failed to parse config on first attempt: {:?}", err);

            if let Ok(existing_table) = toml::from_str::<toml::Table>(&content) {
                if let toml::Value::Table(default_table) =
                    toml::Value::try_from(get_default_config()).map_err(to_io_error)?
                {
                    let merged = merge_tables(default_table, existing_table);
                    let updated_content = toml::to_string(&merged).map_err(to_io_error)?;
                    fs::write(path, updated_content)?;
                }
            }

            let updated_content = fs::read_to_string(path)?;
            toml::from_str(&updated_content).unwrap_or_else(|second_err| {
                error!("Failed to parse config on second attempt: {:?}", second_err);
                get_default_config()
            })
        }
    };

    debug!("Read and updated config: {:?}", config);
    Ok(config)
}

fn merge_tables(mut default: toml::Table, existing: toml::Table) -> toml::Table {
    for (key, existing_value) in existing {
        match default.get_mut(&key) {
            Some(default_value) => {
                if let (toml::Value::Table(default_table), toml::Value::Table(existing_table)) =
                    (default_value.clone(), existing_value.clone())
                {
                    *default_value = toml::Value::Table(merge_tables(default_table, existing_table));
                } else {
                    *default_value = existing_value;
                }
            }
            None => {
                default.insert(key, existing_value);
            }
        }
    }
    default
}

pub fn write_config_to(path: &Path, config: &Config) -> io::Result<()> {
    let toml_content = toml::to_string(config).map_err(to_io_error)?;
    fs::write(path, toml_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config").join("settings.toml");

        let config = read_config_from(&path).unwrap();
        assert_eq!(config, get_default_config());
        assert!(path.exists());
    }

    #[test]
    fn test_merges_missing_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "[launcher]\ndebug = true\n\n[porter]\nrule_set = \"legacy\"\n").unwrap();

        let config = read_config_from(&path).unwrap();
        assert!(config.launcher.debug);
        assert_eq!(config.porter.rule_set, RuleSetKind::Legacy);
        assert_eq!(config.porter.namespace, "minecraft");
        assert_eq!(config.porter.attribution, DEFAULT_ATTRIBUTION);

        // 补全后的内容已写回
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("output_suffix"));
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        assert_eq!(read_config_from(&path).unwrap(), get_default_config());
    }

    #[test]
    fn test_convert_options() {
        let mut config = get_default_config();
        config.porter.rule_set = RuleSetKind::Legacy;
        config.porter.namespace = "custom".into();
        let options = config.convert_options().unwrap();
        assert_eq!(options.rules.kind(), RuleSetKind::Legacy);
        assert_eq!(options.rules.marker(), "assets/custom/textures/");

        config.porter.namespace = "Not Valid".into();
        assert!(config.convert_options().is_err());
    }

    #[test]
    fn test_write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        let mut config = get_default_config();
        config.porter.output_dir = "out".into();
        write_config_to(&path, &config).unwrap();
        assert_eq!(read_config_from(&path).unwrap(), config);
    }
}
