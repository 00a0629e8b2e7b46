//! INI file configuration adapter.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| EngineError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[backtest]
assets = AAPL, MSFT
initial_capital = 100000.0

[strategy]
short_window = 10
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "assets"),
            Some("AAPL, MSFT".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "short_window"),
            Some("10".to_string())
        );
    }

    #[test]
    fn missing_keys_and_sections_are_none() {
        let adapter = FileConfigAdapter::from_string("[costs]\nmin_trade_cost = 1\n").unwrap();
        assert_eq!(adapter.get_string("costs", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn blank_value_is_none() {
        let adapter = FileConfigAdapter::from_string("[costs]\nmin_trade_cost =\n").unwrap();
        assert_eq!(adapter.get_string("costs", "min_trade_cost"), None);
    }

    #[test]
    fn get_bool_variants() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\na = true\nb = No\nc = 1\nd = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("strategy", "a", false));
        assert!(!adapter.get_bool("strategy", "b", true));
        assert!(adapter.get_bool("strategy", "c", false));
        assert!(adapter.get_bool("strategy", "d", true));
        assert!(!adapter.get_bool("strategy", "missing", false));
    }

    #[test]
    fn from_file_reads_ini() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[logging]\nlevel = debug\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("logging", "level"), Some("debug".to_string()));
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/stockbot.ini");
        assert!(matches!(result, Err(EngineError::ConfigParse { .. })));
    }
}
