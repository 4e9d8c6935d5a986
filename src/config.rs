use std::collections::HashMap;
use std::fs;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected `key = value` or `[section]`, got {text:?}")]
    Syntax { line: usize, text: String },
    #[error("[{section}] {key}: invalid value {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// INI-style configuration: global `key = value` lines before the first
/// `[Section]`, then per-section tables. `#` starts a comment line.
#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// # Errors
    /// Fails when the file cannot be read or a line is malformed.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        content.parse()
    }

    /// Tries each path in order and returns the first that loads.
    ///
    /// # Errors
    /// Returns the error of the last candidate when none loads.
    pub fn load_first(paths: &[&str]) -> Result<Self, ConfigError> {
        let mut last_err = None;
        for path in paths {
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| ConfigError::Syntax {
            line: 0,
            text: "no config path given".into(),
        }))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests.
    #[must_use]
    pub fn with(mut self, section: &str, key: &str, value: &str) -> Self {
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get(section, key)
            .or_else(|| self.get_global(key))
            .unwrap_or(default)
    }

    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }

    /// `true/false`, `yes/no`, `on/off`, `1/0`. `None` if absent or unrecognised.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.get_non_empty(section, key)?.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    /// Parse a value, falling back to `default` when the key is absent.
    ///
    /// # Errors
    /// Fails when the key is present but does not parse as `T`.
    pub fn get_parsed_or<T: FromStr>(
        &self,
        section: &str,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get_non_empty(section, key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                section: section.to_owned(),
                key: key.to_owned(),
                value: raw.to_owned(),
            }),
        }
    }

    /// All key/value pairs of a section, empty if the section is missing.
    pub fn section(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|sec| sec.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                current_section = Some(name.to_string());
                sections.entry(name.to_string()).or_default();
                continue;
            }

            let Some(pos) = line.find('=') else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    text: line.to_owned(),
                });
            };
            let key = line[..pos].trim().to_string();
            let value = line[pos + 1..].trim().trim_matches('"').to_string();

            match &current_section {
                None => {
                    globals.insert(key, value);
                }
                Some(sec) => {
                    sections.entry(sec.clone()).or_default().insert(key, value);
                }
            }
        }
        Ok(Config { globals, sections })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const SAMPLE: &str = r#"
# relay config
bind_addr = 0.0.0.0:5000

[Relay]
poll_interval_ms = 25
name = "main relay"

[TLS]
enabled = yes

[Membership]
raid-night = alice, bob
"#;

    #[test]
    fn parses_globals_sections_and_quotes() {
        let cfg: Config = SAMPLE.parse().unwrap();
        assert_eq!(cfg.get_global("bind_addr"), Some("0.0.0.0:5000"));
        assert_eq!(cfg.get("Relay", "name"), Some("main relay"));
        assert_eq!(cfg.get_bool("TLS", "enabled"), Some(true));
        assert_eq!(cfg.get_or_default("Relay", "bind_addr", "x"), "0.0.0.0:5000");
    }

    #[test]
    fn parsed_values_and_defaults() {
        let cfg: Config = SAMPLE.parse().unwrap();
        assert_eq!(cfg.get_parsed_or("Relay", "poll_interval_ms", 50u64).unwrap(), 25);
        assert_eq!(cfg.get_parsed_or("Relay", "missing", 7u32).unwrap(), 7);

        let bad = Config::empty().with("Relay", "poll_interval_ms", "soon");
        assert!(matches!(
            bad.get_parsed_or("Relay", "poll_interval_ms", 50u64),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn section_iteration_and_syntax_errors() {
        let cfg: Config = SAMPLE.parse().unwrap();
        let rooms: Vec<_> = cfg.section("Membership").collect();
        assert_eq!(rooms, vec![("raid-night", "alice, bob")]);
        assert_eq!(cfg.section("Nope").count(), 0);

        let err = "[A]\nnot a pair".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }
}
