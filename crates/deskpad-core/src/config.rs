use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

use crate::widgets::pomodoro::{DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES};
use crate::widgets::water::DEFAULT_DAILY_GOAL;
use crate::widgets::weather::DEFAULT_CITY;

pub const RC_FILE_NAME: &str = ".deskrc";
pub const RC_ENV_VAR: &str = "DESKRC";
const DEFAULT_DATA_DIR: &str = "~/.deskpad";
const DEFAULT_CURRENCY: &str = "₹";

/// Flat `key = value` settings from the rc file, defaults and overrides.
#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = [
            ("data.location", DEFAULT_DATA_DIR.to_string()),
            ("default.command", "stats".to_string()),
            ("color", "on".to_string()),
            ("confirm", "on".to_string()),
            ("pomodoro.work", DEFAULT_WORK_MINUTES.to_string()),
            ("pomodoro.break", DEFAULT_BREAK_MINUTES.to_string()),
            ("water.goal", DEFAULT_DAILY_GOAL.to_string()),
            ("weather.city", DEFAULT_CITY.to_string()),
            ("currency", DEFAULT_CURRENCY.to_string()),
        ];
        Self {
            map: defaults
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            loaded_files: Vec::new(),
        }
    }
}

impl Config {
    /// Defaults, then the first rc file found: `rc_override`, `$DESKRC`
    /// (`/dev/null` skips it), or `~/.deskrc`.
    #[tracing::instrument(skip(rc_override))]
    pub fn load(rc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        match resolve_rc_path(rc_override)? {
            Some(path) => {
                info!(deskrc = %path.display(), "loading deskrc");
                cfg.load_file(&path)?;
            }
            None => warn!("no deskrc found; using defaults"),
        }

        Ok(cfg)
    }

    /// `rc.` prefixes are optional.
    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    /// Unparseable numbers read as absent, with a warning.
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        let raw = self.map.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "ignoring non-numeric setting");
                None
            }
        }
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if self.loaded_files.contains(&canonical) {
            warn!(file = %path.display(), "config file already loaded; skipping include cycle");
            return Ok(());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(canonical);

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        for (line_num, raw_line) in text.lines().enumerate() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => raw_line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            if let Some(include_rest) = line.strip_prefix("include ") {
                let include_path = resolve_include_path(&base_dir, include_rest.trim())?;
                debug!(
                    file = %path.display(),
                    include = %include_path.display(),
                    line = line_num + 1,
                    "processing include"
                );
                if include_path.exists() {
                    self.load_file(&include_path)?;
                } else {
                    warn!(include = %include_path.display(), "include file does not exist; skipping");
                }
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

/// Typed view of the settings the widgets consume.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub color: bool,
    pub confirm: bool,
    pub pomodoro_work_minutes: u32,
    pub pomodoro_break_minutes: u32,
    pub water_goal: u32,
    pub weather_city: String,
    pub currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        let positive = |key: &str, default: u32| {
            cfg.get_u32(key).filter(|v| *v > 0).unwrap_or(default)
        };
        Self {
            color: cfg.get_bool("color").unwrap_or(true),
            confirm: cfg.get_bool("confirm").unwrap_or(true),
            pomodoro_work_minutes: positive("pomodoro.work", DEFAULT_WORK_MINUTES),
            pomodoro_break_minutes: positive("pomodoro.break", DEFAULT_BREAK_MINUTES),
            water_goal: positive("water.goal", DEFAULT_DAILY_GOAL),
            weather_city: cfg
                .get("weather.city")
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CITY.to_string()),
            currency: cfg
                .get("currency")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        }
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        expand_tilde(Path::new(DEFAULT_DATA_DIR))
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_rc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(rc_env) = std::env::var(RC_ENV_VAR) {
        if rc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(rc_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(RC_FILE_NAME);
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn resolve_include_path(base_dir: &Path, include: &str) -> anyhow::Result<PathBuf> {
    if include.trim().is_empty() {
        return Err(anyhow!("include path cannot be empty"));
    }

    let expanded = expand_tilde(Path::new(include));
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{Config, Settings};

    #[test]
    fn defaults_cover_every_setting() {
        let settings = Settings::default();
        assert_eq!(settings.pomodoro_work_minutes, 25);
        assert_eq!(settings.pomodoro_break_minutes, 5);
        assert_eq!(settings.water_goal, 8);
        assert_eq!(settings.weather_city, "New York");
        assert_eq!(settings.currency, "₹");
        assert!(settings.color && settings.confirm);
    }

    #[test]
    fn rc_file_with_include_and_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extra = dir.path().join("extra.rc");
        fs::write(&extra, "water.goal = 10\n").expect("write include");
        let rc = dir.path().join("deskrc");
        fs::write(
            &rc,
            "# dashboard settings\ncurrency = $  # dollars\ninclude extra.rc\nconfirm = off\n",
        )
        .expect("write rc");

        let mut cfg = Config::load(Some(&rc)).expect("load");
        cfg.apply_overrides([("rc.pomodoro.work".to_string(), "50".to_string())]);
        let settings = Settings::from_config(&cfg);

        assert_eq!(cfg.loaded_files.len(), 2);
        assert_eq!(settings.currency, "$");
        assert_eq!(settings.water_goal, 10);
        assert!(!settings.confirm);
        assert_eq!(settings.pomodoro_work_minutes, 50);
    }

    #[test]
    fn include_cycles_load_each_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("deskrc");
        let other = dir.path().join("other.rc");
        fs::write(&rc, "include deskrc\ninclude other.rc\ncurrency = $\n").expect("write rc");
        fs::write(&other, "include deskrc\nwater.goal = 6\n").expect("write other");

        let cfg = Config::load(Some(&rc)).expect("load");
        let settings = Settings::from_config(&cfg);

        assert_eq!(cfg.loaded_files.len(), 2);
        assert_eq!(settings.currency, "$");
        assert_eq!(settings.water_goal, 6);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let mut cfg = Config::default();
        cfg.apply_overrides([
            ("water.goal".to_string(), "lots".to_string()),
            ("pomodoro.break".to_string(), "0".to_string()),
        ]);
        let settings = Settings::from_config(&cfg);
        assert_eq!(settings.water_goal, 8);
        assert_eq!(settings.pomodoro_break_minutes, 5);
    }

    #[test]
    fn malformed_line_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rc = dir.path().join("deskrc");
        fs::write(&rc, "just words\n").expect("write rc");
        assert!(Config::load(Some(&rc)).is_err());
    }
}
