use crate::events::{AppIdentity, HotkeyCode};
use crate::mappings::X11Keycodes;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub hotkeys: Vec<HotkeyBinding>,
    // Индексы для поиска - не сериализуются, строятся после загрузки
    #[serde(skip)]
    keycode_index: HashMap<u8, usize>,
    #[serde(skip)]
    class_index: HashMap<AppIdentity, AppIdentity>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

impl LoggingConfig {
    /// Директивы EnvFilter: общий уровень, затем уточняющий фильтр
    pub fn directives(&self) -> String {
        if self.filter.trim().is_empty() {
            self.level.clone()
        } else {
            format!("{},{}", self.level, self.filter)
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            filter: "hotswitch=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Задержка перед сверкой группы с реальным набором окон
    pub settle_delay_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { settle_delay_ms: 2000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LaunchConfig {
    /// Сколько новые окна приписываются только что запущенному приложению
    pub pending_timeout_ms: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self { pending_timeout_ms: 10_000 }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiagnosticsConfig {
    /// Клавиша, по которой в лог выводятся все группы окон
    #[serde(default)]
    pub dump_key: Option<KeySpec>,
}

/// Клавиша в конфигурации: имя (`"f3"`) или код X11 (`69`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum KeySpec {
    Code(u8),
    Name(String),
}

impl KeySpec {
    pub fn keycode(&self) -> Result<HotkeyCode> {
        match self {
            KeySpec::Code(code) => Ok(HotkeyCode::new(*code)),
            KeySpec::Name(name) => X11Keycodes::translate(name)
                .map(HotkeyCode::new)
                .map_err(|e| anyhow::anyhow!(e)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyBinding {
    pub key: KeySpec,
    pub app: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
}

impl HotkeyBinding {
    pub fn identity(&self) -> AppIdentity {
        AppIdentity::new(&self.app)
    }

    /// Команда запуска; по умолчанию совпадает с именем приложения
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or(&self.app)
    }

    /// WM_CLASS окон приложения; по умолчанию совпадает с именем приложения
    pub fn class_identity(&self) -> AppIdentity {
        AppIdentity::new(self.class.as_deref().unwrap_or(&self.app))
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("HOTSWITCH_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_indexes();

        Ok(config)
    }

    /// Строит индексы для быстрого поиска привязок
    pub fn build_indexes(&mut self) {
        self.keycode_index = self
            .hotkeys
            .iter()
            .enumerate()
            .filter_map(|(i, binding)| binding.key.keycode().ok().map(|code| (code.value(), i)))
            .collect();

        self.class_index = self
            .hotkeys
            .iter()
            .map(|binding| (binding.class_identity(), binding.identity()))
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "full" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.reconcile.settle_delay_ms > 60_000 {
            anyhow::bail!("settle_delay_ms должно быть не больше 60000");
        }

        if self.launch.pending_timeout_ms == 0 {
            anyhow::bail!("pending_timeout_ms должно быть больше 0");
        }

        let mut seen = HashSet::new();

        if let Some(dump_key) = &self.diagnostics.dump_key {
            let code = dump_key
                .keycode()
                .context("Неверная клавиша диагностики")?;
            seen.insert(code);
        }

        for (i, binding) in self.hotkeys.iter().enumerate() {
            if binding.identity().is_empty() {
                anyhow::bail!("Пустое имя приложения в привязке #{}", i + 1);
            }

            if binding.command().trim().is_empty() {
                anyhow::bail!("Пустая команда запуска в привязке #{}", i + 1);
            }

            let code = binding
                .key
                .keycode()
                .with_context(|| format!("Неверная клавиша в привязке #{}", i + 1))?;

            if !seen.insert(code) {
                anyhow::bail!("Клавиша {} назначена повторно в привязке #{}", code, i + 1);
            }
        }

        Ok(())
    }

    pub fn binding_for(&self, code: HotkeyCode) -> Option<&HotkeyBinding> {
        self.keycode_index
            .get(&code.value())
            .and_then(|&i| self.hotkeys.get(i))
    }

    /// Приложение, окна которого имеют данный WM_CLASS
    pub fn app_for_class(&self, class: &AppIdentity) -> Option<&AppIdentity> {
        self.class_index.get(class)
    }

    pub fn dump_keycode(&self) -> Option<HotkeyCode> {
        self.diagnostics
            .dump_key
            .as_ref()
            .and_then(|key| key.keycode().ok())
    }

    /// Все клавиши, которые нужно захватить на корневом окне
    pub fn grabbed_keycodes(&self) -> Vec<HotkeyCode> {
        let mut codes: Vec<HotkeyCode> = self
            .keycode_index
            .keys()
            .map(|&code| HotkeyCode::new(code))
            .collect();
        codes.extend(self.dump_keycode());
        codes.sort_by_key(|code| code.value());
        codes
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile.settle_delay_ms)
    }

    pub fn pending_timeout(&self) -> Duration {
        Duration::from_millis(self.launch.pending_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn binding(key: KeySpec, app: &str) -> HotkeyBinding {
        HotkeyBinding {
            key,
            app: app.to_string(),
            command: None,
            class: None,
        }
    }

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_logging_directives() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.directives(), "info,hotswitch=info");
        logging.filter = " ".to_string();
        assert_eq!(logging.directives(), "info");
    }

    #[test]
    fn test_binding_lookup() {
        let mut config = Config::default();
        config.hotkeys = vec![
            binding(KeySpec::Name("f3".to_string()), "obsidian"),
            HotkeyBinding {
                key: KeySpec::Code(68),
                app: "terminal".to_string(),
                command: Some("gnome-terminal --maximize".to_string()),
                class: Some("Gnome-terminal-server".to_string()),
            },
        ];
        assert!(config.validate().is_ok());
        config.build_indexes();

        let obsidian = config.binding_for(HotkeyCode::new(69)).unwrap();
        assert_eq!(obsidian.identity(), AppIdentity::new("obsidian"));
        assert_eq!(obsidian.command(), "obsidian");

        let terminal = config.binding_for(HotkeyCode::new(68)).unwrap();
        assert_eq!(terminal.command(), "gnome-terminal --maximize");
        assert_eq!(
            config.app_for_class(&AppIdentity::new("gnome-terminal-server")),
            Some(&AppIdentity::new("terminal"))
        );

        assert!(config.binding_for(HotkeyCode::new(70)).is_none());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut config = Config::default();
        config.hotkeys = vec![
            binding(KeySpec::Name("f3".to_string()), "obsidian"),
            binding(KeySpec::Code(69), "emacs"),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dump_key_conflicts_with_binding() {
        let mut config = Config::default();
        config.diagnostics.dump_key = Some(KeySpec::Name("f12".to_string()));
        config.hotkeys = vec![binding(KeySpec::Code(96), "emacs")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_key_and_empty_app_rejected() {
        let mut config = Config::default();
        config.hotkeys = vec![binding(KeySpec::Name("hyper".to_string()), "emacs")];
        assert!(config.validate().is_err());

        config.hotkeys = vec![binding(KeySpec::Name("f4".to_string()), "  ")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "full"
filter = "hotswitch=debug"

[reconcile]
settle_delay_ms = 1500

[diagnostics]
dump_key = "f12"

[[hotkeys]]
key = "f3"
app = "obsidian"

[[hotkeys]]
key = 75
app = "vivaldi"
command = "vivaldi-stable"
class = "Vivaldi-stable"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.settle_delay(), Duration::from_millis(1500));
        assert_eq!(config.pending_timeout(), Duration::from_secs(10));
        assert_eq!(config.dump_keycode(), Some(HotkeyCode::new(96)));
        assert_eq!(
            config.grabbed_keycodes(),
            vec![HotkeyCode::new(69), HotkeyCode::new(75), HotkeyCode::new(96)]
        );
        assert_eq!(
            config.binding_for(HotkeyCode::new(75)).unwrap().command(),
            "vivaldi-stable"
        );
        assert_eq!(
            config.app_for_class(&AppIdentity::new("vivaldi-stable")),
            Some(&AppIdentity::new("vivaldi"))
        );
    }
}
