//! # Configuration des clients Lifecycle Controller
//!
//! - Configuration par défaut intégrée (`lcwsman.yaml`)
//! - Fusion avec un `config.yaml` externe
//! - Surcharges par variables d'environnement
//!   (`LCWSMAN_CONFIG__WSMAN__HTTP__MAX_RETRIES=5`)
//! - Getters typés avec valeurs par défaut
//! - Mots de passe chiffrés (`encrypted:...`), voir [`encryption`]
//!
//! ## Usage
//!
//! ```no_run
//! use lcconfig::Config;
//!
//! let config = Config::load("")?;
//! let port = config.get_port();
//! let password = config.get_password()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use anyhow::{Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use tracing::{info, warn};

pub mod encryption;

const DEFAULT_CONFIG: &str = include_str!("lcwsman.yaml");

const ENV_CONFIG_DIR: &str = "LCWSMAN_CONFIG";
const ENV_PREFIX: &str = "LCWSMAN_CONFIG__";
const CONFIG_DIR_NAME: &str = ".lcwsman";
const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_PORT: u16 = 443;
const DEFAULT_USERNAME: &str = "root";
const DEFAULT_PASSWORD: &str = "calvin";
const DEFAULT_CONNECTION_TIMEOUT: f64 = 12.1;
const DEFAULT_READ_TIMEOUT: f64 = 120.0;
const DEFAULT_MAX_RETRIES: u64 = 3;
const DEFAULT_VERIFY_SSL_CERT: bool = false;
const DEFAULT_READY_TIMEOUT: f64 = 1800.0;
const DEFAULT_READY_INTERVAL: f64 = 20.0;
const DEFAULT_JOB_TIMEOUT: f64 = 1800.0;
const DEFAULT_JOB_INTERVAL: f64 = 10.0;
const DEFAULT_GRACEFUL_REBOOT: bool = false;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Durée exprimée en secondes (entier ou décimal)
macro_rules! impl_secs_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Duration {
            let secs = match self.get_value($path) {
                Ok(Value::Number(n)) => n.as_f64(),
                _ => None,
            };
            match secs.and_then(|secs| Duration::try_from_secs_f64(secs).ok()) {
                Some(duration) => duration,
                None => {
                    warn!(path = %$path.join("."), default = $default, "Invalid duration, using default");
                    Duration::from_secs_f64($default)
                }
            }
        }

        pub fn $setter(&self, value: Duration) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value.as_secs_f64())))
        }
    };
}

macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> u64 {
            match self.get_value($path) {
                Ok(Value::Number(n)) if n.is_u64() => n.as_u64().unwrap_or($default),
                _ => $default,
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration chargée
///
/// Les modifications restent en mémoire jusqu'à l'appel de [`Config::save`].
#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Cherche le répertoire de configuration, dans l'ordre :
    /// 1. `directory` s'il n'est pas vide
    /// 2. la variable d'environnement `LCWSMAN_CONFIG`
    /// 3. `.lcwsman` dans le répertoire courant
    /// 4. `.lcwsman` dans le répertoire de l'utilisateur
    pub fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Charge la configuration : valeurs intégrées, puis `config.yaml` du
    /// répertoire trouvé s'il existe, puis variables d'environnement.
    pub fn load(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        let path = config_dir.join(CONFIG_FILE_NAME);

        let external = match fs::read_to_string(&path) {
            Ok(yaml) => {
                info!(config_file = %path.display(), "Loaded config file");
                Some(yaml)
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
                None
            }
        };

        Self::from_sources(path, external.as_deref(), env::vars())
    }

    /// Construit une configuration à partir d'un YAML externe optionnel et
    /// d'un ensemble de variables d'environnement.
    pub fn from_sources(
        path: impl Into<PathBuf>,
        external: Option<&str>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        if let Some(yaml) = external {
            let external_value: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut value, &lower_keys_value(external_value));
        }

        let mut value = lower_keys_value(value);
        apply_env_overrides(&mut value, vars);

        Ok(Config {
            path: path.into(),
            data: Mutex::new(value),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn data(&self) -> Result<std::sync::MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Écrit la configuration fusionnée dans `config.yaml`.
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data()?)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, yaml)?;
        info!(config_file = %self.path.display(), "Configuration saved");
        Ok(())
    }

    /// Valeur au chemin `path`, par exemple `&["wsman", "http", "max_retries"]`.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        get_value_internal(&*self.data()?, path)
    }

    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        set_value_internal(&mut *self.data()?, path, value)
    }

    pub fn get_port(&self) -> u16 {
        match self.get_value(&["wsman", "port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!("Invalid port '{}', using default {}", n, DEFAULT_PORT);
                    DEFAULT_PORT
                }
            },
            Ok(Value::String(s)) => s.parse().unwrap_or_else(|_| {
                warn!("Invalid port '{}', using default {}", s, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            _ => DEFAULT_PORT,
        }
    }

    pub fn set_port(&self, port: u16) -> Result<()> {
        self.set_value(&["wsman", "port"], Value::Number(Number::from(port)))
    }

    pub fn get_username(&self) -> String {
        match self.get_value(&["wsman", "auth", "username"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_USERNAME.to_string(),
        }
    }

    pub fn set_username(&self, username: &str) -> Result<()> {
        self.set_value(
            &["wsman", "auth", "username"],
            Value::String(username.to_string()),
        )
    }

    /// Mot de passe en clair. Une valeur `encrypted:...` est déchiffrée.
    pub fn get_password(&self) -> Result<String> {
        match self.get_value(&["wsman", "auth", "password"]) {
            Ok(Value::String(s)) => encryption::get_password(&s),
            Ok(Value::Number(n)) => Ok(n.to_string()),
            _ => Ok(DEFAULT_PASSWORD.to_string()),
        }
    }

    /// Stocke le mot de passe chiffré pour cette machine.
    pub fn set_password(&self, password: &str) -> Result<()> {
        let encrypted = encryption::encrypt_password(password)?;
        self.set_value(&["wsman", "auth", "password"], Value::String(encrypted))
    }

    impl_secs_config!(
        get_connection_timeout,
        set_connection_timeout,
        &["wsman", "http", "connection_timeout"],
        DEFAULT_CONNECTION_TIMEOUT
    );

    impl_secs_config!(
        get_read_timeout,
        set_read_timeout,
        &["wsman", "http", "read_timeout"],
        DEFAULT_READ_TIMEOUT
    );

    impl_u64_config!(
        get_max_retries,
        set_max_retries,
        &["wsman", "http", "max_retries"],
        DEFAULT_MAX_RETRIES
    );

    impl_bool_config!(
        get_verify_ssl_cert,
        set_verify_ssl_cert,
        &["wsman", "http", "verify_ssl_cert"],
        DEFAULT_VERIFY_SSL_CERT
    );

    impl_secs_config!(
        get_ready_timeout,
        set_ready_timeout,
        &["lifecycle", "ready", "timeout"],
        DEFAULT_READY_TIMEOUT
    );

    impl_secs_config!(
        get_ready_interval,
        set_ready_interval,
        &["lifecycle", "ready", "interval"],
        DEFAULT_READY_INTERVAL
    );

    impl_secs_config!(
        get_job_timeout,
        set_job_timeout,
        &["lifecycle", "job", "timeout"],
        DEFAULT_JOB_TIMEOUT
    );

    impl_secs_config!(
        get_job_interval,
        set_job_interval,
        &["lifecycle", "job", "interval"],
        DEFAULT_JOB_INTERVAL
    );

    impl_bool_config!(
        get_graceful_reboot,
        set_graceful_reboot,
        &["lifecycle", "reboot", "graceful"],
        DEFAULT_GRACEFUL_REBOOT
    );

    /// Niveau de log minimum
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["logger", "min_level"]) {
            Ok(Value::String(s)) => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }

    pub fn set_log_min_level(&self, level: &str) -> Result<()> {
        self.set_value(&["logger", "min_level"], Value::String(level.to_string()))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
        };
        current = map
            .get(&Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
    }
    Ok(current.clone())
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };
    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a mapping"));
    };

    let key = Value::String(first.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value_internal(entry, rest, value)
    }
}

/// Applique les variables `LCWSMAN_CONFIG__A__B=valeur` sur le chemin `a.b`.
fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = path.split("__").collect();
        let yaml_value =
            serde_yaml::from_str::<Value>(&value).unwrap_or_else(|_| Value::String(value.clone()));

        match set_value_internal(config, &path, yaml_value) {
            Ok(()) => info!(variable = %key, "Applied environment override"),
            Err(e) => warn!(variable = %key, error = %e, "Ignored environment override"),
        }
    }
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys_value(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        other => other,
    }
}

/// Fusionne `external` dans `default` : les mappings sont fusionnés clé par
/// clé, les scalaires et séquences sont remplacés.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_embedded_defaults() {
        let config = Config::from_sources("config.yaml", None, no_env()).unwrap();

        assert_eq!(config.get_port(), 443);
        assert_eq!(config.get_username(), "root");
        assert_eq!(config.get_password().unwrap(), "calvin");
        assert_eq!(config.get_connection_timeout(), Duration::from_millis(12_100));
        assert_eq!(config.get_read_timeout(), Duration::from_secs(120));
        assert_eq!(config.get_max_retries(), 3);
        assert!(!config.get_verify_ssl_cert());
        assert_eq!(config.get_ready_timeout(), Duration::from_secs(1800));
        assert_eq!(config.get_ready_interval(), Duration::from_secs(20));
        assert_eq!(config.get_job_timeout(), Duration::from_secs(1800));
        assert_eq!(config.get_job_interval(), Duration::from_secs(10));
        assert!(!config.get_graceful_reboot());
        assert_eq!(config.get_log_min_level(), "INFO");
    }

    #[test]
    fn test_external_file_is_merged() {
        let external = r#"
WSMAN:
  Port: 8443
  http:
    verify_ssl_cert: true
"#;
        let config = Config::from_sources("config.yaml", Some(external), no_env()).unwrap();

        assert_eq!(config.get_port(), 8443);
        assert!(config.get_verify_ssl_cert());
        // Les clés absentes du fichier gardent leur valeur par défaut
        assert_eq!(config.get_max_retries(), 3);
        assert_eq!(config.get_username(), "root");
    }

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("LCWSMAN_CONFIG__WSMAN__HTTP__MAX_RETRIES".to_string(), "7".to_string()),
            ("LCWSMAN_CONFIG__LIFECYCLE__REBOOT__GRACEFUL".to_string(), "true".to_string()),
            ("LCWSMAN_CONFIG__WSMAN__AUTH__USERNAME".to_string(), "admin".to_string()),
            ("UNRELATED".to_string(), "1".to_string()),
        ];
        let config = Config::from_sources("config.yaml", None, vars).unwrap();

        assert_eq!(config.get_max_retries(), 7);
        assert!(config.get_graceful_reboot());
        assert_eq!(config.get_username(), "admin");
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let external = r#"
wsman:
  port: 70000
  http:
    read_timeout: "soon"
    max_retries: -1
"#;
        let config = Config::from_sources("config.yaml", Some(external), no_env()).unwrap();

        assert_eq!(config.get_port(), 443);
        assert_eq!(config.get_read_timeout(), Duration::from_secs(120));
        assert_eq!(config.get_max_retries(), 3);
    }

    #[test]
    fn test_out_of_range_durations_fall_back_to_defaults() {
        let external = r#"
wsman:
  http:
    read_timeout: 1.0e+30
    connection_timeout: -5.0
lifecycle:
  job:
    timeout: .nan
"#;
        let config = Config::from_sources("config.yaml", Some(external), no_env()).unwrap();

        assert_eq!(config.get_read_timeout(), Duration::from_secs(120));
        assert_eq!(config.get_connection_timeout(), Duration::from_millis(12_100));
        assert_eq!(config.get_job_timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn test_set_and_get_value() {
        let config = Config::from_sources("config.yaml", None, no_env()).unwrap();

        config.set_port(623).unwrap();
        config.set_job_interval(Duration::from_secs(2)).unwrap();
        config.set_value(&["Custom", "Key"], Value::from("x")).unwrap();

        assert_eq!(config.get_port(), 623);
        assert_eq!(config.get_job_interval(), Duration::from_secs(2));
        assert_eq!(config.get_value(&["custom", "key"]).unwrap(), Value::from("x"));
        assert!(config.get_value(&["missing", "key"]).is_err());
    }

    #[test]
    fn test_merge_yaml_replaces_sequences() {
        let mut default: Value = serde_yaml::from_str("a: [1, 2]\nb: {c: 1, d: 2}").unwrap();
        let external: Value = serde_yaml::from_str("a: [3]\nb: {d: 5}").unwrap();
        merge_yaml(&mut default, &external);

        let expected: Value = serde_yaml::from_str("a: [3]\nb: {c: 1, d: 5}").unwrap();
        assert_eq!(default, expected);
    }
}
