// --- File: crates/notifly_config/src/lib.rs ---
use config::{Config, ConfigError, Environment, File, FileFormat};
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

pub mod env_vars;
pub mod models;
pub use models::*;

/// Loads the layered configuration.
///
/// Sources, later ones winning: `{config_dir}/default`, `{config_dir}/{RUN_ENV}`
/// (both optional, any format the `config` crate understands), then
/// `NOTIFLY__SECTION__KEY` environment variables. `config_dir` defaults to
/// `./config` and can be moved with `NOTIFLY_CONFIG_DIR`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env_vars::get_config_prefix();
    let config_dir =
        PathBuf::from(env::var("NOTIFLY_CONFIG_DIR").unwrap_or_else(|_| "config".to_string()));

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);

    tracing::debug!(
        default_path = %default_path.display(),
        env_path = %env_path.display(),
        "loading configuration"
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(&prefix)
                .separator(env_vars::CONFIG_SEPARATOR)
                .list_separator(",")
                .with_list_parse_key("realtime.transports")
                .with_list_parse_key("agent.vibrate")
                .try_parsing(true),
        );

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Loads the configuration from a TOML document, without files or
/// environment overrides. Missing sections fall back to their defaults.
pub fn load_config_from_str(toml: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()
}

/// Replaces all "secret_from_env" string values with environment variable values
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    env_vars::inject_env_vars(&mut json);
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to apply env overrides: {err}")))
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file into the process environment, once.
///
/// The file is taken from `DOTENV_OVERRIDE`, else from the first command line
/// argument if it starts with `.env`, else `.env`. Returns the path used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = std::env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
