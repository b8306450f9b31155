//! Environment variable handling for the Notifly client.
//!
//! Config values use `NOTIFLY__SECTION__KEY`, secrets use
//! `NOTIFLY_SECRET_SECTION_KEY` with a fallback to the legacy `SECTION_KEY`.

use std::env;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "NOTIFLY";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "NOTIFLY_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a configuration path to an environment variable name
///
/// `"server.base_url"` becomes `"NOTIFLY__SERVER__BASE_URL"`.
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to an environment variable name
///
/// `"session.access_token"` becomes `"NOTIFLY_SECRET_SESSION_ACCESS_TOKEN"`.
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to its legacy environment variable name
///
/// `"session.access_token"` becomes `"SESSION_ACCESS_TOKEN"`.
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 2 {
        return path.to_uppercase();
    }

    let section = parts[0];
    let key = parts[1..].join(SECRET_SEPARATOR);
    format!("{}_{}", section, key).to_uppercase()
}

/// Get an environment variable for a configuration path
pub fn get_config_env_var(path: &str) -> Option<String> {
    let env_var = config_path_to_env_var(path);
    env::var(&env_var).ok()
}

/// Get an environment variable for a secret path
///
/// Tries the prefixed name first, then the legacy name.
pub fn get_secret_env_var(path: &str) -> Option<String> {
    let env_var = secret_path_to_env_var(path);
    if let Ok(value) = env::var(&env_var) {
        return Some(value);
    }

    let legacy_env_var = legacy_secret_path_to_env_var(path);
    env::var(&legacy_env_var).ok()
}

/// Check if a path is a secret path
///
/// Paths containing "secret", "key", "password" or "token" are considered secret.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret")
        || path_lower.contains("key")
        || path_lower.contains("password")
        || path_lower.contains("token")
}

/// Get an environment variable for a path, secret or not
pub fn get_env_var(path: &str) -> Option<String> {
    if is_secret_path(path) {
        get_secret_env_var(path)
    } else {
        get_config_env_var(path)
    }
}

/// Replace every `"secret_from_env"` string in a JSON value with the
/// environment variable named after its path.
///
/// Returns `true` if any value was replaced.
pub fn inject_env_vars(value: &mut serde_json::Value) -> bool {
    use serde_json::Value;

    fn walk(path: Vec<String>, obj: &mut Value) -> bool {
        let mut replaced = false;

        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::String(s) if s == "secret_from_env" => {
                let path_str = path.join(".");
                if let Some(env_val) = get_env_var(&path_str) {
                    *s = env_val;
                    replaced = true;
                } else {
                    tracing::warn!(path = %path_str, "env var for secret_from_env marker not found");
                }
            }
            _ => {}
        }

        replaced
    }

    walk(vec![], value)
}
