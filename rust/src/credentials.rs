//! The runtime credential record handed out by a CI job. It carries exactly
//! three values and nothing else: the cache service URL, the runtime service
//! URL and the bearer token both of them accept.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::environment::Environment;

pub const CACHE_URL_VAR: &str = "ACTIONS_CACHE_URL";
pub const RUNTIME_URL_VAR: &str = "ACTIONS_RUNTIME_URL";
pub const RUNTIME_TOKEN_VAR: &str = "ACTIONS_RUNTIME_TOKEN";

/// Names of the environment variables the record is assembled from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariableNames {
    pub cache_url: String,
    pub runtime_url: String,
    pub runtime_token: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            cache_url: CACHE_URL_VAR.to_string(),
            runtime_url: RUNTIME_URL_VAR.to_string(),
            runtime_token: RUNTIME_TOKEN_VAR.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeCredentials {
    #[serde(rename = "ACTIONS_CACHE_URL", alias = "cache_url")]
    pub cache_url: String,
    #[serde(rename = "ACTIONS_RUNTIME_URL", alias = "runtime_url")]
    pub runtime_url: String,
    #[serde(rename = "ACTIONS_RUNTIME_TOKEN", alias = "runtime_token")]
    pub runtime_token: String,
}

/// Credentials-file shape understood by GitHub Actions cache clients.
#[derive(Debug, Serialize)]
pub struct CacheCredentials<'a> {
    pub cache_url: &'a str,
    pub runtime_token: &'a str,
}

impl RuntimeCredentials {
    /// Reads the three values from `env`. Unset variables become empty
    /// strings, matching how the CI shell interpolates them.
    pub fn from_environment(env: &impl Environment, names: &VariableNames) -> Self {
        Self {
            cache_url: read_or_empty(env, &names.cache_url),
            runtime_url: read_or_empty(env, &names.runtime_url),
            runtime_token: read_or_empty(env, &names.runtime_token),
        }
    }

    pub fn cache_daemon_view(&self) -> CacheCredentials<'_> {
        CacheCredentials {
            cache_url: &self.cache_url,
            runtime_token: &self.runtime_token,
        }
    }

    /// Values paired with the variable names they were read from.
    pub fn named_values<'a>(&'a self, names: &'a VariableNames) -> [(&'a str, &'a str); 3] {
        [
            (names.cache_url.as_str(), self.cache_url.as_str()),
            (names.runtime_url.as_str(), self.runtime_url.as_str()),
            (names.runtime_token.as_str(), self.runtime_token.as_str()),
        ]
    }
}

fn read_or_empty(env: &impl Environment, name: &str) -> String {
    read_value(env, name).unwrap_or_else(|reason| {
        tracing::warn!(variable = name, reason, "sealing an empty value");
        String::new()
    })
}

/// The variable's value, or why it can't be used.
fn read_value(env: &impl Environment, name: &str) -> Result<String, &'static str> {
    let raw = env.var_os(name).ok_or("variable is unset")?;
    raw.into_string().map_err(|_| "variable is not valid unicode")
}

impl fmt::Debug for RuntimeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeCredentials")
            .field("cache_url", &self.cache_url)
            .field("runtime_url", &self.runtime_url)
            .field("runtime_token", &"<redacted>")
            .finish()
    }
}

impl Drop for RuntimeCredentials {
    fn drop(&mut self) {
        self.cache_url.zeroize();
        self.runtime_url.zeroize();
        self.runtime_token.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::{read_value, RuntimeCredentials, VariableNames};
    use crate::environment::MapEnvironment;
    use serde_json::Value;

    fn sample_env() -> MapEnvironment {
        MapEnvironment::new()
            .with("ACTIONS_CACHE_URL", "https://artifactcache.example/abc/")
            .with("ACTIONS_RUNTIME_URL", "https://pipelines.example/abc/")
            .with("ACTIONS_RUNTIME_TOKEN", "eyJ0eXAi.token")
            .with("UNRELATED", "ignored")
    }

    #[test]
    fn serializes_exactly_three_named_fields() {
        let creds = RuntimeCredentials::from_environment(&sample_env(), &VariableNames::default());
        let value: Value = serde_json::to_value(&creds).expect("serializable");
        let object = value.as_object().expect("object");

        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3, "unexpected keys in record: {keys:?}");
        assert_eq!(object["ACTIONS_CACHE_URL"], "https://artifactcache.example/abc/");
        assert_eq!(object["ACTIONS_RUNTIME_URL"], "https://pipelines.example/abc/");
        assert_eq!(object["ACTIONS_RUNTIME_TOKEN"], "eyJ0eXAi.token");
    }

    #[test]
    fn unset_variables_become_empty_strings() {
        let env = MapEnvironment::new().with("ACTIONS_CACHE_URL", "https://cache/");
        let creds = RuntimeCredentials::from_environment(&env, &VariableNames::default());
        assert_eq!(creds.cache_url, "https://cache/");
        assert_eq!(creds.runtime_url, "");
        assert_eq!(creds.runtime_token, "");
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_value_is_reported_apart_from_unset() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let env = MapEnvironment::new()
            .with("ACTIONS_RUNTIME_TOKEN", OsString::from_vec(vec![0x74, 0xff, 0x6b]));
        assert_eq!(
            read_value(&env, "ACTIONS_RUNTIME_TOKEN"),
            Err("variable is not valid unicode")
        );
        assert_eq!(read_value(&env, "ACTIONS_CACHE_URL"), Err("variable is unset"));

        let creds = RuntimeCredentials::from_environment(&env, &VariableNames::default());
        assert_eq!(creds.runtime_token, "");
    }

    #[test]
    fn honours_overridden_variable_names() {
        let env = MapEnvironment::new()
            .with("MY_CACHE", "c")
            .with("MY_RUNTIME", "r")
            .with("MY_TOKEN", "t");
        let names = VariableNames {
            cache_url: "MY_CACHE".into(),
            runtime_url: "MY_RUNTIME".into(),
            runtime_token: "MY_TOKEN".into(),
        };
        let creds = RuntimeCredentials::from_environment(&env, &names);
        assert_eq!(creds.named_values(&names)[2], ("MY_TOKEN", "t"));
    }

    #[test]
    fn debug_output_redacts_token() {
        let creds = RuntimeCredentials::from_environment(&sample_env(), &VariableNames::default());
        let printed = format!("{creds:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("eyJ0eXAi"));
    }

    #[test]
    fn accepts_snake_case_aliases_but_rejects_extra_keys() {
        let parsed: RuntimeCredentials = serde_json::from_str(
            r#"{"cache_url":"c","runtime_url":"r","runtime_token":"t"}"#,
        )
        .expect("aliases accepted");
        assert_eq!(parsed.runtime_token, "t");

        let extra = serde_json::from_str::<RuntimeCredentials>(
            r#"{"ACTIONS_CACHE_URL":"c","ACTIONS_RUNTIME_URL":"r","ACTIONS_RUNTIME_TOKEN":"t","X":"y"}"#,
        );
        assert!(extra.is_err());
    }

    #[test]
    fn cache_view_drops_runtime_url() {
        let creds = RuntimeCredentials::from_environment(&sample_env(), &VariableNames::default());
        let value = serde_json::to_value(creds.cache_daemon_view()).expect("serializable");
        assert_eq!(
            value,
            serde_json::json!({
                "cache_url": "https://artifactcache.example/abc/",
                "runtime_token": "eyJ0eXAi.token"
            })
        );
    }
}
