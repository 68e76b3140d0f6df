//! Client configuration and base URL construction.
//!
//! # Design
//! A config identifies a feature service either by an explicit `url` or by
//! the `catalog`/`service`/`type` triple plus an optional `layer`. Empty
//! strings count as absent, so a config deserialized from JSON with `""`
//! fields behaves like one where those fields were omitted.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ServiceError;

/// Default response format requested with every call.
pub const DEFAULT_FORMAT: &str = "json";

pub const ENV_URL: &str = "FEATURE_SERVICE_URL";
pub const ENV_TOKEN: &str = "FEATURE_SERVICE_TOKEN";
pub const ENV_FORMAT: &str = "FEATURE_SERVICE_FORMAT";

/// Connection settings for a `FeatureServiceClient`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    /// Layer index. JSON configs may give it as a string or an integer.
    #[serde(
        default,
        deserialize_with = "deserialize_layer",
        skip_serializing_if = "Option::is_none"
    )]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ClientConfig {
    /// Config pointing at an explicit feature service or feature layer URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Config assembled from a catalog root, service name and service type
    /// (e.g. `FeatureServer`).
    pub fn from_parts(
        catalog: impl Into<String>,
        service: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            catalog: Some(catalog.into()),
            service: Some(service.into()),
            service_type: Some(service_type.into()),
            ..Self::default()
        }
    }

    /// Read `FEATURE_SERVICE_URL`, `FEATURE_SERVICE_TOKEN` and
    /// `FEATURE_SERVICE_FORMAT` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            url: lookup(ENV_URL),
            token: lookup(ENV_TOKEN),
            format: lookup(ENV_FORMAT),
            ..Self::default()
        }
    }

    pub fn with_layer(mut self, layer: impl ToString) -> Self {
        self.layer = Some(layer.to_string());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Check that the config identifies a feature service.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let has_url = present(&self.url).is_some();
        let has_parts = present(&self.catalog).is_some()
            && present(&self.service).is_some()
            && present(&self.service_type).is_some();
        if has_url || has_parts {
            Ok(())
        } else {
            Err(ServiceError::missing_identification())
        }
    }

    /// Derive the base endpoint. An explicit `url` wins verbatim; otherwise
    /// `catalog/service/type[/layer]`. Call `validate` first.
    pub fn build_url(&self) -> String {
        if let Some(url) = present(&self.url) {
            return url.to_string();
        }
        let mut url = [&self.catalog, &self.service, &self.service_type]
            .iter()
            .map(|part| present(part).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("/");
        if let Some(layer) = present(&self.layer) {
            url.push('/');
            url.push_str(layer);
        }
        url
    }

    /// The token, if set and non-empty.
    pub fn token(&self) -> Option<&str> {
        present(&self.token)
    }

    /// The requested response format, falling back to `json`.
    pub fn format(&self) -> &str {
        present(&self.format).unwrap_or(DEFAULT_FORMAT)
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn deserialize_layer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Layer {
        Index(u64),
        Name(String),
    }

    Ok(Option::<Layer>::deserialize(deserializer)?.map(|layer| match layer {
        Layer::Index(i) => i.to_string(),
        Layer::Name(s) => s,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parts_join_with_slashes() {
        let config = ClientConfig::from_parts("c", "s", "t");
        assert_eq!(config.build_url(), "c/s/t");
    }

    #[test]
    fn layer_is_appended() {
        let config = ClientConfig::from_parts("c", "s", "t").with_layer("5");
        assert_eq!(config.build_url(), "c/s/t/5");
    }

    #[test]
    fn url_overrides_parts() {
        let config = ClientConfig {
            url: Some("x".to_string()),
            ..ClientConfig::from_parts("c", "s", "t").with_layer(5)
        };
        assert_eq!(config.build_url(), "x");
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = ClientConfig::default().validate().unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn partial_triple_is_rejected() {
        let config = ClientConfig {
            catalog: Some("c".to_string()),
            service: Some("s".to_string()),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let config = ClientConfig::from_url("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn url_alone_is_enough() {
        assert!(ClientConfig::from_url("http://host/FeatureServer/0").validate().is_ok());
    }

    #[test]
    fn format_defaults_to_json() {
        assert_eq!(ClientConfig::from_url("x").format(), "json");
        assert_eq!(ClientConfig::from_url("x").with_format("pjson").format(), "pjson");
    }

    #[test]
    fn deserializes_numeric_layer() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"catalog":"c","service":"s","type":"t","layer":0}"#).unwrap();
        assert_eq!(config.layer.as_deref(), Some("0"));
        assert_eq!(config.build_url(), "c/s/t/0");
    }

    #[test]
    fn deserializes_string_layer_and_token() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url":"x","layer":"3","token":"abc"}"#).unwrap();
        assert_eq!(config.layer.as_deref(), Some("3"));
        assert_eq!(config.token(), Some("abc"));
    }

    #[test]
    fn from_lookup_reads_variables() {
        let vars: HashMap<&str, &str> = [
            (ENV_URL, "http://host/FeatureServer/1"),
            (ENV_TOKEN, "secret"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.url.as_deref(), Some("http://host/FeatureServer/1"));
        assert_eq!(config.token(), Some("secret"));
        assert_eq!(config.format(), "json");
    }
}
