use anyhow::{anyhow, Result};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::record::RecordMap;

/// REST client for the realtime database tree.
///
/// Every node is addressed as `{base_url}/{path}.json`. Reads of a missing
/// node return JSON `null`, which surfaces here as `None`.
#[derive(Clone)]
pub struct RealtimeDatabase {
    client: Client,
    base_url: String,
    secret: String,
}

impl RealtimeDatabase {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.database_url.trim_end_matches('/').to_string(),
            secret: config.database_secret.clone(),
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.node_url(path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).query(query);

        // Caller tokens take precedence so database rules see the end user.
        match auth_token {
            Some(token) => req = req.query(&[("auth", token)]),
            None if !self.secret.is_empty() => req = req.query(&[("auth", self.secret.as_str())]),
            None => {}
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Database error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Permission denied: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Database error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Reads a node. `None` when nothing is stored at `path`.
    pub async fn get(&self, path: &str, auth_token: Option<&str>) -> Result<Option<Value>> {
        let value: Value = self.request(Method::GET, path, auth_token, &[], None).await?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Replaces the node at `path`.
    pub async fn put(&self, path: &str, auth_token: Option<&str>, body: Value) -> Result<Value> {
        self.request(Method::PUT, path, auth_token, &[], Some(body)).await
    }

    /// Merges the given children into the node at `path`.
    pub async fn patch(&self, path: &str, auth_token: Option<&str>, body: Value) -> Result<Value> {
        self.request(Method::PATCH, path, auth_token, &[], Some(body)).await
    }

    /// Child nodes of `path` as `(key, value)` pairs in key order.
    pub async fn children(&self, path: &str, auth_token: Option<&str>) -> Result<Vec<(String, Value)>> {
        let node = self.get(path, auth_token).await?;
        Ok(into_children(node))
    }

    /// Children of `path` whose `child` field equals `value`.
    pub async fn query_equal(
        &self,
        path: &str,
        child: &str,
        value: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<(String, Value)>> {
        let query = [
            ("orderBy", format!("\"{}\"", child)),
            ("equalTo", format!("\"{}\"", value)),
        ];
        let node: Value = self.request(Method::GET, path, auth_token, &query, None).await?;
        Ok(into_children(match node {
            Value::Null => None,
            other => Some(other),
        }))
    }
}

fn into_children(node: Option<Value>) -> Vec<(String, Value)> {
    match node {
        Some(Value::Object(map)) => {
            let map: RecordMap = map;
            map.into_iter().collect()
        }
        // Sequential integer keys come back as a JSON array with null holes.
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}
