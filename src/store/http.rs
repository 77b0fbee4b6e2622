//! ClickHouse HTTP interface client.
//!
//! Statements are sent as the POST body. Inserts put the
//! `INSERT ... FORMAT JSONEachRow` query in the URL and stream one JSON
//! object per row as the body.

use std::time::Duration;

use log::{debug, trace};
use reqwest::blocking::{Client, Response};

use crate::batch::Row;
use crate::store::{Store, StoreError};

/// Default ClickHouse HTTP endpoint.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8123";

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            database: None,
            user: None,
            password: None,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Blocking ClickHouse client. One instance is one connection pool owned
/// by a single load; it is released when the value is dropped.
pub struct HttpStore {
    client: Client,
    config: StoreConfig,
}

impl HttpStore {
    pub fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        debug!("ClickHouse client ready for {}", config.url);
        Ok(Self { client, config })
    }

    fn post(&self, query: Option<&str>, body: Vec<u8>) -> Result<(), StoreError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(database) = self.config.database.as_deref() {
            params.push(("database", database));
        }
        if let Some(query) = query {
            params.push(("query", query));
        }

        let mut request = self.client.post(&self.config.url).query(&params).body(body);
        if let Some(user) = self.config.user.as_deref() {
            request = request.header("X-ClickHouse-User", user);
        }
        if let Some(password) = self.config.password.as_deref() {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        check_response(response)
    }
}

fn check_response(response: Response) -> Result<(), StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response
        .text()
        .unwrap_or_else(|e| format!("<unreadable response body: {}>", e));
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: message.trim().to_string(),
    })
}

/// `INSERT` query for the HTTP interface.
pub fn insert_query(table: &str, columns: &[String]) -> String {
    let columns: Vec<String> = columns.iter().map(|c| format!("`{}`", c)).collect();
    format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow",
        table,
        columns.join(", ")
    )
}

/// Encode rows as newline-delimited JSON objects.
pub fn encode_json_each_row(rows: &[Row]) -> Result<Vec<u8>, StoreError> {
    let mut body = Vec::with_capacity(rows.len() * 64);
    for row in rows {
        serde_json::to_writer(&mut body, row).map_err(|e| StoreError::Encoding(e.to_string()))?;
        body.push(b'\n');
    }
    Ok(body)
}

impl Store for HttpStore {
    fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        trace!("POST {}: {}", self.config.url, statement);
        self.post(None, statement.as_bytes().to_vec())
    }

    fn insert(&mut self, table: &str, columns: &[String], rows: &[Row]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let query = insert_query(table, columns);
        let body = encode_json_each_row(rows)?;
        trace!("POST {}: {} ({} bytes)", self.config.url, query, body.len());
        self.post(Some(&query), body)
    }

    fn describe(&self) -> String {
        match &self.config.database {
            Some(db) => format!("ClickHouse at {} (database {})", self.config.url, db),
            None => format!("ClickHouse at {}", self.config.url),
        }
    }
}

impl Drop for HttpStore {
    fn drop(&mut self) {
        debug!("Closing ClickHouse client for {}", self.config.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Value;

    #[test]
    fn test_insert_query() {
        let columns = vec!["start_time".to_string(), "topic".to_string()];
        assert_eq!(
            insert_query("zoom_meetings", &columns),
            "INSERT INTO zoom_meetings (`start_time`, `topic`) FORMAT JSONEachRow"
        );
    }

    #[test]
    fn test_encode_json_each_row() {
        let rows: Vec<Row> = vec![
            [("id".to_string(), Value::Int(1)), ("t".to_string(), Value::Str("a".to_string()))]
                .into_iter()
                .collect(),
            [("id".to_string(), Value::Int(2)), ("t".to_string(), Value::Str("NULL".to_string()))]
                .into_iter()
                .collect(),
        ];
        let body = String::from_utf8(encode_json_each_row(&rows).unwrap()).unwrap();
        assert_eq!(body, "{\"id\":1,\"t\":\"a\"}\n{\"id\":2,\"t\":\"NULL\"}\n");
    }

    #[test]
    fn test_describe() {
        let store = HttpStore::connect(StoreConfig {
            database: Some("analytics".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            store.describe(),
            "ClickHouse at http://127.0.0.1:8123 (database analytics)"
        );
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        let mut store = HttpStore::connect(StoreConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        let err = store.execute("SELECT 1").unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
