//! REST client for the instrument back office API.

use super::{
    CatalogProvider, CompanyService, DuplicateCheck, InstrumentLookup, InstrumentStore,
    ServiceError, WorkQueue,
};
use crate::domain::{fields, CatalogEntry, Company, InstrumentRecord};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const PAGE_SIZE: usize = 500;
const COMPANY_SEARCH_LIMIT: usize = 20;

/// Every collaborator served by one HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    max_elapsed: Duration,
}

impl HttpBackend {
    pub fn new(base_url: String, max_elapsed: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_elapsed,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ServiceError::Other(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::Other("Base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request with retry. Network failures, 429 and 5xx are retried;
    /// other statuses fail immediately.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        let url = self.url(segments)?;
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let mut request = self.client.request(method.clone(), url.clone()).query(query);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await.map_err(|e| {
                backoff::Error::transient(ServiceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(backoff::Error::transient(ServiceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(ServiceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                let message = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| "Client error".to_string());
                return Err(backoff::Error::permanent(client_error(status, message)));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ServiceError::ParseError(e.to_string())))
        })
        .await
    }

    async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value, ServiceError> {
        self.send(Method::GET, segments, query, None).await
    }
}

fn client_error(status: StatusCode, message: String) -> ServiceError {
    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        StatusCode::CONFLICT => ServiceError::Conflict(message),
        _ => ServiceError::HttpError {
            status: status.as_u16(),
            message,
        },
    }
}

/// Responses come wrapped as `{"success": .., "data": ..}`.
fn envelope_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(envelope_data(value)).map_err(|e| ServiceError::ParseError(e.to_string()))
}

/// Value and label keys of each catalog's raw rows.
fn catalog_keys(name: &str) -> (&'static str, &'static str) {
    match name {
        "paises" => ("code", "ShortName"),
        "monedas" => ("id", "descripcion"),
        "sectoresGICS" | "yieldTypes" => ("code", "nombre"),
        "dataSources" | "yieldSources" => ("nombre", "nombre"),
        _ => ("id", "nombre"),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_catalog_entry(name: &str, row: &Value) -> Result<CatalogEntry, ServiceError> {
    let (value_key, label_key) = catalog_keys(name);
    let value = row
        .get(value_key)
        .or_else(|| row.get("id"))
        .and_then(scalar_text)
        .ok_or_else(|| ServiceError::ParseError(format!("Missing {} in {}", value_key, name)))?;
    let label = [label_key, "Description", "nombre", "name", "descripcion"]
        .iter()
        .find_map(|k| row.get(*k).and_then(scalar_text))
        .unwrap_or_else(|| value.clone());
    let activo = match row.get("activo") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() != Some(0),
        _ => true,
    };
    Ok(CatalogEntry {
        value,
        label,
        description: row.get("descripcion").and_then(scalar_text),
        activo,
    })
}

#[async_trait]
impl CatalogProvider for HttpBackend {
    async fn fetch(&self, name: &str) -> Result<Vec<CatalogEntry>, ServiceError> {
        debug!("Fetching catalog {}", name);
        let rows = envelope_data(self.get(&["catalogos", name], &[]).await?);
        let rows = rows
            .as_array()
            .ok_or_else(|| ServiceError::ParseError("Expected array response".to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match parse_catalog_entry(name, row) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Failed to parse catalog entry: {}", e),
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl InstrumentLookup for HttpBackend {
    async fn get_by_id_and_currency(
        &self,
        id: &str,
        currency: &str,
    ) -> Result<Option<InstrumentRecord>, ServiceError> {
        debug!("Fetching instrument id={}, moneda={}", id, currency);
        match self.get(&["instrumentos", id, "moneda", currency], &[]).await {
            Ok(value) => parse(value).map(Some),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn next_id(&self) -> Result<i64, ServiceError> {
        let data = envelope_data(self.get(&["instrumentos", "next-id"], &[]).await?);
        data.get("nextId")
            .and_then(Value::as_i64)
            .ok_or_else(|| ServiceError::ParseError("Missing nextId".to_string()))
    }

    async fn get_all(&self) -> Result<Vec<InstrumentRecord>, ServiceError> {
        let mut all: Vec<InstrumentRecord> = Vec::new();
        let mut page = 1usize;
        loop {
            let query = [
                ("page", page.to_string()),
                ("limit", PAGE_SIZE.to_string()),
                ("orderBy", fields::ID_INSTRUMENTO.to_string()),
                ("order", "ASC".to_string()),
            ];
            let response = self.get(&["instrumentos"], &query).await?;
            let total = response
                .get("pagination")
                .and_then(|p| p.get("total"))
                .and_then(Value::as_u64)
                .map(|t| t as usize);
            let batch: Vec<InstrumentRecord> = parse(response)?;
            let fetched = batch.len();
            all.extend(batch);

            let done = match total {
                Some(total) => all.len() >= total,
                None => fetched < PAGE_SIZE,
            };
            if done || fetched == 0 {
                break;
            }
            page += 1;
        }
        debug!("Loaded {} instruments in {} pages", all.len(), page);
        Ok(all)
    }

    async fn check_duplicate(
        &self,
        field: &str,
        value: &str,
        exclude_id: Option<&str>,
    ) -> Result<DuplicateCheck, ServiceError> {
        let mut query = vec![("field", field.to_string()), ("value", value.to_string())];
        if let Some(id) = exclude_id {
            query.push(("excludeId", id.to_string()));
        }
        let response = self.get(&["instrumentos", "check-duplicate"], &query).await?;
        serde_json::from_value(response).map_err(|e| ServiceError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl CompanyService for HttpBackend {
    async fn search(&self, text: &str) -> Result<Vec<Company>, ServiceError> {
        let query = [
            ("q", text.to_string()),
            ("limit", COMPANY_SEARCH_LIMIT.to_string()),
        ];
        parse(self.get(&["companias", "search"], &query).await?)
    }

    async fn get_exact(&self, name: &str) -> Result<Option<Company>, ServiceError> {
        match self.get(&["companias", "exacta", name], &[]).await {
            Ok(value) => match envelope_data(value) {
                Value::Null => Ok(None),
                data => serde_json::from_value(data)
                    .map(Some)
                    .map_err(|e| ServiceError::ParseError(e.to_string())),
            },
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, company: &Company) -> Result<Company, ServiceError> {
        let body = serde_json::to_value(company).map_err(|e| ServiceError::Other(e.to_string()))?;
        parse(self.send(Method::POST, &["companias"], &[], Some(&body)).await?)
    }
}

#[async_trait]
impl InstrumentStore for HttpBackend {
    async fn create(&self, record: &InstrumentRecord) -> Result<(), ServiceError> {
        let body = serde_json::to_value(record).map_err(|e| ServiceError::Other(e.to_string()))?;
        self.send(Method::POST, &["instrumentos"], &[], Some(&body)).await?;
        Ok(())
    }

    async fn update(&self, id: &str, record: &InstrumentRecord) -> Result<(), ServiceError> {
        let currency = record.text(fields::MONEDA);
        let body = serde_json::to_value(record).map_err(|e| ServiceError::Other(e.to_string()))?;
        self.send(Method::PUT, &["instrumentos", id, &currency], &[], Some(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for HttpBackend {
    async fn mark_completed(&self, queue_item_id: &str) -> Result<(), ServiceError> {
        let body = serde_json::json!({ "estado": "completado" });
        self.send(
            Method::PATCH,
            &["cola-pendientes", queue_item_id, "estado"],
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }
}
