//! ============================================================================
//! Remote Inventory Gateway - Backend API Boundary
//! ============================================================================
//! Stateless interface to the pantry vision backend. Everything the engine
//! knows about the server comes through [`InventoryGateway`]; the HTTP
//! implementation lives here, tests substitute their own.
//!
//! Any call may fail with a network or server error; callers surface the
//! failure and never let it crash a polling loop.
//! ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::SyncConfig;
use crate::types::{
    AnalyticsSnapshot, ChangeEntry, Device, DeviceHealth, ExportFormat, InventoryItem,
    OverridePayload, PantryError, Result, Task,
};

/// The backend API boundary. One method per consumed endpoint.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// `GET /v1/inventory` - full authoritative item snapshot.
    async fn fetch_items(&self) -> Result<Vec<InventoryItem>>;

    /// `POST /v1/inventory/override` - write an absolute count correction.
    async fn post_override(&self, payload: &OverridePayload) -> Result<()>;

    /// `GET /v1/inventory/stats` - server-computed aggregate statistics.
    async fn fetch_stats(&self) -> Result<AnalyticsSnapshot>;

    /// `GET /v1/inventory/low-stock?threshold=N`.
    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<InventoryItem>>;

    /// `GET /v1/inventory/stale-items?days_threshold=N`.
    async fn fetch_stale(&self, days_threshold: u32) -> Result<Vec<InventoryItem>>;

    /// `GET /v1/inventory/recent-changes?hours=N`.
    async fn fetch_recent_changes(&self, hours: u32) -> Result<Vec<ChangeEntry>>;

    /// `GET /v1/devices`.
    async fn fetch_devices(&self) -> Result<Vec<Device>>;

    /// `GET /v1/devices/{id}/health`.
    async fn fetch_device_health(&self, id: &str) -> Result<DeviceHealth>;

    /// `DELETE /v1/devices/{id}`.
    async fn delete_device(&self, id: &str) -> Result<()>;

    /// `GET /v1/admin/tasks`.
    async fn fetch_tasks(&self) -> Result<Vec<Task>>;

    /// `GET /v1/inventory/export?format=json|csv` - raw export content.
    async fn export_inventory(&self, format: ExportFormat) -> Result<String>;

    /// `POST /v1/admin/capture-manual` - upload an image for analysis.
    /// The ack is asynchronous; callers must poll inventory afterward.
    async fn trigger_manual_capture(&self, image: Vec<u8>) -> Result<String>;
}

// Response envelopes the backend wraps its payloads in.

#[derive(Deserialize)]
struct ItemsEnvelope {
    items: Vec<InventoryItem>,
}

#[derive(Deserialize)]
struct DevicesEnvelope {
    items: Vec<Device>,
}

#[derive(Deserialize)]
struct TasksEnvelope {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct ChangesEnvelope {
    changes: Vec<ChangeEntry>,
}

#[derive(Deserialize)]
struct CsvEnvelope {
    content: String,
}

#[derive(Deserialize)]
struct CaptureAck {
    capture_id: String,
}

/// HTTP implementation of [`InventoryGateway`] backed by `reqwest`.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.post(self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.delete(self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let resp = self.get(path).send().await.map_err(to_network_error)?;
        let resp = check_status(resp, path).await?;
        resp.json().await.map_err(to_network_error)
    }
}

fn to_network_error(err: reqwest::Error) -> PantryError {
    PantryError::Network(err.to_string())
}

/// Map a non-success response into the error taxonomy. 404 becomes
/// [`PantryError::NotFound`] so callers can tell a missing target from a
/// rejected write.
async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        let what = if detail.is_empty() { what.to_string() } else { detail };
        Err(PantryError::NotFound(what))
    } else {
        Err(PantryError::Server {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl InventoryGateway for HttpGateway {
    async fn fetch_items(&self) -> Result<Vec<InventoryItem>> {
        let envelope: ItemsEnvelope = self.get_json("/v1/inventory").await?;
        Ok(envelope.items)
    }

    async fn post_override(&self, payload: &OverridePayload) -> Result<()> {
        debug!("POST /v1/inventory/override item={}", payload.item_name);
        let resp = self
            .post("/v1/inventory/override")
            .json(payload)
            .send()
            .await
            .map_err(to_network_error)?;
        check_status(resp, &payload.item_name).await?;
        Ok(())
    }

    async fn fetch_stats(&self) -> Result<AnalyticsSnapshot> {
        self.get_json("/v1/inventory/stats").await
    }

    async fn fetch_low_stock(&self, threshold: u32) -> Result<Vec<InventoryItem>> {
        let path = format!("/v1/inventory/low-stock?threshold={threshold}");
        let envelope: ItemsEnvelope = self.get_json(&path).await?;
        Ok(envelope.items)
    }

    async fn fetch_stale(&self, days_threshold: u32) -> Result<Vec<InventoryItem>> {
        let path = format!("/v1/inventory/stale-items?days_threshold={days_threshold}");
        let envelope: ItemsEnvelope = self.get_json(&path).await?;
        Ok(envelope.items)
    }

    async fn fetch_recent_changes(&self, hours: u32) -> Result<Vec<ChangeEntry>> {
        let path = format!("/v1/inventory/recent-changes?hours={hours}");
        let envelope: ChangesEnvelope = self.get_json(&path).await?;
        Ok(envelope.changes)
    }

    async fn fetch_devices(&self) -> Result<Vec<Device>> {
        let envelope: DevicesEnvelope = self.get_json("/v1/devices").await?;
        Ok(envelope.items)
    }

    async fn fetch_device_health(&self, id: &str) -> Result<DeviceHealth> {
        self.get_json(&format!("/v1/devices/{id}/health")).await
    }

    async fn delete_device(&self, id: &str) -> Result<()> {
        debug!("DELETE /v1/devices/{}", id);
        let resp = self
            .delete(&format!("/v1/devices/{id}"))
            .send()
            .await
            .map_err(to_network_error)?;
        check_status(resp, &format!("device {id}")).await?;
        Ok(())
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let envelope: TasksEnvelope = self.get_json("/v1/admin/tasks").await?;
        Ok(envelope.tasks)
    }

    async fn export_inventory(&self, format: ExportFormat) -> Result<String> {
        let path = format!("/v1/inventory/export?format={format}");
        match format {
            // JSON exports come back as the document itself; hand the body
            // through untouched.
            ExportFormat::Json => {
                let resp = self.get(&path).send().await.map_err(to_network_error)?;
                let resp = check_status(resp, "inventory export").await?;
                resp.text().await.map_err(to_network_error)
            }
            // CSV exports are wrapped in a {content} envelope.
            ExportFormat::Csv => {
                let envelope: CsvEnvelope = self.get_json(&path).await?;
                Ok(envelope.content)
            }
        }
    }

    async fn trigger_manual_capture(&self, image: Vec<u8>) -> Result<String> {
        debug!("POST /v1/admin/capture-manual ({} bytes)", image.len());
        let resp = self
            .post("/v1/admin/capture-manual")
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image)
            .send()
            .await
            .map_err(to_network_error)?;
        let resp = check_status(resp, "manual capture").await?;
        let ack: CaptureAck = resp.json().await.map_err(to_network_error)?;
        Ok(ack.capture_id)
    }
}
