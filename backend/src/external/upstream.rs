//! REST client for the upstream geometry, pivot and prescription services
//!
//! The planner owns no storage. Cell grids, saved management zones and
//! generated prescriptions all live behind these three services.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use shared::{
    CenterPivotRequest, LinearMoveRequest, MicroIrrigationRequest, PrescriptionResponse,
    SystemContext, ZoneDefinition,
};

use crate::config::UpstreamConfig;
use crate::error::{AppError, AppResult};

/// Cell grid of one irrigation system
#[derive(Debug, Clone, Deserialize)]
pub struct CellGridResponse {
    pub geojson: Value,
    #[serde(default)]
    pub center: Option<Value>,
}

/// Management zones saved for one irrigation system
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedZonesResponse {
    #[serde(default)]
    pub zones: Vec<ZoneDefinition>,
}

#[derive(Debug, Serialize)]
struct PrescriptionQuery<'a> {
    user_id: &'a str,
    farmname: &'a str,
    irrigation_system_name: &'a str,
    date: String,
}

/// Upstream REST client
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    geometry_url: Url,
    pivot_url: Url,
    prescription_url: Url,
}

impl UpstreamClient {
    /// Create a client sharing one connection pool with the configured timeout
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client(client, config)
    }

    /// Create a client around an existing reqwest client (for testing)
    pub fn with_client(client: Client, config: &UpstreamConfig) -> AppResult<Self> {
        Ok(Self {
            client,
            geometry_url: base_url("geometry", &config.geometry_url)?,
            pivot_url: base_url("pivot", &config.pivot_url)?,
            prescription_url: base_url("prescription", &config.prescription_url)?,
        })
    }

    /// Fetch the cell grid of an irrigation system
    pub async fn get_cell_grid(&self, ctx: &SystemContext) -> AppResult<CellGridResponse> {
        let url = endpoint(&self.geometry_url, ["geojson"].into_iter().chain(system_segments(ctx)));
        self.send(self.client.get(url), "cell grid").await
    }

    /// Fetch the management zones saved for an irrigation system
    pub async fn get_zones(&self, ctx: &SystemContext) -> AppResult<SavedZonesResponse> {
        let url = endpoint(
            &self.geometry_url,
            ["all", "management-zones"].into_iter().chain(system_segments(ctx)),
        );
        self.send(self.client.get(url), "management zones").await
    }

    /// Save a new management zone
    pub async fn save_zone(&self, zone: &ZoneDefinition) -> AppResult<Value> {
        let url = endpoint(&self.geometry_url, ["management-zones"]);
        self.send(self.client.post(url).json(zone), "save zone").await
    }

    /// Delete a saved management zone
    pub async fn delete_zone(&self, ctx: &SystemContext, zone_name: &str) -> AppResult<Value> {
        let url = endpoint(
            &self.geometry_url,
            ["management-zones"]
                .into_iter()
                .chain(system_segments(ctx))
                .chain([zone_name]),
        );
        self.send(self.client.delete(url), "delete zone").await
    }

    /// Create a center pivot
    pub async fn create_center_pivot(&self, request: &CenterPivotRequest) -> AppResult<Value> {
        self.send(self.client.post(self.pivot_url.clone()).json(request), "center pivot")
            .await
    }

    /// Generate the cell grid of a linear move
    pub async fn generate_linear_grid(&self, request: &LinearMoveRequest) -> AppResult<Value> {
        let url = endpoint(&self.geometry_url, ["linear", "generate-geojson"]);
        self.send(self.client.post(url).json(request), "linear grid").await
    }

    /// Generate the cell grid of a micro-irrigation block
    pub async fn generate_micro_grid(&self, request: &MicroIrrigationRequest) -> AppResult<Value> {
        let url = endpoint(&self.geometry_url, ["micro-irrigation", "generate-geojson"]);
        self.send(self.client.post(url).json(request), "micro-irrigation grid")
            .await
    }

    /// Generate the prescription map for one day
    pub async fn generate_prescription(
        &self,
        ctx: &SystemContext,
        date: NaiveDate,
    ) -> AppResult<PrescriptionResponse> {
        let url = endpoint(&self.prescription_url, ["generate-prescription-map"]);
        let query = PrescriptionQuery {
            user_id: &ctx.user_id,
            farmname: &ctx.farm_name,
            irrigation_system_name: &ctx.irrigation_system_name,
            date: date.format("%Y-%m-%d").to_string(),
        };
        self.send(self.client.get(url).query(&query), "prescription")
            .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> AppResult<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Upstream {} request failed: {}", what, e);
            AppError::Upstream(format!("{} request failed: {}", what, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Upstream {} returned {}: {}", what, status, body);
            return Err(AppError::Upstream(format!(
                "{} error: {} - {}",
                what, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse {} response: {}", what, e)))
    }
}

fn base_url(name: &str, url: &str) -> AppResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| AppError::Internal(format!("Invalid {} service URL {:?}: {}", name, url, e)))?;
    if parsed.cannot_be_a_base() {
        return Err(AppError::Internal(format!(
            "Invalid {} service URL {:?}: not a base URL",
            name, url
        )));
    }
    Ok(parsed)
}

/// Append path segments to a base URL; each segment is percent-encoded
fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn system_segments(ctx: &SystemContext) -> [&str; 3] {
    [
        ctx.user_id.as_str(),
        ctx.farm_name.as_str(),
        ctx.irrigation_system_name.as_str(),
    ]
}
