use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::store::{Document, TIMESTAMP_FIELD, WeatherStore, parse_timestamp};
use crate::tool::{ParamSpec, Tool, ToolError, ToolRegistry, decode_args, params_from_schema};

const DEFAULT_TREND_LIMIT: usize = 10;

/// Registers every weather tool against `store`.
pub fn register_weather_tools(registry: &mut ToolRegistry, store: Arc<dyn WeatherStore>) {
    registry.register(Arc::new(StationMetadataTool::new(store.clone())));
    registry.register(Arc::new(TemperatureAtTimeTool::new(store.clone())));
    registry.register(Arc::new(WindDataTool::new(store.clone())));
    registry.register(Arc::new(StationsSummaryTool::new(store.clone())));
    registry.register(Arc::new(PressureTrendTool::new(store)));
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct StationArgs {
    #[serde(rename = "callLetters")]
    call_letters: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct TemperatureArgs {
    #[serde(rename = "callLetters")]
    call_letters: String,
    timestamp: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct TrendArgs {
    #[serde(rename = "callLetters")]
    call_letters: String,
    #[serde(default = "default_trend_limit")]
    limit: usize,
}

fn default_trend_limit() -> usize {
    DEFAULT_TREND_LIMIT
}

fn error_payload(message: &str) -> Value {
    json!({ "error": message })
}

fn field(doc: &Document, name: &str) -> Value {
    doc.get(name).cloned().unwrap_or(Value::Null)
}

/// Pressure readings count only when they carry a value: null, `false`,
/// zero, empty strings and empty containers are all treated as missing.
fn has_reading(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
    }
}

/// Station position, elevation and provenance.
pub struct StationMetadataTool {
    store: Arc<dyn WeatherStore>,
}

impl StationMetadataTool {
    pub fn new(store: Arc<dyn WeatherStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for StationMetadataTool {
    fn name(&self) -> &str {
        "get_station_metadata"
    }

    fn description(&self) -> &str {
        "Get metadata about a weather station given its call letters."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        params_from_schema::<StationArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let args: StationArgs = decode_args(&args)?;
        let Some(station) = self.store.find_station(&args.call_letters).await? else {
            return Ok(error_payload("Station not found"));
        };

        Ok(json!({
            "position": field(&station, "position"),
            "elevation": field(&station, "elevation"),
            "type": field(&station, "type"),
            "dataSource": field(&station, "dataSource"),
            "qualityControlProcess": field(&station, "qualityControlProcess"),
        }))
    }
}

/// Air temperature at an exact observation time.
pub struct TemperatureAtTimeTool {
    store: Arc<dyn WeatherStore>,
}

impl TemperatureAtTimeTool {
    pub fn new(store: Arc<dyn WeatherStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TemperatureAtTimeTool {
    fn name(&self) -> &str {
        "get_temperature_at_time"
    }

    fn description(&self) -> &str {
        "Get air temperature for a station at a given ISO timestamp."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        params_from_schema::<TemperatureArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let args: TemperatureArgs = decode_args(&args)?;
        if parse_timestamp(&args.timestamp).is_none() {
            return Ok(error_payload(
                "Invalid timestamp format. Use ISO format: YYYY-MM-DDTHH:MM:SS",
            ));
        }

        let observation = self.store.find_at(&args.call_letters, &args.timestamp).await?;
        match observation.and_then(|doc| doc.get("airTemperature").cloned()) {
            Some(temperature) => Ok(temperature),
            None => Ok(error_payload("No temperature data for this time")),
        }
    }
}

/// Wind conditions from the latest observation.
pub struct WindDataTool {
    store: Arc<dyn WeatherStore>,
}

impl WindDataTool {
    pub fn new(store: Arc<dyn WeatherStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WindDataTool {
    fn name(&self) -> &str {
        "get_wind_data"
    }

    fn description(&self) -> &str {
        "Return latest wind info for the station."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        params_from_schema::<StationArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let args: StationArgs = decode_args(&args)?;
        let Some(doc) = self.store.latest(&args.call_letters).await? else {
            return Ok(error_payload("No data for this station"));
        };

        Ok(json!({
            "timestamp": field(&doc, TIMESTAMP_FIELD),
            "wind": doc.get("wind").cloned().unwrap_or_else(|| json!("No wind data")),
        }))
    }
}

/// Observation counts for every station.
pub struct StationsSummaryTool {
    store: Arc<dyn WeatherStore>,
}

impl StationsSummaryTool {
    pub fn new(store: Arc<dyn WeatherStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for StationsSummaryTool {
    fn name(&self) -> &str {
        "get_all_stations_summary"
    }

    fn description(&self) -> &str {
        "Return the count of documents per station."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        params_from_schema::<NoArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let _: NoArgs = decode_args(&args)?;
        let counts = self.store.count_by_station().await?;
        let stations =
            serde_json::to_value(counts).map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(json!({ "stations": stations }))
    }
}

/// Recent pressure readings, oldest to newest.
pub struct PressureTrendTool {
    store: Arc<dyn WeatherStore>,
}

impl PressureTrendTool {
    pub fn new(store: Arc<dyn WeatherStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for PressureTrendTool {
    fn name(&self) -> &str {
        "get_pressure_trend"
    }

    fn description(&self) -> &str {
        "Return the last N pressure values for a station."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        params_from_schema::<TrendArgs>()
    }

    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let args: TrendArgs = decode_args(&args)?;
        let docs = self.store.recent(&args.call_letters, args.limit).await?;

        // Newest first from the store; the trend reads oldest to newest.
        let trend: Vec<Value> = docs
            .iter()
            .rev()
            .filter(|doc| has_reading(doc.get("pressure")))
            .map(|doc| {
                json!({
                    "ts": field(doc, TIMESTAMP_FIELD),
                    "pressure": field(doc, "pressure"),
                })
            })
            .collect();
        Ok(Value::Array(trend))
    }
}
