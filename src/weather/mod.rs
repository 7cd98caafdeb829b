//! Example domain: historical weather observations.

pub mod store;
pub mod tools;

pub use store::{Document, InMemoryStore, StationCount, StoreError, WeatherStore};
pub use tools::{
    PressureTrendTool, StationMetadataTool, StationsSummaryTool, TemperatureAtTimeTool,
    WindDataTool, register_weather_tools,
};
