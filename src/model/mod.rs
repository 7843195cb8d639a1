pub mod json_config;
pub mod params;
pub mod unit;
