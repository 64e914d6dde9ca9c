//! Render charts described in URL query parameters to PNG images.
//!
//! A request goes through four stages: [`input`] picks one of the input
//! modes and produces a raw intent, [`chart::normalize`] turns that into a
//! fully defaulted [`chart::ChartSpec`], [`render`] draws it as SVG and
//! rasterizes it, and [`server`] wraps the result in an HTTP response.

pub mod chart;
pub mod config;
pub mod error;
pub mod expr;
pub mod fonts;
pub mod input;
pub mod render;
pub mod server;
pub mod service;

pub use config::ServerConfig;
pub use error::{ChartError, ChartResult};
pub use service::ChartService;
