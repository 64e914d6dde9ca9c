use std::sync::Arc;

use crate::chart::{ChartSpec, InputMode, normalize};
use crate::config::ServerConfig;
use crate::error::{ChartError, ChartResult};
use crate::fonts::{CosmicTextMeasure, SharedMeasure};
use crate::input::{self, Fetch, QueryParams};
use crate::render::{ChartRenderer, Frame, Rasterizer};

/// The blocking request pipeline: parameters in, PNG bytes out.
///
/// Cloning is cheap; every clone shares the fetcher, the font database and
/// the measurement cache.
#[derive(Clone)]
pub struct ChartService {
    config: Arc<ServerConfig>,
    fetcher: Arc<dyn Fetch>,
    measure: SharedMeasure,
    rasterizer: Rasterizer,
}

impl ChartService {
    pub fn new(config: ServerConfig, fetcher: Arc<dyn Fetch>) -> Self {
        let measure = CosmicTextMeasure::shared(config.measure_cache_capacity);
        Self::with_parts(config, fetcher, measure, Rasterizer::new())
    }

    pub fn with_parts(
        config: ServerConfig,
        fetcher: Arc<dyn Fetch>,
        measure: SharedMeasure,
        rasterizer: Rasterizer,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            measure,
            rasterizer,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Resolve and normalize the chart a request describes.
    pub fn prepare(&self, params: &QueryParams) -> ChartResult<(ChartSpec, Frame)> {
        let selected = input::select_mode(params);
        let (width, height) = input::output_size(
            params,
            selected,
            self.config.default_size(),
            self.config.max_dimension,
        );
        let frame = Frame::new(width, height).with_background(input::background_color(params));

        let (mode, intent) = input::resolve_blocking(params, self.fetcher.as_ref())?;
        let spec = normalize(intent, mode)?;
        tracing::info!(
            mode = mode.as_str(),
            width,
            height,
            chart = %serde_json::to_string(&spec).unwrap_or_default(),
            "chart resolved"
        );
        Ok((spec, frame))
    }

    pub fn svg(&self, spec: &ChartSpec, frame: &Frame) -> ChartResult<String> {
        ChartRenderer::new(self.config.style.clone(), self.measure.clone()).render_svg(spec, frame)
    }

    pub fn png(&self, svg: &str) -> ChartResult<Vec<u8>> {
        self.rasterizer.png(svg)
    }

    /// The whole pipeline. Failures are logged with the input that caused them.
    pub fn render_query(&self, params: &QueryParams) -> ChartResult<Vec<u8>> {
        let result = self
            .prepare(params)
            .and_then(|(spec, frame)| self.svg(&spec, &frame))
            .and_then(|svg| self.png(&svg));
        if let Err(err) = &result {
            log_failure(params, err);
        }
        result
    }

    pub fn error_svg(&self, err: &ChartError) -> String {
        ChartRenderer::new(self.config.style.clone(), self.measure.clone())
            .error_svg(&err.to_string())
    }

    /// The PNG shown in place of a chart that failed.
    pub fn error_png(&self, err: &ChartError) -> ChartResult<Vec<u8>> {
        self.png(&self.error_svg(err))
    }
}

fn log_failure(params: &QueryParams, err: &ChartError) {
    let mode = input::select_mode(params);
    let raw = raw_input(params, mode);
    match err {
        ChartError::RemoteFetch { url, source } => {
            tracing::error!(kind = err.kind(), url = %url, cause = %source, "failed to fetch chart");
        }
        _ => {
            tracing::error!(
                kind = err.kind(),
                mode = mode.map(InputMode::as_str).unwrap_or("none"),
                input = %raw,
                error = %err,
                "chart request failed"
            );
        }
    }
}

/// The parameters that carried the chart, for logs.
fn raw_input(params: &QueryParams, mode: Option<InputMode>) -> String {
    let keys: &[&str] = match mode {
        Some(InputMode::Inline) => &["c"],
        Some(InputMode::Template) => &["t", "k", "v", "z"],
        Some(InputMode::Simplified) => &[
            "z", "template", "x", "values", "y", "labelMode", "w", "v", "time",
        ],
        Some(InputMode::Remote) => &["url"],
        None => &[],
    };
    keys.iter()
        .filter_map(|key| params.get(key).map(|value| format!("{}={}", key, value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_input_lists_mode_parameters() {
        let params: QueryParams = [("t", "bar"), ("k", "[1]"), ("h", "100")].into_iter().collect();
        assert_eq!(
            raw_input(&params, Some(InputMode::Template)),
            "t=bar&k=[1]"
        );
        assert_eq!(raw_input(&params, None), "");
    }
}
