//! Request parameters to raw chart intents.

mod decode;
mod fetch;

use std::collections::HashMap;

use serde_json::Value;

use crate::chart::labels::{self, BucketMode};
use crate::chart::types::label_text;
use crate::chart::{DataPoint, InputMode, RawIntent, TemplateIntent};
use crate::error::{ChartError, ChartResult};
use crate::expr;

pub use decode::{decode_component, parse_leading_int};
pub use fetch::{Fetch, UreqFetcher};

/// Query parameters of one chart request. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    /// Parse a raw `a=1&b=2` query with the same form decoding the HTTP
    /// layer applies, so values reach [`resolve`] decoded exactly once.
    pub fn parse(query: &str) -> ChartResult<Self> {
        serde_urlencoded::from_str(query.trim_start_matches('?'))
            .map(Self)
            .map_err(|err| ChartError::malformed(err.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// First present key wins.
    pub fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Outcome of inspecting the request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready { mode: InputMode, intent: RawIntent },
    /// The chart lives at `url` and still has to be fetched.
    Remote { url: String },
}

impl Resolution {
    pub fn mode(&self) -> InputMode {
        match self {
            Resolution::Ready { mode, .. } => *mode,
            Resolution::Remote { .. } => InputMode::Remote,
        }
    }
}

/// Which input mode the parameters select, checked in fixed precedence.
pub fn select_mode(params: &QueryParams) -> Option<InputMode> {
    if params.has("c") {
        Some(InputMode::Inline)
    } else if params.has("t") {
        Some(InputMode::Template)
    } else if params.first(&["z", "template"]).is_some() {
        Some(InputMode::Simplified)
    } else if params.has("url") {
        Some(InputMode::Remote)
    } else {
        None
    }
}

pub fn resolve(params: &QueryParams) -> ChartResult<Resolution> {
    let mode = select_mode(params).ok_or(ChartError::InvalidRequest)?;
    let intent = match mode {
        InputMode::Inline => resolve_inline(params)?,
        InputMode::Template => resolve_template(params)?,
        InputMode::Simplified => resolve_simplified(params)?,
        InputMode::Remote => {
            let url = decode_component(required(params, &["url"])?)?;
            return Ok(Resolution::Remote { url });
        }
    };
    Ok(Resolution::Ready { mode, intent })
}

/// Fetch and decode a remote chart document.
pub fn fetch_remote(fetcher: &dyn Fetch, url: &str) -> ChartResult<RawIntent> {
    let remote_error = |source| ChartError::RemoteFetch {
        url: url.to_string(),
        source,
    };

    let body = fetcher.fetch(url).map_err(remote_error)?;
    let document: Value = serde_json::from_str(&body).map_err(|err| {
        tracing::error!(url, body = %preview(&body), "remote chart is not JSON");
        remote_error(err.into())
    })?;
    Ok(RawIntent::Document(document))
}

/// Resolve and, for remote charts, fetch in place.
pub fn resolve_blocking(
    params: &QueryParams,
    fetcher: &dyn Fetch,
) -> ChartResult<(InputMode, RawIntent)> {
    match resolve(params)? {
        Resolution::Ready { mode, intent } => Ok((mode, intent)),
        Resolution::Remote { url } => Ok((InputMode::Remote, fetch_remote(fetcher, &url)?)),
    }
}

fn resolve_inline(params: &QueryParams) -> ChartResult<RawIntent> {
    let source = decode_component(required(params, &["c"])?)?;
    let document = expr::evaluate(&source)?;
    Ok(RawIntent::Document(document))
}

fn resolve_template(params: &QueryParams) -> ChartResult<RawIntent> {
    let template = decode_component(required(params, &["t"])?)?;
    let labels: Vec<Value> = decode_json(params, "k")?;
    let values: Vec<DataPoint> = decode_json(params, "v")?;
    let colors: Vec<String> = decode_json(params, "z")?;

    Ok(RawIntent::Template(TemplateIntent {
        template,
        labels: labels.iter().map(label_text).collect(),
        values,
        colors: Some(colors),
        label_mode: None,
    }))
}

fn resolve_simplified(params: &QueryParams) -> ChartResult<RawIntent> {
    let template = decode_component(required(params, &["z", "template"])?)?;
    let values = parse_values(required(params, &["x", "values"])?)?;
    let label_mode = match params.first(&["y", "labelMode"]) {
        Some(raw) => decode_component(raw)?
            .parse::<BucketMode>()
            .unwrap_or_default(),
        None => BucketMode::Blank,
    };

    let derive_labels = params.has("w") || params.has("time");
    let labels = if derive_labels {
        let reference = match params.first(&["time", "v"]) {
            Some(raw) => parse_leading_int(raw).and_then(labels::reference_time),
            None => None,
        };
        match (reference, label_mode.needs_reference()) {
            (Some(reference), _) => labels::generate(reference, label_mode, values.len()),
            (None, false) => labels::generate(Default::default(), label_mode, values.len()),
            (None, true) => {
                return Err(ChartError::malformed(format!(
                    "'{}' labels need a reference time (v)",
                    label_mode.as_str()
                )));
            }
        }
    } else {
        labels::generate(Default::default(), BucketMode::Blank, values.len())
    };

    Ok(RawIntent::Template(TemplateIntent {
        template,
        labels,
        values,
        colors: None,
        label_mode: Some(label_mode),
    }))
}

fn parse_values(raw: &str) -> ChartResult<Vec<DataPoint>> {
    raw.split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return Ok(DataPoint::Gap);
            }
            item.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(DataPoint::Number)
                .ok_or_else(|| ChartError::malformed(format!("'{}' is not a number", item)))
        })
        .collect()
}

fn decode_json<T: serde::de::DeserializeOwned>(params: &QueryParams, key: &str) -> ChartResult<T> {
    let text = decode_component(required(params, &[key])?)?;
    serde_json::from_str(&text).map_err(|err| ChartError::malformed(format!("{}: {}", key, err)))
}

fn required<'a>(params: &'a QueryParams, keys: &[&str]) -> ChartResult<&'a str> {
    params
        .first(keys)
        .ok_or_else(|| ChartError::malformed(format!("missing parameter '{}'", keys[0])))
}

/// Requested output size in pixels, clamped to `1..=max`.
///
/// In the simplified mode `w` switches on label derivation, so only
/// `width` sets the width there.
pub fn output_size(
    params: &QueryParams,
    mode: Option<InputMode>,
    default: (u32, u32),
    max: u32,
) -> (u32, u32) {
    let width_keys: &[&str] = if mode == Some(InputMode::Simplified) {
        &["width"]
    } else {
        &["w", "width"]
    };
    let pick = |keys: &[&str], fallback: u32| {
        params
            .first(keys)
            .and_then(parse_leading_int)
            .map(|v| v.clamp(1, i64::from(max)) as u32)
            .unwrap_or(fallback)
    };
    (pick(width_keys, default.0), pick(&["h", "height"], default.1))
}

/// Fill color requested for the canvas, if any.
pub fn background_color(params: &QueryParams) -> Option<String> {
    params
        .first(&["backgroundColor", "bkg"])
        .filter(|c| *c != "transparent")
        .map(str::to_string)
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(512) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Paint;
    use crate::error::FetchError;
    use crate::expr::EvalErrorKind;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn raw_query_is_decoded_once() {
        let parsed = QueryParams::parse("?c=%7Bv%3A'5%25'%7D&w=12+3&h=").unwrap();
        assert_eq!(parsed.get("c"), Some("{v:'5%'}"));
        assert_eq!(parsed.get("w"), Some("12 3"));
        assert!(!parsed.has("h"));
    }

    #[test]
    fn raw_query_matches_server_decoding() {
        // a literal percent sign the server already decoded once
        let parsed = QueryParams::parse("c=%257Bv%253A'5%2525'%257D").unwrap();
        assert_eq!(parsed.get("c"), Some("%7Bv%3A'5%25'%7D"));
        match resolve(&parsed).unwrap() {
            Resolution::Ready { mode, .. } => assert_eq!(mode, InputMode::Inline),
            other => panic!("expected a ready intent, got {:?}", other),
        }

        let stray = QueryParams::parse("c=50%&z=bar").unwrap();
        assert_eq!(stray.get("c"), Some("50%"));
        assert_eq!(stray.get("z"), Some("bar"));
    }

    fn ready(params: &QueryParams) -> (InputMode, RawIntent) {
        match resolve(params).unwrap() {
            Resolution::Ready { mode, intent } => (mode, intent),
            other => panic!("expected a ready intent, got {:?}", other),
        }
    }

    fn template(intent: RawIntent) -> TemplateIntent {
        match intent {
            RawIntent::Template(t) => t,
            other => panic!("expected a template intent, got {:?}", other),
        }
    }

    struct StubFetcher(Result<&'static str, fn() -> FetchError>);

    impl Fetch for StubFetcher {
        fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            match &self.0 {
                Ok(body) => Ok(body.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    #[test]
    fn nothing_recognised_is_invalid_request() {
        let err = resolve(&params(&[("w", "200"), ("c", "")])).unwrap_err();
        assert!(matches!(err, ChartError::InvalidRequest));
    }

    #[test]
    fn precedence_is_inline_template_simplified_remote() {
        let all = params(&[("c", "{}"), ("t", "bar"), ("z", "bar"), ("url", "http://x")]);
        assert_eq!(select_mode(&all), Some(InputMode::Inline));
        let no_c = params(&[("t", "bar"), ("z", "[]"), ("url", "http://x")]);
        assert_eq!(select_mode(&no_c), Some(InputMode::Template));
        let no_t = params(&[("z", "bar"), ("url", "http://x")]);
        assert_eq!(select_mode(&no_t), Some(InputMode::Simplified));
        assert_eq!(select_mode(&params(&[("url", "http://x")])), Some(InputMode::Remote));
    }

    #[test]
    fn inline_expression_is_decoded_and_evaluated() {
        let (mode, intent) = ready(&params(&[("c", "%7Btype%3A'bar'%2Cdata%3A%7B%7D%7D")]));
        assert_eq!(mode, InputMode::Inline);
        assert_eq!(intent, RawIntent::Document(json!({"type": "bar", "data": {}})));
    }

    #[test]
    fn inline_loops_never_reach_the_evaluator() {
        let err = resolve(&params(&[("c", "{a: WHILE%28true%29}")])).unwrap_err();
        match err {
            ChartError::Evaluation(e) => assert_eq!(e.kind, EvalErrorKind::Rejected),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn template_form_keeps_colors_verbatim() {
        let (mode, intent) = ready(&params(&[
            ("t", "bar"),
            ("k", "%5B%22a%22%2C%22b%22%5D"),
            ("v", "[1,2]"),
            ("z", r##"["#111","#222"]"##),
        ]));
        assert_eq!(mode, InputMode::Template);
        let t = template(intent);
        assert_eq!(t.labels, vec!["a", "b"]);
        assert_eq!(t.colors, Some(vec!["#111".to_string(), "#222".to_string()]));
    }

    #[test]
    fn template_form_needs_every_part() {
        let err = resolve(&params(&[("t", "bar"), ("v", "[1]"), ("z", "[]")])).unwrap_err();
        assert!(matches!(err, ChartError::MalformedInput(_)));
        let err = resolve(&params(&[("t", "bar"), ("k", "[oops"), ("v", "[1]"), ("z", "[]")]))
            .unwrap_err();
        assert!(err.to_string().contains("k:"));
    }

    #[test]
    fn simplified_without_trigger_gets_blank_labels() {
        let (mode, intent) = ready(&params(&[("z", "pie"), ("x", "1, 2,3"), ("y", "24hours")]));
        assert_eq!(mode, InputMode::Simplified);
        let t = template(intent);
        assert_eq!(t.labels, vec!["", "", ""]);
        assert_eq!(t.label_mode, Some(BucketMode::Hours24));
        assert!(t.colors.is_none());
    }

    #[test]
    fn simplified_with_trigger_derives_labels() {
        let t = template(
            ready(&params(&[
                ("z", "line"),
                ("x", "1,2"),
                ("y", "7days"),
                ("w", "1"),
                ("v", "1710504000"), // 2024-03-15T12:00:00Z
            ]))
            .1,
        );
        assert_eq!(t.labels.len(), 7);
        assert_eq!(t.labels[0], "2024-03-08");
    }

    #[test]
    fn hourly_labels_do_not_need_a_time() {
        let t = template(
            ready(&params(&[("z", "bar"), ("x", "1"), ("y", "24hours"), ("w", "1")])).1,
        );
        assert_eq!(t.labels.len(), 24);
    }

    #[test]
    fn daily_labels_without_time_are_malformed() {
        let err = resolve(&params(&[("z", "bar"), ("x", "1"), ("y", "9weeks"), ("w", "1")]))
            .unwrap_err();
        assert!(matches!(err, ChartError::MalformedInput(_)));
    }

    #[test]
    fn unambiguous_aliases_work() {
        let t = template(
            ready(&params(&[
                ("template", "bar"),
                ("values", "4,5"),
                ("labelMode", "24hours"),
                ("time", "0"),
            ]))
            .1,
        );
        assert_eq!(t.template, "bar");
        assert_eq!(t.labels[12], "12pm");
    }

    #[test]
    fn simplified_values_must_be_numbers() {
        let err = resolve(&params(&[("z", "bar"), ("x", "1,two")])).unwrap_err();
        assert!(err.to_string().contains("'two' is not a number"));
        let err = resolve(&params(&[("z", "bar")])).unwrap_err();
        assert!(matches!(err, ChartError::MalformedInput(_)));
    }

    #[test]
    fn remote_url_is_decoded_but_not_fetched() {
        let resolution = resolve(&params(&[("url", "https%3A%2F%2Fexample.com%2Fc.json")])).unwrap();
        assert_eq!(
            resolution,
            Resolution::Remote {
                url: "https://example.com/c.json".into()
            }
        );
        assert_eq!(resolution.mode(), InputMode::Remote);
    }

    #[test]
    fn remote_body_is_decoded() {
        let fetcher = StubFetcher(Ok(r#"{"type":"pie","data":{}}"#));
        let (mode, intent) = resolve_blocking(&params(&[("url", "http://x")]), &fetcher).unwrap();
        assert_eq!(mode, InputMode::Remote);
        assert_eq!(intent, RawIntent::Document(json!({"type": "pie", "data": {}})));
    }

    #[test]
    fn remote_failures_carry_the_cause() {
        let timeout = StubFetcher(Err(|| FetchError::Timeout(10)));
        let err = fetch_remote(&timeout, "http://slow").unwrap_err();
        match err {
            ChartError::RemoteFetch { url, source } => {
                assert_eq!(url, "http://slow");
                assert!(matches!(source, FetchError::Timeout(10)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let html = StubFetcher(Ok("<html>"));
        let err = fetch_remote(&html, "http://x").unwrap_err();
        assert!(matches!(
            err,
            ChartError::RemoteFetch {
                source: FetchError::Decode(_),
                ..
            }
        ));
    }

    #[test]
    fn output_size_defaults_and_overrides() {
        let p = params(&[("h", "200"), ("width", "640")]);
        assert_eq!(output_size(&p, Some(InputMode::Inline), (500, 300), 3000), (640, 200));

        let p = params(&[("w", "1"), ("z", "bar")]);
        assert_eq!(output_size(&p, Some(InputMode::Simplified), (500, 300), 3000), (500, 300));
        assert_eq!(output_size(&p, None, (500, 300), 3000), (1, 300));

        let p = params(&[("w", "99999"), ("h", "tall")]);
        assert_eq!(output_size(&p, None, (500, 300), 3000), (3000, 300));
    }

    #[test]
    fn transparent_background_is_skipped() {
        assert_eq!(background_color(&params(&[("bkg", "transparent")])), None);
        assert_eq!(
            background_color(&params(&[("backgroundColor", "#fff"), ("bkg", "red")])),
            Some("#fff".into())
        );
    }

    #[test]
    fn template_colors_reach_the_chart() {
        let (mode, intent) = ready(&params(&[
            ("t", "bar"),
            ("k", r#"["a","b"]"#),
            ("v", "[1,2]"),
            ("z", r##"["#111","#222"]"##),
        ]));
        let spec = crate::chart::normalize(intent, mode).unwrap();
        assert_eq!(
            spec.data.datasets[0].background_color,
            Some(Paint::PerPoint(vec!["#111".into(), "#222".into()]))
        );
    }
}
