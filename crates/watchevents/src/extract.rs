//! Field-path and message extractors
//!
//! Both extractors signal "not applicable" with `None`; a miss is an ordinary
//! outcome, never an error.

use std::sync::LazyLock;

use regex::Regex;

const CONTAINER_PREFIXES: [&str; 2] = ["spec.containers{", "spec.initContainers{"];

/// Longest representable pull duration: `i64::MAX` nanoseconds.
const MAX_PULL_SECONDS: f64 = 9_223_372_036.854_775;

/// First quoted string, optionally followed by ` in <number>(s|ms)` at end of text.
static FIRST_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)"( in (\d+(?:\.\d+)?)(s|ms)$)?"#).expect("first-quote regex")
});

/// Container name from a pod field path such as `spec.containers{app}`.
#[must_use]
pub fn container_from_field_path(field_path: &str) -> Option<&str> {
    let inner = field_path.strip_suffix('}')?;
    CONTAINER_PREFIXES
        .iter()
        .find_map(|prefix| inner.strip_prefix(prefix))
}

/// Image reference and optional pull duration recovered from a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePull {
    pub image: String,
    /// Elapsed time in seconds.
    pub duration: Option<f64>,
}

impl ImagePull {
    /// Duration rendered the way interval annotations carry it.
    #[must_use]
    pub fn duration_label(&self) -> Option<String> {
        self.duration.map(|secs| format!("{secs:.3}s"))
    }
}

/// Extract the first quoted image reference and an optional trailing duration.
#[must_use]
pub fn image_and_duration(message: &str) -> Option<ImagePull> {
    let caps = FIRST_QUOTE_RE.captures(message)?;
    let image = caps.get(1)?.as_str().to_string();
    let duration = match (caps.get(3), caps.get(4)) {
        (Some(number), Some(unit)) => number
            .as_str()
            .parse::<f64>()
            .ok()
            .map(|value| {
                if unit.as_str() == "ms" {
                    value / 1000.0
                } else {
                    value
                }
            })
            .filter(|secs| *secs <= MAX_PULL_SECONDS),
        _ => None,
    };
    Some(ImagePull { image, duration })
}
