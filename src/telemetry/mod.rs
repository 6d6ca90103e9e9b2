//! Anonymous-shaped operational telemetry (§7/§5 observability note).
//!
//! No prompt text, descriptor content, or image bytes is ever attached to
//! a span's attributes -- only identifiers, counts, and durations.

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex, OnceLock};

static INSTANCE: OnceLock<Arc<Mutex<Telemetry>>> = OnceLock::new();

/// Get the global `Telemetry` singleton.
pub fn telemetry() -> Arc<Mutex<Telemetry>> {
    INSTANCE.get_or_init(|| Arc::new(Mutex::new(Telemetry::new()))).clone()
}

#[derive(Debug)]
pub struct Telemetry {
    pub ready: bool,
}

impl Telemetry {
    fn new() -> Self {
        let ready = !Self::is_disabled();
        Self { ready }
    }

    /// `STYLE_CORE_TELEMETRY_OPT_OUT=true|1` disables span creation.
    pub fn is_disabled() -> bool {
        let opt_out = env::var("STYLE_CORE_TELEMETRY_OPT_OUT").unwrap_or_default().to_lowercase();
        opt_out == "true" || opt_out == "1"
    }

    pub fn create_span(&self, name: &str, attributes: HashMap<String, String>) -> SpanHandle {
        SpanHandle { name: name.to_string(), attributes, ended: !self.ready }
    }

    pub fn portfolio_analysis(&self, portfolio_id: uuid::Uuid, image_count: usize) -> SpanHandle {
        let mut attrs = HashMap::new();
        attrs.insert("portfolio_id".to_string(), portfolio_id.to_string());
        attrs.insert("image_count".to_string(), image_count.to_string());
        self.create_span("portfolio_analysis", attrs)
    }

    pub fn profile_synthesis(&self, user_id: uuid::Uuid, portfolio_id: uuid::Uuid) -> SpanHandle {
        let mut attrs = HashMap::new();
        attrs.insert("user_id".to_string(), user_id.to_string());
        attrs.insert("portfolio_id".to_string(), portfolio_id.to_string());
        self.create_span("profile_synthesis", attrs)
    }

    pub fn prompt_generation(&self, user_id: uuid::Uuid, is_exploration: bool) -> SpanHandle {
        let mut attrs = HashMap::new();
        attrs.insert("user_id".to_string(), user_id.to_string());
        attrs.insert("is_exploration".to_string(), is_exploration.to_string());
        self.create_span("prompt_generation", attrs)
    }
}

#[derive(Debug)]
pub struct SpanHandle {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub ended: bool,
}

impl SpanHandle {
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if !self.ended {
            self.attributes.insert(key.into(), value.into());
        }
    }

    pub fn end(&mut self) {
        self.ended = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_attributes_freeze_after_end() {
        let telemetry = Telemetry { ready: true };
        let mut span = telemetry.create_span("test", HashMap::new());
        span.end();
        span.set_attribute("late", "value");
        assert!(!span.attributes.contains_key("late"));
    }

    #[test]
    fn portfolio_analysis_span_carries_only_counts_and_ids_no_content() {
        let telemetry = Telemetry { ready: true };
        let portfolio_id = uuid::Uuid::new_v4();
        let span = telemetry.portfolio_analysis(portfolio_id, 12);
        assert_eq!(span.attributes.get("image_count").map(String::as_str), Some("12"));
        assert_eq!(span.attributes.len(), 2);
    }
}
