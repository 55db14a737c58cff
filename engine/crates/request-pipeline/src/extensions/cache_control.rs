use http::HeaderValue;
use pipeline_config::CacheControlConfig;

use super::{Extension, ExtensionFactory};
use crate::{
    engine::{CacheHint, CacheScope, ExecutionResult},
    response::{PathSegment, Response},
};

/// Collects the cache hints of the engine, reports them under `cacheControl` and derives the
/// `Cache-Control` header of successful responses. Deferred responses get no header, the hints of
/// their patches are unknown when the initial response is sent.
#[derive(Debug, Clone)]
pub struct CacheControlExtensionFactory {
    config: CacheControlConfig,
}

impl CacheControlExtensionFactory {
    pub fn new(config: CacheControlConfig) -> Self {
        CacheControlExtensionFactory { config }
    }
}

impl ExtensionFactory for CacheControlExtensionFactory {
    fn create(&self) -> Box<dyn Extension> {
        Box::new(CacheControlExtension {
            config: self.config.clone(),
            hints: Vec::new(),
            root_fields: Vec::new(),
            deferred: false,
        })
    }
}

pub struct CacheControlExtension {
    config: CacheControlConfig,
    hints: Vec<CacheHint>,
    root_fields: Vec<String>,
    deferred: bool,
}

impl CacheControlExtension {
    /// Lowest max age of the response and whether any part of it is private. Root fields without
    /// a hint of their own use the default max age.
    fn overall_policy(&self) -> Option<(u32, CacheScope)> {
        let unhinted_roots = self
            .root_fields
            .iter()
            .filter(|field| {
                !self
                    .hints
                    .iter()
                    .any(|hint| matches!(hint.path.as_slice(), [PathSegment::Field(name)] if name == *field))
            })
            .map(|_| self.config.default_max_age);

        let max_age = self.hints.iter().map(|hint| hint.max_age).chain(unhinted_roots).min()?;

        let scope = if self.hints.iter().any(|hint| hint.scope == CacheScope::Private) {
            CacheScope::Private
        } else {
            CacheScope::Public
        };

        Some((max_age, scope))
    }
}

impl Extension for CacheControlExtension {
    fn name(&self) -> &'static str {
        "cacheControl"
    }

    fn did_execute(&mut self, result: &ExecutionResult) {
        self.hints = result.cache_hints.clone();
        self.root_fields = match &result.data {
            Some(serde_json::Value::Object(data)) => data.keys().cloned().collect(),
            _ => Vec::new(),
        };
    }

    fn did_defer(&mut self) {
        self.deferred = true;
    }

    fn will_send_response(&mut self, response: &mut Response) {
        if !self.config.calculate_http_headers || self.deferred || response.has_errors() {
            return;
        }

        let Some((max_age, scope)) = self.overall_policy() else {
            return;
        };

        if max_age == 0 {
            return;
        }

        let scope = match scope {
            CacheScope::Public => "public",
            CacheScope::Private => "private",
        };

        if let Ok(value) = HeaderValue::from_str(&format!("max-age={max_age}, {scope}")) {
            response.http.headers.insert(http::header::CACHE_CONTROL, value);
        }
    }

    fn format(&self) -> Option<serde_json::Value> {
        if self.config.strip_formatted_extensions {
            return None;
        }

        Some(serde_json::json!({
            "version": 1,
            "hints": self.hints,
        }))
    }
}
