use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use web_time::Instant;

use super::{EndHandler, ExecutionInfo, Extension, ExtensionFactory, RequestInfo};
use crate::error::GraphqlError;

/// Reports stage timings in the Apollo tracing format, under the `tracing` key.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExtensionFactory;

impl ExtensionFactory for TracingExtensionFactory {
    fn create(&self) -> Box<dyn Extension> {
        Box::new(TracingExtension::default())
    }
}

#[derive(Default)]
pub struct TracingExtension {
    state: Arc<Mutex<TracingState>>,
}

#[derive(Default)]
struct TracingState {
    start: Option<(DateTime<Utc>, Instant)>,
    parsing: Option<Timing>,
    validation: Option<Timing>,
    execution: Option<Timing>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct Timing {
    start_offset: u64,
    duration: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TracingReport {
    version: u8,
    start_time: String,
    end_time: String,
    duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parsing: Option<Timing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<Timing>,
    execution: ExecutionReport,
}

#[derive(Serialize)]
struct ExecutionReport {
    #[serde(flatten)]
    timing: Option<Timing>,
    resolvers: Vec<serde_json::Value>,
}

impl TracingExtension {
    fn state(&self) -> std::sync::MutexGuard<'_, TracingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn time_stage(&self, record: fn(&mut TracingState, Timing)) -> Option<EndHandler> {
        let (_, request_start) = self.state().start?;
        let stage_start = Instant::now();
        let state = self.state.clone();

        Some(Box::new(move |_: &[GraphqlError]| {
            let timing = Timing {
                start_offset: nanos(stage_start.duration_since(request_start)),
                duration: nanos(stage_start.elapsed()),
            };
            record(&mut state.lock().unwrap_or_else(PoisonError::into_inner), timing);
        }))
    }
}

impl Extension for TracingExtension {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn request_did_start(&mut self, _info: &RequestInfo<'_>) -> Option<EndHandler> {
        self.state().start = Some((Utc::now(), Instant::now()));
        None
    }

    fn parsing_did_start(&mut self, _info: &RequestInfo<'_>) -> Option<EndHandler> {
        self.time_stage(|state, timing| state.parsing = Some(timing))
    }

    fn validation_did_start(&mut self) -> Option<EndHandler> {
        self.time_stage(|state, timing| state.validation = Some(timing))
    }

    fn execution_did_start(&mut self, _info: &ExecutionInfo<'_>) -> Option<EndHandler> {
        self.time_stage(|state, timing| state.execution = Some(timing))
    }

    fn format(&self) -> Option<serde_json::Value> {
        let state = self.state();
        let (start_time, request_start) = state.start?;
        let elapsed = request_start.elapsed();
        let end_time = start_time + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

        let report = TracingReport {
            version: 1,
            start_time: start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            end_time: end_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration: nanos(elapsed),
            parsing: state.parsing,
            validation: state.validation,
            execution: ExecutionReport {
                timing: state.execution,
                resolvers: Vec::new(),
            },
        };

        serde_json::to_value(report).ok()
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Variables;

    #[test]
    fn reports_stage_timings() {
        let variables = Variables::new();
        let info = RequestInfo {
            query: "{ a }",
            query_hash: "hash",
            operation_name: None,
            variables: &variables,
        };
        let mut extension = TracingExtension::default();
        assert!(extension.parsing_did_start(&info).is_none());
        assert!(extension.format().is_none());

        extension.request_did_start(&info);
        let end = extension.parsing_did_start(&info).unwrap();
        end(&[]);
        let end = extension.validation_did_start().unwrap();
        end(&[]);

        let document = async_graphql_parser::parse_query("{ a }").unwrap();
        let (_, operation) = document.operations.iter().next().unwrap();
        let end = extension
            .execution_did_start(&ExecutionInfo {
                operation_name: None,
                operation,
            })
            .unwrap();
        end(&[]);

        let report = extension.format().unwrap();
        assert!(report["duration"].as_u64().unwrap() >= report["validation"]["duration"].as_u64().unwrap());

        insta::assert_json_snapshot!(report, {
            ".startTime" => "[time]",
            ".endTime" => "[time]",
            ".duration" => "[nanos]",
            ".*.startOffset" => "[nanos]",
            ".*.duration" => "[nanos]",
        }, @r###"
        {
          "version": 1,
          "startTime": "[time]",
          "endTime": "[time]",
          "duration": "[nanos]",
          "parsing": {
            "startOffset": "[nanos]",
            "duration": "[nanos]"
          },
          "validation": {
            "startOffset": "[nanos]",
            "duration": "[nanos]"
          },
          "execution": {
            "startOffset": "[nanos]",
            "duration": "[nanos]",
            "resolvers": []
          }
        }
        "###);
    }
}
