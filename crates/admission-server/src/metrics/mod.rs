use anyhow::Result;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};

use crate::config;

mod admission_evaluations_total;
pub use admission_evaluations_total::add_admission_evaluation;
mod admission_evaluation_latency;
pub use admission_evaluation_latency::record_admission_latency;

const METER_NAME: &str = "admission-webhook";

/// Export metrics to an OpenTelemetry collector listening on localhost.
/// Until this is called, every measurement goes to the no-op global meter.
pub fn setup_metrics() -> Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint("http://localhost:4317")
        .build()?;
    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_attribute(KeyValue::new("service.name", config::SERVICE_NAME))
                .build(),
        )
        .build();
    opentelemetry::global::set_meter_provider(meter_provider.clone());

    Ok(meter_provider)
}

/// Attributes shared by all the metrics about the evaluation of an
/// AdmissionReview.
#[derive(Clone, Debug)]
pub struct AdmissionEvaluation {
    pub(crate) rule_name: Option<String>,
    pub(crate) resource_kind: String,
    pub(crate) resource_namespace: Option<String>,
    pub(crate) resource_request_operation: String,
    pub(crate) accepted: bool,
    pub(crate) error_code: Option<u16>,
}

impl From<&AdmissionEvaluation> for Vec<KeyValue> {
    fn from(evaluation: &AdmissionEvaluation) -> Self {
        let mut baggage = vec![
            KeyValue::new("resource_kind", evaluation.resource_kind.clone()),
            KeyValue::new(
                "resource_request_operation",
                evaluation.resource_request_operation.clone(),
            ),
            KeyValue::new("accepted", evaluation.accepted),
        ];
        if let Some(rule_name) = &evaluation.rule_name {
            baggage.push(KeyValue::new("rule_name", rule_name.clone()));
        }
        if let Some(resource_namespace) = &evaluation.resource_namespace {
            baggage.push(KeyValue::new(
                "resource_namespace",
                resource_namespace.clone(),
            ));
        }
        if let Some(error_code) = evaluation.error_code {
            baggage.push(KeyValue::new("error_code", error_code as i64));
        }
        baggage
    }
}
