use lazy_static::lazy_static;
use opentelemetry::{metrics::Counter, KeyValue};

use super::AdmissionEvaluation;

lazy_static! {
    static ref ADMISSION_EVALUATIONS_TOTAL: Counter<u64> =
        opentelemetry::global::meter(super::METER_NAME)
            .u64_counter("admission_evaluations_total")
            .build();
}

pub fn add_admission_evaluation(evaluation: &AdmissionEvaluation) {
    ADMISSION_EVALUATIONS_TOTAL.add(1, &Into::<Vec<KeyValue>>::into(evaluation));
}
