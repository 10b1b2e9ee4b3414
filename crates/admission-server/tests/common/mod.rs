use admission_evaluator::policy::PolicyRuleConfig;
use admission_server::{config::Config, AdmissionServer};
use axum::Router;
use std::net::SocketAddr;

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        policies: None,
        tls_config: None,
        metrics_enabled: false,
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: true,
    }
}

pub(crate) fn config_with_policies(policies: Vec<PolicyRuleConfig>) -> Config {
    Config {
        policies: Some(policies),
        ..default_test_config()
    }
}

pub(crate) async fn app(config: Config) -> Router {
    let server = AdmissionServer::new_from_config(config).await.unwrap();

    server.router()
}
