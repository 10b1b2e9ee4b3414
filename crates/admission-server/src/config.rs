use admission_evaluator::policy::PolicyRuleConfig;
use anyhow::{anyhow, Result};
use clap::ArgMatches;
use lazy_static::lazy_static;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub static SERVICE_NAME: &str = "admission-server";

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

pub struct Config {
    pub addr: SocketAddr,
    /// Rules loaded from the policies file, `None` means the built-in table.
    pub policies: Option<Vec<PolicyRuleConfig>>,
    pub tls_config: Option<TlsConfig>,
    pub metrics_enabled: bool,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;
        let policies = policies(matches)?;

        let (cert_file, key_file) = tls_files(matches)?;
        let tls_config = if cert_file.is_empty() {
            None
        } else {
            Some(TlsConfig {
                cert_file: PathBuf::from(cert_file),
                key_file: PathBuf::from(key_file),
            })
        };

        let metrics_enabled = matches
            .get_one::<bool>("enable-metrics")
            .expect("clap should have set a default value")
            .to_owned();
        let log_level = matches
            .get_one::<String>("log-level")
            .expect("This should not happen, there's a default value for log-level")
            .to_owned();
        let log_fmt = matches
            .get_one::<String>("log-fmt")
            .expect("This should not happen, there's a default value for log-fmt")
            .to_owned();
        let log_no_color = matches
            .get_one::<bool>("log-no-color")
            .expect("clap should have assigned a default value")
            .to_owned();

        Ok(Self {
            addr,
            policies,
            tls_config,
            metrics_enabled,
            log_level,
            log_fmt,
            log_no_color,
        })
    }
}

fn api_bind_address(matches: &clap::ArgMatches) -> Result<SocketAddr> {
    format!(
        "{}:{}",
        matches
            .get_one::<String>("address")
            .expect("This should not happen, there's a default value for address"),
        matches
            .get_one::<String>("port")
            .expect("This should not happen, there's a default value for port")
    )
    .parse()
    .map_err(|e| anyhow!("error parsing arguments: {}", e))
}

fn tls_files(matches: &clap::ArgMatches) -> Result<(String, String)> {
    let cert_file = matches
        .get_one::<String>("cert-file")
        .cloned()
        .unwrap_or_default();
    let key_file = matches
        .get_one::<String>("key-file")
        .cloned()
        .unwrap_or_default();
    if cert_file.is_empty() != key_file.is_empty() {
        Err(anyhow!("error parsing arguments: either both --cert-file and --key-file must be provided, or neither"))
    } else {
        Ok((cert_file, key_file))
    }
}

fn policies(matches: &clap::ArgMatches) -> Result<Option<Vec<PolicyRuleConfig>>> {
    match matches.get_one::<String>("policies") {
        None => Ok(None),
        Some(path) => {
            let policies_file = Path::new(path);
            let rules = read_policies_file(policies_file).map_err(|e| {
                anyhow!(
                    "error while loading policies from {:?}: {}",
                    policies_file,
                    e
                )
            })?;
            Ok(Some(rules))
        }
    }
}

/// Reads the policies configuration file. The order of the rules is
/// preserved, it defines which rule handles a kind matched by many of them.
fn read_policies_file(path: &Path) -> Result<Vec<PolicyRuleConfig>> {
    let policies_file = File::open(path)?;
    let rules: Vec<PolicyRuleConfig> = serde_yaml::from_reader(&policies_file)?;
    Ok(rules)
}
