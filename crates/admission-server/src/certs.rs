use std::{path::Path, sync::Arc};

use ::tracing::{info, warn};
use anyhow::{anyhow, Result};
use axum_server::tls_rustls::RustlsConfig;
use rustls::ServerConfig;
use rustls_pki_types::{pem::SliceIter, CertificateDer, PrivateKeyDer};

use crate::config::TlsConfig;

/// Build the TLS configuration of the HTTPS server. The certificate and the
/// key are read once, at startup.
pub async fn create_tls_config(tls_config: &TlsConfig) -> Result<RustlsConfig> {
    let (cert, key) = load_server_cert_and_key(&tls_config.cert_file, &tls_config.key_file).await?;
    let server_config = build_tls_server_config(cert, key)?;
    info!(
        cert_file = %tls_config.cert_file.display(),
        key_file = %tls_config.key_file.display(),
        "TLS certificate loaded"
    );

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

fn build_tls_server_config(
    cert: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<ServerConfig> {
    let mut server_config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert, key)?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(server_config)
}

async fn load_server_cert_and_key(
    cert_file: &Path,
    key_file: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let cert_contents = tokio::fs::read(cert_file)
        .await
        .map_err(|e| anyhow!("Error opening certificate file {}: {e}", cert_file.display()))?;
    let key_contents = tokio::fs::read(key_file)
        .await
        .map_err(|e| anyhow!("Error opening key file {}: {e}", key_file.display()))?;

    let cert_iterator: SliceIter<CertificateDer> = SliceIter::new(&cert_contents[..]);
    let certs: Vec<_> = cert_iterator
        .filter_map(|it| {
            if let Err(ref e) = it {
                warn!("Cannot parse certificate: {e}");
            }
            it.ok()
        })
        .collect();

    if certs.len() != 1 {
        return Err(anyhow!(
            "Expected exactly one certificate in certificate file {}, found {}",
            cert_file.display(),
            certs.len()
        ));
    }

    let key_iterator: SliceIter<PrivateKeyDer> = SliceIter::new(&key_contents[..]);
    let mut keys: Vec<PrivateKeyDer> = key_iterator
        .filter_map(|it| {
            if let Err(ref e) = it {
                warn!("Cannot parse private key: {e}");
            }
            it.ok()
        })
        .collect();

    if keys.len() != 1 {
        return Err(anyhow!(
            "Expected exactly one key in key file {}, found {}",
            key_file.display(),
            keys.len()
        ));
    }

    Ok((certs, keys.remove(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};
    use tempfile::TempDir;

    struct TlsFiles {
        _dir: TempDir,
        config: TlsConfig,
    }

    fn write_tls_files(cert: &str, key: &str) -> TlsFiles {
        let dir = tempfile::tempdir().unwrap();
        let cert_file = dir.path().join("tls.crt");
        let key_file = dir.path().join("tls.key");
        std::fs::write(&cert_file, cert).unwrap();
        std::fs::write(&key_file, key).unwrap();

        TlsFiles {
            _dir: dir,
            config: TlsConfig {
                cert_file,
                key_file,
            },
        }
    }

    /// Returns a PEM encoded self-signed certificate and its PEM encoded key
    fn self_signed() -> (String, String) {
        let key_pair = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["webhook.default.svc".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();

        (cert.pem(), key_pair.serialize_pem())
    }

    fn install_crypto_provider() {
        // the crypto provider is installed by `main`, which is not run by tests
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    #[tokio::test]
    async fn load_certificate_and_key() {
        install_crypto_provider();
        let (cert, key) = self_signed();
        let files = write_tls_files(&cert, &key);

        assert!(create_tls_config(&files.config).await.is_ok());
    }

    #[tokio::test]
    async fn missing_certificate_file() {
        install_crypto_provider();
        let config = TlsConfig {
            cert_file: "/does/not/exist/tls.crt".into(),
            key_file: "/does/not/exist/tls.key".into(),
        };

        let error = create_tls_config(&config).await.unwrap_err();

        assert!(error.to_string().contains("/does/not/exist/tls.crt"));
    }

    #[tokio::test]
    async fn more_than_one_certificate() {
        install_crypto_provider();
        let (first_cert, first_key) = self_signed();
        let (second_cert, _) = self_signed();
        let bundle = format!("{first_cert}{second_cert}");
        let files = write_tls_files(&bundle, &first_key);

        let error = create_tls_config(&files.config).await.unwrap_err();

        assert!(error
            .to_string()
            .contains("Expected exactly one certificate"));
    }

    #[tokio::test]
    async fn key_file_without_keys() {
        install_crypto_provider();
        let (cert, _) = self_signed();
        let files = write_tls_files(&cert, &cert);

        let error = create_tls_config(&files.config).await.unwrap_err();

        assert!(error.to_string().contains("Expected exactly one key"));
    }
}
