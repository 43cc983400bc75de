//! Server module for running Terraform providers
//!
//! [`serve`] speaks the go-plugin protocol: it verifies the magic cookie,
//! binds to a loopback port (honoring the port range the host requests),
//! negotiates automatic mTLS when the host supplies a client certificate,
//! prints the handshake line on stdout and then serves the tfplugin6 gRPC
//! service until the host disconnects.
//!
//! stdout belongs to the handshake; all logging must go to stderr.

use crate::error::{Result, TfkitError};
use crate::grpc::ProviderHandler;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use base64::Engine;
use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use time::ext::NumericalDuration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{debug, info};

const CORE_PROTOCOL_VERSION: u8 = 1;
const PLUGIN_PROTOCOL_VERSION: u8 = 6;

const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind; always loopback in practice
    pub listen_ip: Ipv4Addr,
    /// Maximum gRPC message size in bytes
    pub max_message_size: usize,
    /// Explicit TLS certificate path (development override; normally the
    /// server certificate is generated per-session for auto-mTLS)
    pub cert_path: Option<PathBuf>,
    /// Explicit TLS key path, paired with `cert_path`
    pub key_path: Option<PathBuf>,
    /// Timeout for graceful shutdown
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_ip: Ipv4Addr::LOCALHOST,
            max_message_size: 256 << 20,
            cert_path: None,
            key_path: None,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Use a certificate from disk instead of a generated one (mkcert-style
    /// local development).
    pub fn with_tls_files(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.cert_path = Some(cert_path);
        self.key_path = Some(key_path);
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    // tonic's rustls needs a process-wide crypto provider; install is
    // idempotent and the Err just means another caller won the race.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let handler = ProviderHandler::new(provider);
    let service = ProviderServer::new(handler)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let listener = bind_plugin_port(config.listen_ip).await?;
    let addr = listener.local_addr().map_err(TfkitError::IoError)?;

    let tls = HandshakeTls::from_env(&config).await?;

    let mut builder = Server::builder();
    if let Some(tls_config) = &tls.server_config {
        builder = builder.tls_config(tls_config.clone())?;
    }

    print_handshake(addr, tls.cert_der.as_deref());
    info!(%addr, tls = tls.server_config.is_some(), "provider server listening");

    builder
        .add_service(service)
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}

/// Providers are plugins, not user-facing binaries. The host proves itself
/// through the magic cookie; without it, print the canonical message and
/// refuse to start.
fn check_magic_cookie() -> Result<()> {
    match env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => {
            eprintln!(
                "This binary is a plugin. These are not meant to be executed directly.\n\
                 Please execute the program that consumes these plugins, which will\n\
                 load any plugins automatically"
            );
            Err(TfkitError::ServerError(
                "missing or invalid magic cookie; not launched by a plugin host".to_string(),
            ))
        }
    }
}

/// Binds inside the host-requested port range when PLUGIN_MIN_PORT and
/// PLUGIN_MAX_PORT are set, otherwise takes an ephemeral port.
async fn bind_plugin_port(ip: Ipv4Addr) -> Result<TcpListener> {
    let min_port = parse_port_env("PLUGIN_MIN_PORT")?;
    let max_port = parse_port_env("PLUGIN_MAX_PORT")?;

    let (min_port, max_port) = match (min_port, max_port) {
        (Some(min), Some(max)) => (min.min(max), min.max(max)),
        _ => {
            return TcpListener::bind(SocketAddr::new(ip.into(), 0))
                .await
                .map_err(TfkitError::IoError)
        }
    };

    for port in min_port..=max_port {
        match TcpListener::bind(SocketAddr::new(ip.into(), port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => debug!(port, error = %e, "port unavailable, trying next"),
        }
    }

    Err(TfkitError::ServerError(format!(
        "no free port in plugin port range {}-{}",
        min_port, max_port
    )))
}

fn parse_port_env(name: &str) -> Result<Option<u16>> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u16>()
            .map(Some)
            .map_err(|e| TfkitError::ServerError(format!("invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

struct HandshakeTls {
    server_config: Option<ServerTlsConfig>,
    /// DER of the server certificate, appended to the handshake line
    cert_der: Option<Vec<u8>>,
}

impl HandshakeTls {
    async fn from_env(config: &ServerConfig) -> Result<Self> {
        if let (Some(cert_path), Some(key_path)) = (&config.cert_path, &config.key_path) {
            let cert = tokio::fs::read(cert_path)
                .await
                .map_err(|e| TfkitError::TlsError(format!("failed to read certificate: {}", e)))?;
            let key = tokio::fs::read(key_path)
                .await
                .map_err(|e| TfkitError::TlsError(format!("failed to read key: {}", e)))?;

            let der = pem::parse(&cert)
                .map_err(|e| TfkitError::TlsError(format!("certificate is not PEM: {}", e)))?
                .into_contents();

            return Ok(Self {
                server_config: Some(
                    ServerTlsConfig::new().identity(Identity::from_pem(cert, key)),
                ),
                cert_der: Some(der),
            });
        }

        let client_cert = env::var("PLUGIN_CLIENT_CERT").unwrap_or_default();
        if client_cert.is_empty() {
            // Host did not request TLS; serve plaintext on loopback.
            return Ok(Self {
                server_config: None,
                cert_der: None,
            });
        }

        let (identity, der) = generate_server_certificate()?;
        let tls_config = ServerTlsConfig::new()
            .client_ca_root(tonic::transport::Certificate::from_pem(client_cert))
            .client_auth_optional(true)
            .identity(identity);

        Ok(Self {
            server_config: Some(tls_config),
            cert_der: Some(der),
        })
    }
}

/// Self-signed ECDSA P-384 server certificate for the auto-mTLS session.
fn generate_server_certificate() -> Result<(Identity, Vec<u8>)> {
    let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()]);
    params.alg = &rcgen::PKCS_ECDSA_P384_SHA384;
    params.not_before = time::OffsetDateTime::now_utc().saturating_sub(30.seconds());
    params.not_after = time::OffsetDateTime::now_utc().saturating_add(365.days());

    let mut dn = rcgen::DistinguishedName::new();
    dn.push(rcgen::DnType::OrganizationName, "HashiCorp");
    dn.push(
        rcgen::DnType::CommonName,
        rcgen::DnValue::PrintableString("localhost".to_string()),
    );
    params.distinguished_name = dn;
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params.key_usages = vec![
        rcgen::KeyUsagePurpose::DigitalSignature,
        rcgen::KeyUsagePurpose::KeyEncipherment,
        rcgen::KeyUsagePurpose::KeyAgreement,
        rcgen::KeyUsagePurpose::KeyCertSign,
    ];
    params.extended_key_usages = vec![
        rcgen::ExtendedKeyUsagePurpose::ClientAuth,
        rcgen::ExtendedKeyUsagePurpose::ServerAuth,
    ];
    params.key_identifier_method = rcgen::KeyIdMethod::Sha512;

    let cert = rcgen::Certificate::from_params(params)
        .map_err(|e| TfkitError::TlsError(format!("failed to generate certificate: {}", e)))?;
    let der = cert
        .serialize_der_with_signer(&cert)
        .map_err(|e| TfkitError::TlsError(format!("failed to serialize certificate: {}", e)))?;

    let cert_pem = pem::encode(&pem::Pem::new("CERTIFICATE".to_string(), der.clone()));
    let key_pem = cert.serialize_private_key_pem();

    Ok((Identity::from_pem(cert_pem, key_pem), der))
}

/// go-plugin handshake: `CORE|PROTOCOL|tcp|addr|grpc[|base64(cert)]`,
/// certificate base64 without padding.
fn print_handshake(addr: SocketAddr, cert_der: Option<&[u8]>) {
    match cert_der {
        Some(der) => println!(
            "{}|{}|tcp|{}|grpc|{}",
            CORE_PROTOCOL_VERSION,
            PLUGIN_PROTOCOL_VERSION,
            addr,
            base64::engine::general_purpose::STANDARD_NO_PAD.encode(der),
        ),
        None => println!(
            "{}|{}|tcp|{}|grpc",
            CORE_PROTOCOL_VERSION, PLUGIN_PROTOCOL_VERSION, addr
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn magic_cookie_missing_is_rejected() {
        env::remove_var(MAGIC_COOKIE_KEY);
        assert!(check_magic_cookie().is_err());
    }

    #[test]
    #[serial]
    fn magic_cookie_wrong_value_is_rejected() {
        env::set_var(MAGIC_COOKIE_KEY, "not-the-cookie");
        assert!(check_magic_cookie().is_err());
        env::remove_var(MAGIC_COOKIE_KEY);
    }

    #[test]
    #[serial]
    fn magic_cookie_correct_value_is_accepted() {
        env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());
        env::remove_var(MAGIC_COOKIE_KEY);
    }

    #[tokio::test]
    #[serial]
    async fn bind_honors_port_range() {
        env::set_var("PLUGIN_MIN_PORT", "42000");
        env::set_var("PLUGIN_MAX_PORT", "42100");

        let listener = bind_plugin_port(Ipv4Addr::LOCALHOST).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!((42000..=42100).contains(&port));

        env::remove_var("PLUGIN_MIN_PORT");
        env::remove_var("PLUGIN_MAX_PORT");
    }

    #[tokio::test]
    #[serial]
    async fn bind_without_range_uses_ephemeral_port() {
        env::remove_var("PLUGIN_MIN_PORT");
        env::remove_var("PLUGIN_MAX_PORT");

        let listener = bind_plugin_port(Ipv4Addr::LOCALHOST).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn bind_rejects_unparsable_range() {
        env::set_var("PLUGIN_MIN_PORT", "not-a-port");
        env::set_var("PLUGIN_MAX_PORT", "42100");

        assert!(bind_plugin_port(Ipv4Addr::LOCALHOST).await.is_err());

        env::remove_var("PLUGIN_MIN_PORT");
        env::remove_var("PLUGIN_MAX_PORT");
    }

    #[test]
    fn generated_certificate_has_der_and_identity() {
        let (_identity, der) = generate_server_certificate().unwrap();
        assert!(!der.is_empty());
        // DER certificates start with a SEQUENCE tag.
        assert_eq!(der[0], 0x30);
    }
}
