use std::{
    fs::File,
    io::{self, BufReader},
};

use rustls::{
    RootCertStore,
    pki_types::{CertificateDer, PrivateKeyDer},
};
use rustls_pemfile::{Item, certs, read_one};

use crate::config::{Config, ConfigError};

pub const DEFAULT_CERT_PATH: &str = "certs/signaling/cert.pem";
pub const DEFAULT_KEY_PATH: &str = "certs/signaling/key.pem";
pub const DEFAULT_CA_PATH: &str = "certs/signaling/rootCA.pem";
pub const DEFAULT_DOMAIN: &str = "signal.internal";

/// `[TLS]` section: whether the signaling channel is wrapped in TLS and
/// where its material lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub enabled: bool,
    pub cert: String,
    pub key: String,
    pub ca: String,
    pub domain: String,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cert: DEFAULT_CERT_PATH.into(),
            key: DEFAULT_KEY_PATH.into(),
            ca: DEFAULT_CA_PATH.into(),
            domain: DEFAULT_DOMAIN.into(),
        }
    }
}

impl TlsSettings {
    /// # Errors
    /// Fails when `enabled` is present but not a boolean.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let d = Self::default();
        let enabled = match config.get_non_empty("TLS", "enabled") {
            None => d.enabled,
            Some(raw) => config
                .get_bool("TLS", "enabled")
                .ok_or_else(|| ConfigError::InvalidValue {
                    section: "TLS".into(),
                    key: "enabled".into(),
                    value: raw.to_owned(),
                })?,
        };
        Ok(Self {
            enabled,
            cert: config.get_non_empty_or_default("TLS", "cert", &d.cert).to_owned(),
            key: config.get_non_empty_or_default("TLS", "key", &d.key).to_owned(),
            ca: config.get_non_empty_or_default("TLS", "ca", &d.ca).to_owned(),
            domain: config
                .get_non_empty_or_default("TLS", "domain", &d.domain)
                .to_owned(),
        })
    }
}

/// Builds a `RootCertStore` that trusts ONLY the CA(s) in `ca_path`.
///
/// # Errors
///
/// Returns an `io::Error` if the file is unreadable, invalid, or contains no certificates.
pub fn build_pinned_root_store(ca_path: &str) -> io::Result<RootCertStore> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs(ca_path)? {
        root_store
            .add(cert)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad CA cert: {e}")))?;
    }
    Ok(root_store)
}

/// Loads a certificate chain from a PEM file.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be opened or if the PEM content is invalid.
pub fn load_certs(path: &str) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening cert {path}: {e}")))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid certs: {e}")))?;

    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{path} did not contain any certificates"),
        ));
    }

    Ok(certs)
}

/// Loads a private key from a PEM file.
/// Supports PKCS1, PKCS8, and Sec1 (EC) formats.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be opened, is malformed,
/// or does not contain a valid private key.
pub fn load_private_key(path: &str) -> io::Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening key {path}: {e}")))?;
    let mut reader = BufReader::new(file);

    loop {
        match read_one(&mut reader) {
            Ok(Some(Item::Pkcs1Key(key))) => return Ok(key.into()),
            Ok(Some(Item::Pkcs8Key(key))) => return Ok(key.into()),
            Ok(Some(Item::Sec1Key(key))) => return Ok(key.into()),
            Ok(None) => break,
            Ok(Some(_)) => {}
            Err(e) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("key parse error: {e}"),
                ));
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("no private key found in {path}"),
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn tls_settings_defaults_and_overrides() {
        assert_eq!(TlsSettings::from_config(&Config::empty()).unwrap(), TlsSettings::default());

        let cfg = Config::empty()
            .with("TLS", "enabled", "on")
            .with("TLS", "domain", "relay.test");
        let s = TlsSettings::from_config(&cfg).unwrap();
        assert!(s.enabled);
        assert_eq!(s.domain, "relay.test");
        assert_eq!(s.cert, DEFAULT_CERT_PATH);

        let bad = Config::empty().with("TLS", "enabled", "maybe");
        assert!(TlsSettings::from_config(&bad).is_err());
    }

    #[test]
    fn missing_or_empty_pem_files_are_errors() {
        assert!(load_certs("/definitely/not/here.pem").is_err());

        let dir = std::env::temp_dir().join(format!("meshrtc-tls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let empty = dir.join("empty.pem");
        std::fs::write(&empty, "").unwrap();
        let path = empty.to_str().unwrap();
        assert_eq!(
            load_certs(path).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
        assert!(load_private_key(path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
