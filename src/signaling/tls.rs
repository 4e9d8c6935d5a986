use std::{io, sync::Arc};

use rustls::{ClientConfig, ServerConfig};

use crate::tls_utils::{TlsSettings, build_pinned_root_store, load_certs, load_private_key};

/// ClientConfig for the signaling client, trusting ONLY the configured CA.
pub fn build_signaling_client_config(tls: &TlsSettings) -> io::Result<Arc<ClientConfig>> {
    let root_store = build_pinned_root_store(&tls.ca)?;

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

/// ServerConfig for the relay: no client auth (clients authenticate with a
/// token on the channel itself).
pub fn build_signaling_server_config(tls: &TlsSettings) -> io::Result<Arc<ServerConfig>> {
    let certs = load_certs(&tls.cert)?;
    let key = load_private_key(&tls.key)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("TLS config error: {e}"))
        })?;

    Ok(Arc::new(config))
}
