//! Support for setting up RusTLS in a consistent fashion.

use rustls::{ClientConfig, RootCertStore};
use rustls_native_certs::load_native_certs;

use crate::common::*;

/// Standard RusTLS `ClientConfig` setup, used for warehouse connections.
pub(crate) fn rustls_client_config() -> Result<ClientConfig> {
    let mut root_store = RootCertStore::empty();
    let cert_result = load_native_certs();
    for cert in cert_result.certs {
        root_store
            .add(cert)
            .context("could not add certificate to cert store")?;
    }
    if let Some(err) = cert_result.errors.into_iter().next() {
        return Err(err).context("error loading native certs");
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth())
}
