//! Conversions from foreign errors (HTTP transport, OS keychain, filesystem)
//! into `CalmateError`.

use calmate_domain::CalmateError;

/// Newtype so the `From` impls for foreign error types live in this crate.
#[derive(Debug)]
pub struct InfraError(pub CalmateError);

impl From<InfraError> for CalmateError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CalmateError> for InfraError {
    fn from(value: CalmateError) -> Self {
        Self(value)
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        Self(classify_http(&err))
    }
}

/// Transport problems are `Network`; a status attached by
/// `error_for_status` is classified by its code.
fn classify_http(err: &reqwest::Error) -> CalmateError {
    let host = err.url().and_then(|url| url.host_str()).unwrap_or("remote host");

    if err.is_timeout() {
        return CalmateError::Network(format!("request to {host} timed out"));
    }
    if err.is_connect() {
        return CalmateError::Network(format!("could not connect to {host}"));
    }
    if err.is_decode() {
        return CalmateError::InvalidInput(format!("unreadable response from {host}: {err}"));
    }

    match err.status() {
        Some(status) if matches!(status.as_u16(), 401 | 403) => {
            CalmateError::Auth(format!("{host} refused credentials (HTTP {})", status.as_u16()))
        }
        Some(status) if status.as_u16() == 429 || status.is_server_error() => {
            CalmateError::Network(format!("{host} unavailable (HTTP {})", status.as_u16()))
        }
        Some(status) => CalmateError::RemoteApi { status: status.as_u16(), body: err.to_string() },
        None => CalmateError::Network(err.to_string()),
    }
}

impl From<keyring::Error> for InfraError {
    fn from(err: keyring::Error) -> Self {
        let message = match &err {
            keyring::Error::NoEntry => "no credential stored in the keychain".to_string(),
            keyring::Error::NoStorageAccess(inner) => {
                format!("keychain locked or inaccessible: {inner}")
            }
            keyring::Error::BadEncoding(_) => "keychain value is not valid UTF-8".to_string(),
            other => format!("keychain error: {other}"),
        };
        Self(CalmateError::Storage(message))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        Self(CalmateError::Storage(format!("{:?}: {err}", err.kind())))
    }
}
