//! Remote store endpoint and credential configuration.
//!
//! The endpoint is always external configuration. The credential is kept
//! apart from the endpoint until the connection URL is composed, so it never
//! appears in logs or error messages.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::{env_lookup, must_var};
use crate::error::PatchError;

pub const STORE_URL_VAR: &str = "PATCH_STORE_URL";
pub const STORE_CREDENTIAL_VAR: &str = "PATCH_STORE_CREDENTIAL";

/// RFC 3986 userinfo: unreserved characters pass through, everything else is encoded.
pub(crate) const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Opaque secret used to authenticate against the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: String,
    pub credential: Option<Credential>,
}

impl StoreConfig {
    pub fn new(endpoint: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
        }
    }

    /// Read `PATCH_STORE_URL` and `PATCH_STORE_CREDENTIAL` from the process environment.
    pub fn from_env() -> Result<Self, PatchError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = must_var(&lookup, STORE_URL_VAR)?;
        let credential = lookup(STORE_CREDENTIAL_VAR)
            .filter(|v| !v.is_empty())
            .map(Credential::new);
        Ok(Self {
            endpoint,
            credential,
        })
    }

    /// Replace the endpoint, keeping the credential.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the URL handed to the driver, with the credential in the password slot.
    pub fn connection_url(&self) -> Result<String, PatchError> {
        let Some(credential) = &self.credential else {
            return Ok(self.endpoint.clone());
        };

        let Some(scheme_end) = self.endpoint.find("://") else {
            return Err(PatchError::config(format!(
                "endpoint '{}' is not a URL; cannot attach a credential",
                self.endpoint
            )));
        };
        let (scheme, rest) = self.endpoint.split_at(scheme_end + 3);

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        let Some(at) = authority.rfind('@') else {
            return Err(PatchError::config(
                "endpoint names no user; a credential needs a user to attach to",
            ));
        };
        let user = authority[..at].split(':').next().unwrap_or_default();
        if user.is_empty() {
            return Err(PatchError::config(
                "endpoint names no user; a credential needs a user to attach to",
            ));
        }
        let host = &authority[at + 1..];
        let secret = utf8_percent_encode(credential.expose(), USERINFO);

        Ok(format!("{scheme}{user}:{secret}@{host}{tail}"))
    }
}
