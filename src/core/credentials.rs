use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{GatewayError, Result};

/// An opaque API access token. `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(****{})", self.0.len())
    }
}

/// Credential handed out by the pool, tagged with its position for logging.
#[derive(Debug, Clone)]
pub struct PooledCredential {
    pub index: usize,
    pub credential: Credential,
}

/// Fixed, ordered set of credentials rotated round-robin.
///
/// The pool does not remember which credentials were recently rejected; a
/// quota-limited token can come up again on a later call.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool from raw token values. Blank values are dropped and an
    /// empty result is a startup error.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<Credential> = tokens
            .into_iter()
            .map(|token| {
                let token: String = token.into();
                token.trim().to_string()
            })
            .filter(|token| !token.is_empty())
            .map(Credential)
            .collect();

        if credentials.is_empty() {
            return Err(GatewayError::NoCredentialsConfigured);
        }

        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Take the credential under the cursor and advance it by one.
    pub fn next(&self) -> PooledCredential {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.credentials.len();
        PooledCredential {
            index,
            credential: self.credentials[index].clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
