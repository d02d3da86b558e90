//! Bearer tokens for App Store Connect.
//!
//! Tokens are ES256-signed JWTs minted from the API key in [`Config`]. A
//! minted token is cached and reused until it gets within the refresh margin
//! of its expiry.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    config::{ClientOptions, Config},
    error::{Error, Result},
};

pub const AUDIENCE: &str = "appstoreconnect-v1";

/// Source of wall-clock time for `iat`/`exp`.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    pub aud: String,
}

enum TokenSource {
    Signed(Config),
    Static(String),
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

pub struct TokenManager {
    source: TokenSource,
    lifetime: Duration,
    refresh_margin: Duration,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
    minted: AtomicUsize,
}

impl TokenManager {
    pub fn new(config: Config, options: &ClientOptions) -> Self {
        Self {
            source: TokenSource::Signed(config),
            lifetime: options.token_lifetime,
            refresh_margin: options.refresh_margin,
            clock: Arc::new(SystemClock),
            cached: Mutex::new(None),
            minted: AtomicUsize::new(0),
        }
    }

    /// Always hands out `token` without signing anything.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            lifetime: Duration::ZERO,
            refresh_margin: Duration::ZERO,
            clock: Arc::new(SystemClock),
            cached: Mutex::new(None),
            minted: AtomicUsize::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of tokens signed so far.
    pub fn minted(&self) -> usize {
        self.minted.load(Ordering::SeqCst)
    }

    /// Returns the cached token, minting a fresh one when it is missing or
    /// about to expire.
    ///
    /// The cache lock is held while signing so concurrent callers wait for
    /// the one token being minted instead of each signing their own.
    pub async fn token(&self) -> Result<String> {
        let config = match &self.source {
            TokenSource::Static(tok) => return Ok(tok.clone()),
            TokenSource::Signed(config) => config,
        };

        let mut guard = self.cached.lock().await;
        let now = self.clock.now();
        if let Some(cached) = &*guard
            && now + self.refresh_margin < cached.expires_at
        {
            return Ok(cached.token.clone());
        }

        let (token, expires_at) = self.sign(config, now)?;
        self.minted.fetch_add(1, Ordering::SeqCst);
        debug!(key_id = %config.key_id, exp = ?expires_at, "minted bearer token");
        guard.replace(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }

    /// Drops the cached token so the next call mints a new one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    fn sign(&self, config: &Config, now: SystemTime) -> Result<(String, SystemTime)> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Auth(format!("system clock before epoch: {e}")))?
            .as_secs();
        let exp = iat + self.lifetime.as_secs();
        let claims = Claims {
            iss: config.issuer_id.clone(),
            iat,
            exp,
            aud: AUDIENCE.to_string(),
        };
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(config.key_id.clone());

        let key = EncodingKey::from_ec_pem(config.pem().as_bytes()).map_err(|e| {
            Error::Auth(format!("private key is not an EC PKCS#8 key: {e}"))
        })?;
        let token = encode(&header, &claims, &key)
            .map_err(|e| Error::Auth(format!("failed to sign token: {e}")))?;
        Ok((token, UNIX_EPOCH + Duration::from_secs(exp)))
    }
}
