use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::{Claims, TokenError};

/// Subject placed in every issued token unless configured otherwise.
pub const DEFAULT_SUBJECT: &str = "user";

/// Validity window of issued tokens unless configured otherwise.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Issuer settings. The signing secret is always supplied by the caller.
#[derive(Clone)]
pub struct IssuerConfig {
    secret: Vec<u8>,
    subject: String,
    ttl: Duration,
}

impl IssuerConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            subject: DEFAULT_SUBJECT.to_string(),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("secret", &"<redacted>")
            .field("subject", &self.subject)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// A freshly minted, signed token plus the facts it asserts.
///
/// Never persisted and never revoked; expiry is checked by whoever holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub token: String,
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn into_token(self) -> String {
        self.token
    }
}

/// Issues HS256-signed tokens for a fixed subject.
///
/// There is no user lookup and no input: every call yields a token for the
/// configured subject valid from "now" for the configured TTL.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    subject: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(&config.secret),
            subject: config.subject,
            ttl: config.ttl,
        }
    }

    /// Issue a token valid from the current wall-clock time.
    pub fn issue(&self) -> Result<Credential, TokenError> {
        self.issue_at(Utc::now())
    }

    /// Issue a token valid from `now`.
    ///
    /// `now` is truncated to whole seconds so the credential's timestamps match
    /// what a decoder reads back from the token.
    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<Credential, TokenError> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at.checked_add_signed(self.ttl).ok_or_else(|| {
            TokenError::Signing(format!(
                "expiry {}s after {issued_at} is out of range",
                self.ttl.num_seconds()
            ))
        })?;
        let claims = Claims::new(self.subject.clone(), issued_at, expires_at);

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        tracing::debug!(subject = %self.subject, expires_at = %expires_at, "issued token");

        Ok(Credential {
            token,
            subject: self.subject.clone(),
            issued_at,
            expires_at,
        })
    }
}

impl core::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("subject", &self.subject)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;
    use crate::{Hs256JwtValidator, JwtValidator, TokenValidationError};

    const SECRET: &str = "test-secret";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(IssuerConfig::new(SECRET))
    }

    #[test]
    fn issued_token_decodes_with_the_signing_key() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 15).unwrap();
        let credential = issuer().issue_at(now).unwrap();

        let claims = Hs256JwtValidator::new(SECRET)
            .validate(&credential.token, now)
            .unwrap();

        assert_eq!(claims.sub, "user");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(credential.expires_at - credential.issued_at, Duration::hours(1));
    }

    #[test]
    fn subsecond_precision_is_dropped() {
        let now = Utc.timestamp_opt(1_700_000_000, 999_000_000).unwrap();
        let credential = issuer().issue_at(now).unwrap();
        assert_eq!(credential.issued_at.timestamp_subsec_nanos(), 0);
        assert_eq!(credential.issued_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn configured_subject_and_ttl_are_used() {
        let issuer = TokenIssuer::new(
            IssuerConfig::new(SECRET)
                .with_subject("service-account")
                .with_ttl(Duration::minutes(5)),
        );
        let now = Utc::now();
        let credential = issuer.issue_at(now).unwrap();
        let claims = Hs256JwtValidator::new(SECRET)
            .validate(&credential.token, now)
            .unwrap();

        assert_eq!(claims.sub, "service-account");
        assert_eq!(claims.ttl_secs(), 300);
    }

    #[test]
    fn token_is_expired_after_one_hour() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let credential = issuer().issue_at(now).unwrap();

        let err = Hs256JwtValidator::new(SECRET)
            .validate(&credential.token, now + Duration::seconds(3600))
            .unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn out_of_range_expiry_is_an_error() {
        let issuer = TokenIssuer::new(
            IssuerConfig::new(SECRET).with_ttl(Duration::seconds(9_000_000_000_000)),
        );
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();

        let err = issuer.issue_at(now).unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn debug_output_does_not_leak_the_secret() {
        let rendered = format!("{:?} {:?}", IssuerConfig::new(SECRET), issuer());
        assert!(!rendered.contains(SECRET));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: for any issuance instant the window is exactly one hour
        /// and the subject is the fixed placeholder.
        #[test]
        fn window_is_always_one_hour(secs in 0i64..4_000_000_000i64) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let credential = issuer().issue_at(now).unwrap();
            let claims = Hs256JwtValidator::new(SECRET)
                .validate(&credential.token, now)
                .unwrap();

            prop_assert_eq!(claims.sub.as_str(), DEFAULT_SUBJECT);
            prop_assert_eq!(claims.iat, secs);
            prop_assert_eq!(claims.exp - claims.iat, DEFAULT_TTL_SECS);
        }
    }
}
