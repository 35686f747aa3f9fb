//! Signed session tokens and per-job access grants (HS256).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::jobs::JobId;

pub const SESSION_TTL_MINUTES: i64 = 60 * 24;
pub const GRANT_TTL_MINUTES: i64 = 30;

/// Claims of the general-purpose bearer credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of an access grant: one subject, one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantClaims {
    pub sub: String,
    pub job_id: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    grant_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl: Duration::minutes(SESSION_TTL_MINUTES),
            grant_ttl: Duration::minutes(GRANT_TTL_MINUTES),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_grant_ttl(mut self, ttl: Duration) -> Self {
        self.grant_ttl = ttl;
        self
    }

    pub fn grant_ttl(&self) -> Duration {
        self.grant_ttl
    }

    pub fn issue_session(&self, subject: &str) -> ServiceResult<String> {
        self.issue_session_at(subject, Utc::now())
    }

    pub fn issue_session_at(&self, subject: &str, issued_at: DateTime<Utc>) -> ServiceResult<String> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.session_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn issue_grant(&self, subject: &str, job_id: &JobId) -> ServiceResult<String> {
        self.issue_grant_at(subject, job_id, Utc::now())
    }

    pub fn issue_grant_at(
        &self,
        subject: &str,
        job_id: &JobId,
        issued_at: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let claims = GrantClaims {
            sub: subject.to_string(),
            job_id: job_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.grant_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    /// Check signature and expiry of a bearer credential.
    pub fn verify_session(&self, token: &str) -> ServiceResult<SessionClaims> {
        let claims: SessionClaims = self.verify(token)?;
        if claims.sub.trim().is_empty() {
            return Err(ServiceError::InvalidCredential("Invalid token".to_string()));
        }
        Ok(claims)
    }

    /// Check signature, expiry and job scope of an access grant.
    pub fn verify_grant(&self, token: &str, job_id: &str) -> ServiceResult<GrantClaims> {
        let claims: GrantClaims = self.verify(token)?;
        if claims.job_id != job_id {
            warn!("Access grant for job {} presented for job {}", claims.job_id, job_id);
            return Err(ServiceError::InvalidCredential("Invalid video token".to_string()));
        }
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> ServiceResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("failed to sign token: {}", e)))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> ServiceResult<T> {
        decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    _ => "Invalid token",
                };
                warn!("Rejected credential: {}", reason);
                ServiceError::InvalidCredential(reason.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret")
    }

    #[test]
    fn test_session_round_trip() {
        let issuer = issuer();
        let token = issuer.issue_session("admin").unwrap();
        let claims = issuer.verify_session(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_MINUTES * 60);
    }

    #[test]
    fn test_grant_scoped_to_job() {
        let issuer = issuer();
        let job = JobId::new();
        let other = JobId::new();
        let grant = issuer.issue_grant("admin", &job).unwrap();

        let claims = issuer.verify_grant(&grant, &job.to_string()).unwrap();
        assert_eq!(claims.job_id, job.to_string());
        assert_eq!(claims.exp - claims.iat, GRANT_TTL_MINUTES * 60);

        let err = issuer.verify_grant(&grant, &other.to_string()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential(_)));
    }

    #[test]
    fn test_expired_grant_rejected() {
        let issuer = issuer();
        let job = JobId::new();
        let issued = Utc::now() - Duration::minutes(GRANT_TTL_MINUTES + 1);
        let grant = issuer.issue_grant_at("admin", &job, issued).unwrap();

        match issuer.verify_grant(&grant, &job.to_string()) {
            Err(ServiceError::InvalidCredential(reason)) => assert_eq!(reason, "Token expired"),
            other => panic!("expected expiry rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = TokenIssuer::new(b"other-secret").issue_session("admin").unwrap();
        assert!(issuer().verify_session(&token).is_err());
        assert!(issuer().verify_session("not-a-jwt").is_err());
    }

    #[test]
    fn test_session_token_is_not_a_grant() {
        let issuer = issuer();
        let session = issuer.issue_session("admin").unwrap();
        let job = JobId::new();
        assert!(issuer.verify_grant(&session, &job.to_string()).is_err());
    }

    #[test]
    fn test_custom_ttls() {
        let issuer = issuer()
            .with_session_ttl(Duration::minutes(5))
            .with_grant_ttl(Duration::minutes(1));
        let claims = issuer.verify_session(&issuer.issue_session("u").unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 300);
        assert_eq!(issuer.grant_ttl(), Duration::minutes(1));
    }
}
