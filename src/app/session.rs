use anyhow::Result;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

const ISSUER: &str = "warbler";
const RECENT_URL_CLAIM: &str = "recent_url";

/// Server-side view of the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub recent_url: Option<String>,
}

impl Session {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            recent_url: None,
        }
    }
}

/// Seals sessions into PASETO v4.local tokens and opens them again.
#[derive(Clone)]
pub struct SessionCodec {
    key: [u8; 32],
    ttl_hours: u64,
}

impl SessionCodec {
    pub fn new(key: [u8; 32], ttl_hours: u64) -> Self {
        Self { key, ttl_hours }
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours
    }

    pub fn seal(&self, session: &Session) -> Result<String> {
        let duration = std::time::Duration::from_secs(self.ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(ISSUER)?;
        claims.audience(ISSUER)?;
        if let Some(user_id) = session.user_id {
            claims.subject(&user_id.to_string())?;
        }
        if let Some(recent_url) = &session.recent_url {
            claims.add_additional(RECENT_URL_CLAIM, recent_url.as_str())?;
        }

        let key = SymmetricKey::<V4>::from(&self.key)?;
        Ok(local::encrypt(&key, &claims, None, None)?)
    }

    /// Tokens that fail to parse, decrypt or validate open as an empty session.
    pub fn open(&self, token: &str) -> Result<Session> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(ISSUER);
        rules.validate_audience_with(ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(Session::default()),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(Session::default()),
        };
        let Some(claims) = trusted.payload_claims() else {
            return Ok(Session::default());
        };

        let user_id = claims
            .get_claim("sub")
            .and_then(|value| value.as_str())
            .and_then(|value| Uuid::parse_str(value).ok());
        let recent_url = claims
            .get_claim(RECENT_URL_CLAIM)
            .and_then(|value| value.as_str())
            .map(str::to_string);

        Ok(Session {
            user_id,
            recent_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_user_and_recent_url() {
        let codec = SessionCodec::new([3u8; 32], 1);
        let session = Session {
            user_id: Some(Uuid::new_v4()),
            recent_url: Some("/users/abc?limit=5".into()),
        };
        let token = codec.seal(&session).unwrap();
        assert_eq!(codec.open(&token).unwrap(), session);
    }

    #[test]
    fn anonymous_session_has_no_user() {
        let codec = SessionCodec::new([3u8; 32], 1);
        let token = codec
            .seal(&Session {
                user_id: None,
                recent_url: Some("/".into()),
            })
            .unwrap();
        let opened = codec.open(&token).unwrap();
        assert_eq!(opened.user_id, None);
        assert_eq!(opened.recent_url.as_deref(), Some("/"));
    }

    #[test]
    fn foreign_key_opens_empty() {
        let sealed = SessionCodec::new([1u8; 32], 1)
            .seal(&Session::for_user(Uuid::new_v4()))
            .unwrap();
        let opened = SessionCodec::new([2u8; 32], 1).open(&sealed).unwrap();
        assert_eq!(opened, Session::default());
    }

    #[test]
    fn garbage_opens_empty() {
        let codec = SessionCodec::new([1u8; 32], 1);
        assert_eq!(codec.open("v4.local.garbage").unwrap(), Session::default());
        assert_eq!(codec.open("").unwrap(), Session::default());
    }
}
