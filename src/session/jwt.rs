//! Structural decoding of the session-initiation token. Only the payload segment
//! is read; the signature is left to the identity API, which rejects forged or
//! stale tokens during the handshake.

use super::claims::Claims;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("token is not a JWT")]
    NotAJwt,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("claims are not valid utf-8")]
    Utf8,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wire-stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotAJwt => "NOT_A_JWT",
            Self::Base64 | Self::Utf8 | Self::Json(_) => "MALFORMED_JWT_CLAIMS",
        }
    }
}

fn b64d_json<T: DeserializeOwned>(s: &str) -> Result<T, Error> {
    // Some issuers keep base64 padding on the segments.
    let bytes = Base64UrlUnpadded::decode_vec(s.trim_end_matches('=')).map_err(|_| Error::Base64)?;
    let json = std::str::from_utf8(&bytes).map_err(|_| Error::Utf8)?;
    Ok(serde_json::from_str(json)?)
}

/// Decode the claims of a `header.payload[.signature]` token.
///
/// # Errors
///
/// Returns [`Error::NotAJwt`] when the token does not have 2 or 3 segments, and
/// one of the malformed-claims variants when the payload is not base64url
/// encoded UTF-8 JSON carrying the required claims.
pub fn decode(token: &str) -> Result<Claims, Error> {
    let segments: Vec<&str> = token.split('.').collect();
    if !(2..=3).contains(&segments.len()) {
        return Err(Error::NotAJwt);
    }

    b64d_json(segments[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn b64e(value: &[u8]) -> String {
        Base64UrlUnpadded::encode_string(value)
    }

    fn token_with_payload(payload: &Value) -> String {
        let header = b64e(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = b64e(payload.to_string().as_bytes());
        format!("{header}.{claims}.c2lnbmF0dXJl")
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        for token in ["", "onlyone", "a.b.c.d", "a.b.c.d.e"] {
            let result = decode(token);
            assert!(
                matches!(result, Err(Error::NotAJwt)),
                "expected NOT_A_JWT for {token:?}"
            );
        }
    }

    #[test]
    fn accepts_two_and_three_segments() -> Result<(), Error> {
        let payload = json!({ "appHref": "https://api.example.com/v1/applications/app1" });
        let three = token_with_payload(&payload);
        let two = three.rsplit_once('.').map(|(head, _)| head.to_string());

        assert_eq!(
            decode(&three)?.app_href,
            "https://api.example.com/v1/applications/app1"
        );
        assert_eq!(
            decode(two.as_deref().unwrap_or_default())?.app_href,
            "https://api.example.com/v1/applications/app1"
        );
        Ok(())
    }

    #[test]
    fn tolerates_padded_payload() -> Result<(), Error> {
        let payload = json!({ "appHref": "https://x/v1/applications/a" });
        let padded = format!("e30.{}==.sig", b64e(payload.to_string().as_bytes()));
        assert_eq!(decode(&padded)?.app_href, "https://x/v1/applications/a");
        Ok(())
    }

    #[test]
    fn malformed_payloads_are_malformed_claims() {
        let not_json = format!("e30.{}.sig", b64e(b"not json"));
        let not_utf8 = format!("e30.{}.sig", b64e(&[0xff, 0xfe, 0xfd]));
        let missing_app_href = token_with_payload(&json!({ "sub": "someone" }));

        for token in [
            "e30.!!!.sig",
            "e30..sig",
            not_json.as_str(),
            not_utf8.as_str(),
            missing_app_href.as_str(),
        ] {
            let err = decode(token).err();
            assert_eq!(
                err.as_ref().map(Error::code),
                Some("MALFORMED_JWT_CLAIMS"),
                "expected MALFORMED_JWT_CLAIMS for {token:?}"
            );
        }
    }

    #[test]
    fn keeps_unrecognized_claims() -> Result<(), Error> {
        let token = token_with_payload(&json!({
            "appHref": "https://x/v1/applications/app1",
            "iss": "https://x/v1/applications/app1",
            "state": "opaque-state"
        }));
        let claims = decode(&token)?;
        assert_eq!(claims.extra.get("state"), Some(&json!("opaque-state")));
        Ok(())
    }
}
