//! The `X-WSSE` UsernameToken credential and its wire format.
//!
//! ```text
//! X-WSSE: UsernameToken Username="bob", PasswordDigest="...", Nonce="...", Created="2026-10-19T10:00:00Z"
//! ```

use crate::{
    crypto::{digest::compute_digest_b64, nonce::generate_nonce},
    error::{AuthError, Result},
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::{fmt, str::FromStr};

/// Header name the credential travels in
pub const HEADER_NAME: &str = "X-WSSE";

/// Scheme marker that opens the header value
pub const SCHEME: &str = "UsernameToken";

/// Kind of credential presented in an authentication header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// WSSE `UsernameToken`
    UsernameToken,
    Other,
}

impl CredentialKind {
    /// Classify a raw header value (with or without the `X-WSSE:` prefix)
    pub fn detect(header: &str) -> Self {
        let value = strip_header_name(header);
        match value.split_once(char::is_whitespace) {
            Some((scheme, _)) if scheme == SCHEME => CredentialKind::UsernameToken,
            _ => CredentialKind::Other,
        }
    }
}

/// A parsed WSSE credential
///
/// Immutable once parsed. `created` keeps the exact string from the wire
/// because the digest is computed over those bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameToken {
    username: String,
    digest: String,
    nonce: String,
    created: String,
    created_at: DateTime<Utc>,
}

impl UsernameToken {
    /// Build a fresh token for `username`, timestamped now
    pub fn generate(username: &str, secret: &str) -> Result<Self> {
        Self::generate_at(username, secret, Utc::now())
    }

    /// Build a fresh token with an explicit `Created` time
    ///
    /// `Created` is rendered as UTC with second precision.
    pub fn generate_at(username: &str, secret: &str, created_at: DateTime<Utc>) -> Result<Self> {
        let nonce = generate_nonce();
        let created = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let digest = compute_digest_b64(&nonce, &created, secret)?;
        Self::from_parts(username, digest, nonce, created)
    }

    /// Assemble a token from its four wire fields
    ///
    /// # Errors
    /// - `MalformedCredential` - A field is empty, contains a double quote,
    ///   or `created` is not an ISO-8601 timestamp
    pub fn from_parts(
        username: impl Into<String>,
        digest: impl Into<String>,
        nonce: impl Into<String>,
        created: impl Into<String>,
    ) -> Result<Self> {
        let username = required_field("Username", username.into())?;
        let digest = required_field("PasswordDigest", digest.into())?;
        let nonce = required_field("Nonce", nonce.into())?;
        let created = required_field("Created", created.into())?;
        let created_at = DateTime::parse_from_rfc3339(&created)
            .map_err(|e| malformed(format!("Created is not an ISO-8601 timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            username,
            digest,
            nonce,
            created,
            created_at,
        })
    }

    /// Value of the `Username` attribute
    ///
    /// # Example
    /// ```rust
    /// use wsse_auth::UsernameToken;
    ///
    /// let token: UsernameToken = r#"UsernameToken Username="bob", PasswordDigest="abc=", Nonce="bm9uY2U=", Created="2026-10-19T12:00:00Z""#
    ///     .parse()
    ///     .unwrap();
    /// assert_eq!(token.username(), "bob");
    /// assert_eq!(token.digest(), "abc=");
    /// assert_eq!(token.nonce(), "bm9uY2U=");
    /// assert_eq!(token.created(), "2026-10-19T12:00:00Z");
    /// ```
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Base64 `PasswordDigest` as received, not decoded
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// `Nonce` in its wire form
    ///
    /// This string keys the nonce ledger. The digest is computed over its
    /// base64-decoded bytes.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// `Created` exactly as transmitted
    ///
    /// The digest covers these bytes, so an equivalent timestamp in another
    /// form (e.g. `+00:00` instead of `Z`) would produce a different digest.
    pub fn created(&self) -> &str {
        &self.created
    }

    /// `Created` as an instant, normalized to UTC
    ///
    /// Used for the freshness checks.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Full header line, `X-WSSE: UsernameToken ...`
    pub fn to_header_line(&self) -> String {
        format!("{HEADER_NAME}: {self}")
    }
}

impl fmt::Display for UsernameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"{SCHEME} Username="{}", PasswordDigest="{}", Nonce="{}", Created="{}""#,
            self.username, self.digest, self.nonce, self.created
        )
    }
}

impl FromStr for UsernameToken {
    type Err = AuthError;

    /// Parse a header value; the `X-WSSE:` prefix is optional and attributes
    /// may come in any order.
    fn from_str(header: &str) -> Result<Self> {
        let value = strip_header_name(header);
        let attributes = value
            .strip_prefix(SCHEME)
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .ok_or_else(|| malformed(format!("expected {SCHEME} scheme")))?;

        let mut username = None;
        let mut digest = None;
        let mut nonce = None;
        let mut created = None;

        for (key, value) in parse_attributes(attributes)? {
            let slot = match key {
                "Username" => &mut username,
                "PasswordDigest" => &mut digest,
                "Nonce" => &mut nonce,
                "Created" => &mut created,
                _ => continue,
            };
            if slot.replace(value).is_some() {
                return Err(malformed(format!("duplicate attribute {key}")));
            }
        }

        let missing = |name: &str| malformed(format!("missing attribute {name}"));
        Self::from_parts(
            username.ok_or_else(|| missing("Username"))?,
            digest.ok_or_else(|| missing("PasswordDigest"))?,
            nonce.ok_or_else(|| missing("Nonce"))?,
            created.ok_or_else(|| missing("Created"))?,
        )
    }
}

/// Generate a complete `X-WSSE` header line for `username`
///
/// Intended for client SDKs and test harnesses.
///
/// # Arguments
/// * `username` - User the credential is issued for
/// * `secret` - Plaintext shared secret
///
/// # Returns
/// * `Ok(String)` - Header line with a fresh nonce and `Created` set to now (UTC, seconds)
/// * `Err(AuthError)` - `MalformedCredential` if `username` is empty or contains `"`
///
/// # Example
/// ```rust
/// use wsse_auth::build_credential_header;
///
/// let header = build_credential_header("bob", "s3cret").unwrap();
/// assert!(header.starts_with("X-WSSE: UsernameToken Username=\"bob\""));
/// ```
pub fn build_credential_header(username: &str, secret: &str) -> Result<String> {
    Ok(UsernameToken::generate(username, secret)?.to_header_line())
}

/// Like [`build_credential_header`] with an explicit `Created` time
///
/// # Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use wsse_auth::build_credential_header_at;
///
/// let created_at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
/// let header = build_credential_header_at("bob", "s3cret", created_at).unwrap();
/// assert!(header.ends_with(r#"Created="2026-10-19T12:00:00Z""#));
/// ```
pub fn build_credential_header_at(
    username: &str,
    secret: &str,
    created_at: DateTime<Utc>,
) -> Result<String> {
    Ok(UsernameToken::generate_at(username, secret, created_at)?.to_header_line())
}

fn strip_header_name(header: &str) -> &str {
    let trimmed = header.trim();
    match trimmed.split_once(':') {
        Some((name, rest)) if name.trim().eq_ignore_ascii_case(HEADER_NAME) => rest.trim_start(),
        _ => trimmed,
    }
}

/// Split `key="value", key="value"` into pairs
fn parse_attributes(input: &str) -> Result<Vec<(&str, String)>> {
    let mut attributes = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let (key, after_key) = rest
            .split_once('=')
            .ok_or_else(|| malformed("expected key=\"value\" attribute"))?;
        let key = key.trim();
        if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == ',' || c == '"') {
            return Err(malformed(format!("invalid attribute name {key:?}")));
        }

        let quoted = after_key
            .trim_start()
            .strip_prefix('"')
            .ok_or_else(|| malformed(format!("value of {key} must be quoted")))?;
        let (value, after_value) = quoted
            .split_once('"')
            .ok_or_else(|| malformed(format!("unterminated value for {key}")))?;
        attributes.push((key, value.to_string()));

        rest = after_value.trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
        } else if !rest.is_empty() {
            return Err(malformed(format!("expected ',' after {key}")));
        }
    }

    Ok(attributes)
}

fn required_field(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(malformed(format!("{name} is empty")));
    }
    if value.contains('"') {
        return Err(malformed(format!("{name} contains a double quote")));
    }
    Ok(value)
}

fn malformed(msg: impl Into<String>) -> AuthError {
    AuthError::MalformedCredential(msg.into())
}
