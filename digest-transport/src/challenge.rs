//! `WWW-Authenticate: Digest` parsing and RFC 2617 response computation.

use std::time::Instant;

use crate::error::DigestError;

/// A server challenge cached per destination URL.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: String,
    pub algorithm: String,
    pub qop: String,
    pub(crate) received_at: Instant,
}

impl Challenge {
    /// Parse a `WWW-Authenticate` header value.
    ///
    /// Only the `Digest` scheme is accepted. Missing `algorithm` means MD5. When
    /// the server offers several qop values, `auth` is preferred.
    pub fn parse(header: &str) -> Result<Self, DigestError> {
        let params = header
            .strip_prefix("Digest ")
            .ok_or_else(|| DigestError::InvalidChallenge("not a Digest challenge".into()))?;

        let mut challenge = Challenge {
            realm: String::new(),
            nonce: String::new(),
            opaque: String::new(),
            algorithm: "MD5".to_string(),
            qop: String::new(),
            received_at: Instant::now(),
        };

        for part in split_params(params) {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "opaque" => challenge.opaque = value,
                "algorithm" => challenge.algorithm = value,
                "qop" => challenge.qop = select_qop(&value),
                _ => {}
            }
        }

        Ok(challenge)
    }

    /// Compute the `response` field.
    ///
    /// `nc` and `cnonce` are only used when the challenge carries a qop.
    pub fn response(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        nc: &str,
        cnonce: &str,
    ) -> String {
        let ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        if self.qop.is_empty() {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        } else {
            md5_hex(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1, self.nonce, nc, cnonce, self.qop, ha2
            ))
        }
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:032x}", md5::compute(input.as_bytes()))
}

/// Split on commas that are not inside a quoted string.
pub(crate) fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts
}

fn select_qop(offered: &str) -> String {
    let options: Vec<&str> = offered.split(',').map(str::trim).collect();
    if options.contains(&"auth") {
        "auth".to_string()
    } else {
        options.first().copied().unwrap_or_default().to_string()
    }
}
