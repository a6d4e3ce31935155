//! XML parsing for WS-Security UsernameToken
//!
//! Extracts authentication credentials from SOAP Security headers.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::WsSecurityError;

/// Password type URI for digest passwords.
pub const PASSWORD_DIGEST_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";

/// Password type URI for plaintext passwords.
pub const PASSWORD_TEXT_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// Parsed UsernameToken from SOAP Security header
#[derive(Debug, Clone, Default)]
pub struct UsernameToken {
    /// The username
    pub username: String,
    /// Plaintext password or Base64-encoded digest, depending on `password_type`
    pub password: String,
    /// Value of the Password `Type` attribute, if any
    pub password_type: Option<String>,
    /// Base64-encoded nonce
    pub nonce: Option<String>,
    /// RFC 3339 timestamp
    pub created: Option<String>,
}

/// Parse UsernameToken from a SOAP envelope
///
/// Looks for the structure:
/// ```xml
/// <Envelope>
///   <Header>
///     <Security>
///       <UsernameToken>
///         <Username>...</Username>
///         <Password Type="...#PasswordDigest">...</Password>
///         <Nonce EncodingType="...#Base64Binary">...</Nonce>
///         <Created>...</Created>
///       </UsernameToken>
///     </Security>
///   </Header>
///   <Body>...</Body>
/// </Envelope>
/// ```
pub fn parse_username_token(xml: &str) -> Result<UsernameToken, WsSecurityError> {
    let mut reader = Reader::from_str(xml);

    let mut in_header = false;
    let mut in_security = false;
    let mut in_username_token = false;
    let mut saw_security = false;
    let mut saw_token = false;
    let mut current_element: Option<String> = None;

    let mut username: Option<String> = None;
    let mut password: Option<String> = None;
    let mut password_type: Option<String> = None;
    let mut nonce: Option<String> = None;
    let mut created: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);

                match name.as_str() {
                    "Header" => in_header = true,
                    "Security" if in_header => {
                        in_security = true;
                        saw_security = true;
                    }
                    "UsernameToken" if in_security => {
                        in_username_token = true;
                        saw_token = true;
                    }
                    "Password" if in_username_token => {
                        password_type = type_attribute(&e)?;
                        current_element = Some(name);
                    }
                    "Username" | "Nonce" | "Created" if in_username_token => {
                        current_element = Some(name);
                    }
                    _ => {}
                }
            }

            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "Security" if in_header => saw_security = true,
                    "UsernameToken" if in_security => saw_token = true,
                    "Password" if in_username_token => {
                        password_type = type_attribute(&e)?;
                        password = Some(String::new());
                    }
                    _ => {}
                }
            }

            Ok(Event::End(e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"Header" => in_header = false,
                    b"Security" => in_security = false,
                    b"UsernameToken" => in_username_token = false,
                    b"Username" | b"Password" | b"Nonce" | b"Created" => {
                        current_element = None;
                    }
                    _ => {}
                }
            }

            Ok(Event::Text(e)) => {
                if let Some(ref elem) = current_element {
                    let text = e
                        .unescape()
                        .map_err(|e| WsSecurityError::XmlError(e.to_string()))?
                        .trim()
                        .to_string();

                    match elem.as_str() {
                        "Username" => username = Some(text),
                        "Password" => password = Some(text),
                        "Nonce" => nonce = Some(text),
                        "Created" => created = Some(text),
                        _ => {}
                    }
                }
            }

            Ok(Event::Eof) => break,
            Err(e) => return Err(WsSecurityError::XmlError(e.to_string())),
            _ => {}
        }
    }

    if !saw_security {
        return Err(WsSecurityError::MissingSecurityHeader);
    }
    if !saw_token {
        return Err(WsSecurityError::MissingUsernameToken);
    }

    let username = username.ok_or_else(|| WsSecurityError::MissingElement("Username".into()))?;
    let password = password.ok_or_else(|| WsSecurityError::MissingElement("Password".into()))?;

    Ok(UsernameToken {
        username,
        password,
        password_type,
        nonce: nonce.filter(|n| !n.is_empty()),
        created: created.filter(|c| !c.is_empty()),
    })
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn type_attribute(e: &BytesStart<'_>) -> Result<Option<String>, WsSecurityError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| WsSecurityError::XmlError(e.to_string()))?;
        if attr.key.local_name().as_ref() == b"Type" {
            let value = attr
                .unescape_value()
                .map_err(|e| WsSecurityError::XmlError(e.to_string()))?;
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(None)
}
