//! SOAP request parsing.
//!
//! The action is the first element inside `Body`. It is parsed into a small
//! element tree so each service can decode its own request variants without
//! a schema.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::SoapFault;
use crate::templates;

pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Request bodies larger than this are rejected, not truncated.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// An XML element with namespace prefixes stripped from element and
/// attribute names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Trimmed text of the first child called `name`, or "" if absent.
    pub fn child_text(&self, name: &str) -> &str {
        self.child(name).map(Element::text).unwrap_or_default()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the first element inside the SOAP Body.
///
/// The element name is the action; its subtree carries the arguments.
pub fn parse_action(xml: &str) -> Result<Element, SoapFault> {
    parse_body_element(xml).map_err(|e| {
        tracing::debug!("SOAP parse error: {}", e);
        SoapFault::action_failed("Failed to parse SOAP action")
    })
}

fn parse_body_element(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_body = false;
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                if !in_body {
                    if e.local_name().as_ref() == b"Body" {
                        in_body = true;
                    }
                    continue;
                }
                stack.push(Element::from_start(&e).map_err(|e| e.to_string())?);
            }
            Event::Empty(e) => {
                if !in_body {
                    continue;
                }
                let element = Element::from_start(&e).map_err(|e| e.to_string())?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if !in_body {
                    continue;
                }
                let Some(done) = stack.pop() else {
                    return Err("empty SOAP body".to_string());
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Ok(done),
                }
            }
            Event::Eof => return Err("no action element in SOAP body".to_string()),
            _ => {}
        }
    }
}

/// Parse a numeric argument. Malformed numbers are an invalid-argument fault.
pub(crate) fn parse_f64(value: &str) -> Result<f64, SoapFault> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| SoapFault::invalid_args("Invalid request"))
}

/// Numeric attribute; absent means 0.
pub(crate) fn attr_f64(element: &Element, name: &str) -> Result<f64, SoapFault> {
    element.attr(name).map(parse_f64).transpose().map(|v| v.unwrap_or(0.0))
}

/// Wrap a response body in the envelope and send it with 200.
pub fn respond(body: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)],
        templates::envelope(body),
    )
        .into_response()
}
