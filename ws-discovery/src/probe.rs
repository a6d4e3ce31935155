//! Probe parsing and ProbeMatch rendering

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

const WSA_NAMESPACE: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
const WSD_NAMESPACE: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery";
const ONVIF_NETWORK_NAMESPACE: &str = "http://www.onvif.org/ver10/network/wsdl";

/// Header fields of an inbound discovery message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHeader {
    pub message_id: String,
    pub action: String,
}

impl ProbeHeader {
    pub fn is_probe(&self) -> bool {
        self.action.contains("Probe")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    MessageId,
    Action,
}

/// Reads the MessageID and Action out of a SOAP envelope header.
///
/// Returns `None` when the datagram is not well-formed XML or its root
/// element is not an `Envelope`.
pub fn parse_probe(data: &[u8]) -> Option<ProbeHeader> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut header = ProbeHeader::default();
    let mut depth = 0usize;
    let mut saw_envelope = false;
    let mut in_header = false;
    let mut field = Field::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                let local = name.as_ref();
                if depth == 0 {
                    if local != b"Envelope" {
                        return None;
                    }
                    saw_envelope = true;
                } else if depth == 1 && local == b"Header" {
                    in_header = true;
                } else if in_header && depth == 2 {
                    field = match local {
                        b"MessageID" => Field::MessageId,
                        b"Action" => Field::Action,
                        _ => Field::None,
                    };
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 && e.local_name().as_ref() != b"Envelope" {
                    return None;
                }
                if depth == 0 {
                    saw_envelope = true;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    in_header = false;
                }
                field = Field::None;
            }
            Ok(Event::Text(t)) => {
                if field != Field::None {
                    let text = t.unescape().ok()?.into_owned();
                    match field {
                        Field::MessageId => header.message_id.push_str(&text),
                        Field::Action => header.action.push_str(&text),
                        Field::None => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
        buf.clear();
    }

    saw_envelope.then_some(header)
}

/// Renders a ProbeMatches response. Every interpolated value is escaped.
pub(crate) fn render_probe_match(
    message_id: &str,
    relates_to: &str,
    device_uuid: &str,
    scopes: &[String],
    xaddrs: &str,
    metadata_version: u32,
) -> String {
    let relates_to = escape(relates_to);
    let scopes = scopes.join(" ");
    let scopes = escape(scopes.as_str());
    let xaddrs = escape(xaddrs);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope
    xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsa="{WSA_NAMESPACE}"
    xmlns:wsd="{WSD_NAMESPACE}"
    xmlns:dn="{ONVIF_NETWORK_NAMESPACE}">
  <SOAP-ENV:Header>
    <wsa:MessageID>uuid:{message_id}</wsa:MessageID>
    <wsa:RelatesTo>{relates_to}</wsa:RelatesTo>
    <wsa:To>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</wsa:To>
    <wsa:Action>http://schemas.xmlsoap.org/ws/2005/04/discovery/ProbeMatches</wsa:Action>
  </SOAP-ENV:Header>
  <SOAP-ENV:Body>
    <wsd:ProbeMatches>
      <wsd:ProbeMatch>
        <wsa:EndpointReference>
          <wsa:Address>uuid:{device_uuid}</wsa:Address>
        </wsa:EndpointReference>
        <wsd:Types>dn:NetworkVideoTransmitter</wsd:Types>
        <wsd:Scopes>{scopes}</wsd:Scopes>
        <wsd:XAddrs>{xaddrs}</wsd:XAddrs>
        <wsd:MetadataVersion>{metadata_version}</wsd:MetadataVersion>
      </wsd:ProbeMatch>
    </wsd:ProbeMatches>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}
