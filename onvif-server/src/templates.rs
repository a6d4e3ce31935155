//! ONVIF SOAP XML response templates
//!
//! All XML templates are centralized here to keep the service modules clean.
//! Service functions return the Body content; [`envelope`] adds the wrapper.

use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use quick_xml::escape::escape;

/// Escape a string for safe inclusion in XML content/attributes.
/// Converts &, <, >, ", ' to their XML entity equivalents.
pub fn xml_escape(s: &str) -> String {
    escape(s).to_string()
}

/// Response envelope. Every service namespace is declared once here.
pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
            xmlns:tds="http://www.onvif.org/ver10/device/wsdl"
            xmlns:trt="http://www.onvif.org/ver10/media/wsdl"
            xmlns:tptz="http://www.onvif.org/ver20/ptz/wsdl"
            xmlns:timg="http://www.onvif.org/ver20/imaging/wsdl"
            xmlns:tt="http://www.onvif.org/ver10/schema">
  <s:Body>
    {}
  </s:Body>
</s:Envelope>"#,
        body
    )
}

/// SOAP fault envelope. Only the ONVIF error namespace is declared.
pub fn fault(code: &str, subcode: &str, reason: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
            xmlns:ter="http://www.onvif.org/ver10/error">
  <s:Body>
    <s:Fault>
      <s:Code>
        <s:Value>{}</s:Value>
        <s:Subcode>
          <s:Value>{}</s:Value>
        </s:Subcode>
      </s:Code>
      <s:Reason>
        <s:Text xml:lang="en">{}</s:Text>
      </s:Reason>
    </s:Fault>
  </s:Body>
</s:Envelope>"#,
        xml_escape(code),
        xml_escape(subcode),
        xml_escape(reason)
    )
}

/// Body of a response that carries no data, e.g. `tptz:StopResponse`.
pub fn empty_response(name: &str) -> String {
    format!("<{}/>", name)
}

// ---------------------------------------------------------------------------
// Device service
// ---------------------------------------------------------------------------

pub fn device_information(model: &str) -> String {
    format!(
        r#"<tds:GetDeviceInformationResponse>
      <tds:Manufacturer>AtomCam</tds:Manufacturer>
      <tds:Model>{}</tds:Model>
      <tds:FirmwareVersion>2.5.19</tds:FirmwareVersion>
      <tds:SerialNumber>ONVIF-RELAY-001</tds:SerialNumber>
      <tds:HardwareId>ONVIF-RELAY</tds:HardwareId>
    </tds:GetDeviceInformationResponse>"#,
        xml_escape(model)
    )
}

fn date_time<T: Datelike + Timelike>(tag: &str, t: &T) -> String {
    format!(
        r#"<tt:{tag}>
          <tt:Time><tt:Hour>{}</tt:Hour><tt:Minute>{}</tt:Minute><tt:Second>{}</tt:Second></tt:Time>
          <tt:Date><tt:Year>{}</tt:Year><tt:Month>{}</tt:Month><tt:Day>{}</tt:Day></tt:Date>
        </tt:{tag}>"#,
        t.hour(),
        t.minute(),
        t.second(),
        t.year(),
        t.month(),
        t.day(),
    )
}

pub fn system_date_and_time(utc: &DateTime<Utc>, local: &DateTime<Local>) -> String {
    format!(
        r#"<tds:GetSystemDateAndTimeResponse>
      <tds:SystemDateAndTime>
        <tt:DateTimeType>NTP</tt:DateTimeType>
        <tt:DaylightSavings>false</tt:DaylightSavings>
        <tt:TimeZone><tt:TZ>UTC</tt:TZ></tt:TimeZone>
        {}
        {}
      </tds:SystemDateAndTime>
    </tds:GetSystemDateAndTimeResponse>"#,
        date_time("UTCDateTime", utc),
        date_time("LocalDateTime", local)
    )
}

pub fn device_capability(base_url: &str) -> String {
    format!(
        r#"<tt:Device>
          <tt:XAddr>{}/onvif/device_service</tt:XAddr>
          <tt:Network/>
          <tt:System DiscoveryResolve="true" DiscoveryBye="true"/>
          <tt:IO/>
          <tt:Security/>
        </tt:Device>"#,
        xml_escape(base_url)
    )
}

pub fn media_capability(base_url: &str) -> String {
    format!(
        r#"<tt:Media>
          <tt:XAddr>{}/onvif/media_service</tt:XAddr>
          <tt:StreamingCapabilities RTP_TCP="true" RTP_RTSP_TCP="true"/>
        </tt:Media>"#,
        xml_escape(base_url)
    )
}

pub fn ptz_capability(base_url: &str) -> String {
    format!(
        "<tt:PTZ><tt:XAddr>{}/onvif/ptz_service</tt:XAddr></tt:PTZ>",
        xml_escape(base_url)
    )
}

pub fn imaging_capability(base_url: &str) -> String {
    format!(
        "<tt:Imaging><tt:XAddr>{}/onvif/imaging_service</tt:XAddr></tt:Imaging>",
        xml_escape(base_url)
    )
}

pub fn capabilities(sections: &str) -> String {
    format!(
        r#"<tds:GetCapabilitiesResponse>
      <tds:Capabilities>
        {}
      </tds:Capabilities>
    </tds:GetCapabilitiesResponse>"#,
        sections
    )
}

// ---------------------------------------------------------------------------
// Media service
// ---------------------------------------------------------------------------

/// Values rendered into one `trt:Profiles` entry.
pub struct ProfileView<'a> {
    pub token: &'a str,
    pub encoding: &'a str,
    pub width: u32,
    pub height: u32,
    pub ptz: bool,
}

pub fn profile(p: &ProfileView<'_>) -> String {
    let token = xml_escape(p.token);
    let ptz = if p.ptz {
        format!(
            r#"
        <tt:PTZConfiguration token="{token}_PTZ">
          <tt:Name>{token} PTZ</tt:Name>
          <tt:NodeToken>PTZNode_1</tt:NodeToken>
        </tt:PTZConfiguration>"#
        )
    } else {
        String::new()
    };

    format!(
        r#"<trt:Profiles token="{token}" fixed="true">
        <tt:Name>{token}</tt:Name>
        <tt:VideoSourceConfiguration token="{token}_VSC">
          <tt:Name>{token} Video Source</tt:Name>
          <tt:SourceToken>VideoSource_1</tt:SourceToken>
          <tt:Bounds x="0" y="0" width="{w}" height="{h}"/>
        </tt:VideoSourceConfiguration>
        <tt:VideoEncoderConfiguration token="{token}_VEC">
          <tt:Name>{token} Video Encoder</tt:Name>
          <tt:Encoding>{enc}</tt:Encoding>
          <tt:Resolution><tt:Width>{w}</tt:Width><tt:Height>{h}</tt:Height></tt:Resolution>
          <tt:Quality>4</tt:Quality>
          <tt:RateControl>
            <tt:FrameRateLimit>30</tt:FrameRateLimit>
            <tt:EncodingInterval>1</tt:EncodingInterval>
            <tt:BitrateLimit>4096</tt:BitrateLimit>
          </tt:RateControl>
        </tt:VideoEncoderConfiguration>{ptz}
      </trt:Profiles>"#,
        w = p.width,
        h = p.height,
        enc = p.encoding,
    )
}

pub fn profiles(entries: &str) -> String {
    format!(
        "<trt:GetProfilesResponse>\n      {}\n    </trt:GetProfilesResponse>",
        entries
    )
}

/// `trt:GetStreamUriResponse` / `trt:GetSnapshotUriResponse`.
pub fn media_uri(response: &str, uri: &str) -> String {
    format!(
        r#"<trt:{response}>
      <trt:MediaUri>
        <tt:Uri>{}</tt:Uri>
        <tt:InvalidAfterConnect>false</tt:InvalidAfterConnect>
        <tt:InvalidAfterReboot>false</tt:InvalidAfterReboot>
        <tt:Timeout>PT1H</tt:Timeout>
      </trt:MediaUri>
    </trt:{response}>"#,
        xml_escape(uri)
    )
}

// ---------------------------------------------------------------------------
// PTZ service
// ---------------------------------------------------------------------------

const POSITION_SPACE: &str = "http://www.onvif.org/ver10/tptz/PanTiltSpaces/PositionGenericSpace";
const TRANSLATION_SPACE: &str =
    "http://www.onvif.org/ver10/tptz/PanTiltSpaces/TranslationGenericSpace";
const VELOCITY_SPACE: &str = "http://www.onvif.org/ver10/tptz/PanTiltSpaces/VelocityGenericSpace";
const SPEED_SPACE: &str = "http://www.onvif.org/ver10/tptz/PanTiltSpaces/GenericSpeedSpace";

fn space_2d(tag: &str, uri: &str) -> String {
    format!(
        r#"<tt:{tag}>
            <tt:URI>{uri}</tt:URI>
            <tt:XRange><tt:Min>-1</tt:Min><tt:Max>1</tt:Max></tt:XRange>
            <tt:YRange><tt:Min>-1</tt:Min><tt:Max>1</tt:Max></tt:YRange>
          </tt:{tag}>"#
    )
}

pub fn nodes() -> String {
    format!(
        r#"<tptz:GetNodesResponse>
      <tptz:PTZNode token="PTZNode_1">
        <tt:Name>PTZ Node 1</tt:Name>
        <tt:SupportedPTZSpaces>
          {}
          {}
          {}
          <tt:PanTiltSpeedSpace>
            <tt:URI>{SPEED_SPACE}</tt:URI>
            <tt:XRange><tt:Min>0</tt:Min><tt:Max>1</tt:Max></tt:XRange>
          </tt:PanTiltSpeedSpace>
        </tt:SupportedPTZSpaces>
        <tt:MaximumNumberOfPresets>0</tt:MaximumNumberOfPresets>
        <tt:HomeSupported>true</tt:HomeSupported>
        <tt:FixedHomePosition>true</tt:FixedHomePosition>
      </tptz:PTZNode>
    </tptz:GetNodesResponse>"#,
        space_2d("AbsolutePanTiltPositionSpace", POSITION_SPACE),
        space_2d("RelativePanTiltTranslationSpace", TRANSLATION_SPACE),
        space_2d("ContinuousPanTiltVelocitySpace", VELOCITY_SPACE),
    )
}

pub fn configurations() -> String {
    format!(
        r#"<tptz:GetConfigurationsResponse>
      <tptz:PTZConfiguration token="PTZConfig_1">
        <tt:Name>PTZ Configuration 1</tt:Name>
        <tt:NodeToken>PTZNode_1</tt:NodeToken>
        <tt:DefaultPTZSpeed>
          <tt:PanTilt space="{VELOCITY_SPACE}" x="0.5" y="0.5"/>
        </tt:DefaultPTZSpeed>
        <tt:DefaultPTZTimeout>PT10S</tt:DefaultPTZTimeout>
        <tt:PanTiltLimits>
          {}
        </tt:PanTiltLimits>
      </tptz:PTZConfiguration>
    </tptz:GetConfigurationsResponse>"#,
        space_2d("Range", POSITION_SPACE)
    )
}

/// `(token, name)` pairs in configuration order.
pub fn presets(entries: &[(String, String)]) -> String {
    let mut items = String::new();
    for (token, name) in entries {
        items.push_str(&format!(
            r#"
      <tptz:Preset token="{}"><tt:Name>{}</tt:Name></tptz:Preset>"#,
            xml_escape(token),
            xml_escape(name)
        ));
    }
    format!(
        "<tptz:GetPresetsResponse>{}\n    </tptz:GetPresetsResponse>",
        items
    )
}

// ---------------------------------------------------------------------------
// Imaging service
// ---------------------------------------------------------------------------

/// The camera cannot report its settings, so midpoints are returned.
pub fn imaging_settings() -> &'static str {
    r#"<timg:GetImagingSettingsResponse>
      <timg:ImagingSettings>
        <tt:Brightness>0.5</tt:Brightness>
        <tt:ColorSaturation>0.5</tt:ColorSaturation>
        <tt:Contrast>0.5</tt:Contrast>
        <tt:Sharpness>0.5</tt:Sharpness>
        <tt:IrCutFilter>AUTO</tt:IrCutFilter>
        <tt:Exposure><tt:Mode>AUTO</tt:Mode></tt:Exposure>
      </timg:ImagingSettings>
    </timg:GetImagingSettingsResponse>"#
}

pub fn imaging_options() -> &'static str {
    r#"<timg:GetOptionsResponse>
      <timg:ImagingOptions>
        <tt:Brightness><tt:Min>0</tt:Min><tt:Max>1</tt:Max></tt:Brightness>
        <tt:ColorSaturation><tt:Min>0</tt:Min><tt:Max>1</tt:Max></tt:ColorSaturation>
        <tt:Contrast><tt:Min>0</tt:Min><tt:Max>1</tt:Max></tt:Contrast>
        <tt:Sharpness><tt:Min>0</tt:Min><tt:Max>1</tt:Max></tt:Sharpness>
        <tt:IrCutFilterModes>ON</tt:IrCutFilterModes>
        <tt:IrCutFilterModes>OFF</tt:IrCutFilterModes>
        <tt:IrCutFilterModes>AUTO</tt:IrCutFilterModes>
        <tt:Exposure>
          <tt:Mode>AUTO</tt:Mode>
          <tt:Mode>MANUAL</tt:Mode>
          <tt:Priority>LowNoise</tt:Priority>
          <tt:Priority>FrameRate</tt:Priority>
          <tt:MinExposureTime><tt:Min>1</tt:Min><tt:Max>10000</tt:Max></tt:MinExposureTime>
          <tt:MaxExposureTime><tt:Min>1</tt:Min><tt:Max>10000</tt:Max></tt:MaxExposureTime>
        </tt:Exposure>
      </timg:ImagingOptions>
    </timg:GetOptionsResponse>"#
}
