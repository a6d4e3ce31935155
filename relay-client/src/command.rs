//! Transcoder command lines for on-demand relay paths.

use config_manager::{CameraConfig, StreamConfig};

/// SRT ingest used for HEVC, which cannot be republished over RTSP with PCM audio.
const SRT_PUBLISH_URL: &str = "srt://localhost:8890?streamid=publish:$MTX_PATH&pkt_size=1316";

/// Camera RTSP URL without credentials.
pub fn source_url(camera: &CameraConfig, stream: &StreamConfig) -> String {
    format!("rtsp://{}:{}/{}", camera.host, camera.rtsp_port, stream.path)
}

/// Build the `ffmpeg` command the relay runs when a client opens the path.
///
/// Camera credentials are passed as options rather than embedded in the URL.
/// `$MTX_PATH` is expanded by the relay.
pub fn build_transcode_command(
    camera: &CameraConfig,
    stream: &StreamConfig,
    relay_rtsp_port: u16,
) -> String {
    let mut cmd = String::from("ffmpeg -fflags +genpts -rtsp_transport tcp");
    if let Some((user, pass)) = camera.credentials() {
        cmd.push_str(&format!(" -rtsp_user {} -rtsp_password {}", user, pass));
    }
    cmd.push_str(&format!(
        " -i {} -map 0:v:0 -map 0:a:0? -c:v copy",
        source_url(camera, stream)
    ));

    let volume = camera.audio_volume;
    let mut audio_codec = camera.audio_transcode.as_str();

    if stream.is_h265() {
        // MPEG-TS cannot carry G.711
        if audio_codec == "pcm_mulaw" || audio_codec == "pcm_alaw" {
            audio_codec = "aac";
        }
        cmd.push_str(&format!(
            " -c:a {} -ar 48000 -ac 1 -async 1 -af volume={:.1}",
            audio_codec, volume
        ));
        cmd.push_str(&format!(" -f mpegts \"{}\"", SRT_PUBLISH_URL));
    } else {
        let sample_rate = if audio_codec == "aac" { 48000 } else { 8000 };
        cmd.push_str(&format!(
            " -c:a {} -ar {} -ac 1 -async 1 -af volume={:.1}",
            audio_codec, sample_rate, volume
        ));
        cmd.push_str(&format!(
            " -rtsp_transport tcp -f rtsp rtsp://localhost:{}/$MTX_PATH",
            relay_rtsp_port
        ));
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(extra: &str, codec: &str) -> CameraConfig {
        toml::from_str(&format!(
            r#"
name = "cam"
host = "192.168.1.10"
rtsp_port = 8554
http_port = 80
{}
[[streams]]
path = "video0_unicast"
resolution = "1920x1080"
codec = "{}"
profile_name = "cam_hd"
"#,
            extra, codec
        ))
        .unwrap()
    }

    #[test]
    fn test_h264_defaults() {
        let cam = camera("", "h264");
        let cmd = build_transcode_command(&cam, &cam.streams[0], 8554);
        assert_eq!(
            cmd,
            "ffmpeg -fflags +genpts -rtsp_transport tcp \
             -i rtsp://192.168.1.10:8554/video0_unicast -map 0:v:0 -map 0:a:0? -c:v copy \
             -c:a pcm_mulaw -ar 8000 -ac 1 -async 1 -af volume=1.0 \
             -rtsp_transport tcp -f rtsp rtsp://localhost:8554/$MTX_PATH"
        );
    }

    #[test]
    fn test_h264_aac_with_credentials() {
        let cam = camera(
            "username = \"u\"\npassword = \"p\"\naudio_transcode = \"aac\"\naudio_volume = 2.25",
            "h264",
        );
        let cmd = build_transcode_command(&cam, &cam.streams[0], 9554);
        assert!(cmd.contains(" -rtsp_user u -rtsp_password p -i rtsp://192.168.1.10:8554/"));
        assert!(cmd.contains("-c:a aac -ar 48000"));
        assert!(cmd.contains("volume=2.2") || cmd.contains("volume=2.3"));
        assert!(cmd.ends_with("rtsp://localhost:9554/$MTX_PATH"));
    }

    #[test]
    fn test_hevc_uses_srt_and_aac() {
        let cam = camera("audio_transcode = \"pcm_alaw\"", "hevc");
        let cmd = build_transcode_command(&cam, &cam.streams[0], 8554);
        assert!(cmd.contains("-c:a aac -ar 48000 -ac 1 -async 1 -af volume=1.0"));
        assert!(cmd.ends_with(
            "-f mpegts \"srt://localhost:8890?streamid=publish:$MTX_PATH&pkt_size=1316\""
        ));
        assert!(!cmd.contains("-rtsp_user"));
    }
}
