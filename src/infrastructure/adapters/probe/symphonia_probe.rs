//! Symphonia Audio Probe - 基于 symphonia 的时长探测
//!
//! 优先读取容器声明的帧数；缺失时（如无 Xing 头的 MP3）遍历数据包累加时长，不解码

use std::io::Cursor;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioInfo, AudioProbePort, ProbeError};

/// 基于 symphonia 实现的音频探测器
pub struct SymphoniaProbe;

impl SymphoniaProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SymphoniaProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// 由 MIME 类型推断扩展名提示
fn extension_for(mime_type: &str) -> Option<&'static str> {
    match mime_type.split(';').next().unwrap_or(mime_type).trim() {
        "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" | "audio/mpeg3" | "audio/x-mpeg-3" => Some("mp3"),
        _ => None,
    }
}

impl AudioProbePort for SymphoniaProbe {
    fn probe(&self, data: &[u8], mime_type: Option<&str>) -> Result<AudioInfo, ProbeError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        if let Some(mime_type) = mime_type {
            hint.mime_type(mime_type);
            if let Some(ext) = extension_for(mime_type) {
                hint.with_extension(ext);
            }
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ProbeError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;
        let track = format.default_track().ok_or(ProbeError::NoTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params.sample_rate.ok_or(ProbeError::UnknownDuration)?;
        let channels = params.channels.map(|c| c.count() as u8);

        let frames = match params.n_frames {
            Some(n) => n,
            None => {
                let mut total = 0u64;
                while let Ok(packet) = format.next_packet() {
                    if packet.track_id() == track_id {
                        total += packet.dur;
                    }
                }
                total
            }
        };
        if frames == 0 {
            return Err(ProbeError::UnknownDuration);
        }

        let duration_secs = match params.time_base {
            Some(tb) => {
                let time = tb.calc_time(frames);
                time.seconds as f64 + time.frac
            }
            None => frames as f64 / sample_rate as f64,
        };

        tracing::debug!(
            duration_secs = duration_secs,
            sample_rate = sample_rate,
            channels = ?channels,
            "Audio probed"
        );

        Ok(AudioInfo {
            duration_secs,
            sample_rate,
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::silent_wav;

    #[test]
    fn test_probe_wav_duration() {
        let probe = SymphoniaProbe::new();
        let wav = silent_wav(16_000, 2500);

        let info = probe.probe(&wav, Some("audio/wav")).unwrap();
        assert!((info.duration_secs - 2.5).abs() < 0.01);
        assert_eq!(info.sample_rate, 16_000);
        assert_eq!(info.channels, Some(1));
    }

    #[test]
    fn test_probe_without_hint() {
        let info = SymphoniaProbe::new()
            .probe(&silent_wav(8_000, 1000), None)
            .unwrap();
        assert!((info.duration_secs - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_probe_garbage_rejected() {
        let result = SymphoniaProbe::new().probe(b"definitely not audio", Some("audio/mpeg"));
        assert!(result.is_err());
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for("audio/mp3"), Some("mp3"));
        assert_eq!(extension_for("audio/wav; codecs=1"), Some("wav"));
        assert_eq!(extension_for("audio/ogg"), None);
    }
}
