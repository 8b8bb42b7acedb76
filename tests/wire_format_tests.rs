//! End-to-end checks of the media frame path: a telephony media envelope in,
//! an AI audio payload out, and back again.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use outdial::audio::{
    pcm_bytes_to_samples, samples_to_pcm_bytes, telephony_to_wideband, wideband_to_telephony,
};
use outdial::bridge::messages::{AiClientMessage, OutboundMedia, TelephonyMessage};

/// A 20ms telephony frame: 160 mu-law bytes at 8kHz.
fn silence_frame() -> Vec<u8> {
    vec![0xFF; 160]
}

#[test]
fn inbound_media_frame_becomes_wideband_ai_payload() {
    let payload = BASE64.encode(silence_frame());
    let json = format!(r#"{{"event": "media", "media": {{"payload": "{}"}}}}"#, payload);

    let msg: TelephonyMessage = serde_json::from_str(&json).unwrap();
    let TelephonyMessage::Media { media } = msg else {
        panic!("expected media event");
    };

    let mulaw = BASE64.decode(media.payload).unwrap();
    let wideband = telephony_to_wideband(&mulaw);
    // 20ms at 16kHz is 320 samples
    assert_eq!(wideband.len(), 320);
    assert!(wideband.iter().all(|&s| s.abs() <= 64));

    let ai_payload = BASE64.encode(samples_to_pcm_bytes(&wideband));
    let out = serde_json::to_string(&AiClientMessage::Audio { audio: ai_payload }).unwrap();
    assert!(out.starts_with(r#"{"type":"audio""#));
}

#[test]
fn outbound_ai_audio_becomes_telephony_media_frame() {
    // 20ms of a quiet wideband ramp from the AI peer
    let wideband: Vec<i16> = (0..320).map(|i| (i as i16 - 160) * 8).collect();
    let ai_audio = BASE64.encode(samples_to_pcm_bytes(&wideband));

    let pcm = pcm_bytes_to_samples(&BASE64.decode(ai_audio).unwrap());
    let mulaw = wideband_to_telephony(&pcm);
    // Downsampled back to a 160-byte telephony frame
    assert_eq!(mulaw.len(), 160);

    let envelope = OutboundMedia::new("MZ123", BASE64.encode(&mulaw));
    let json = serde_json::to_string(&envelope).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["event"], "media");
    assert_eq!(value["streamSid"], "MZ123");
    assert!(value["media"]["payload"].is_string());
}

#[test]
fn frame_survives_a_full_relay_cycle() {
    // Telephony -> AI -> telephony, as the bridge relays it
    let original = silence_frame();
    let wideband = telephony_to_wideband(&original);
    let bytes = samples_to_pcm_bytes(&wideband);
    let back = wideband_to_telephony(&pcm_bytes_to_samples(&bytes));

    assert_eq!(back.len(), original.len());
    let decoded = telephony_to_wideband(&back);
    assert!(decoded.iter().all(|&s| s.abs() <= 128));
}
