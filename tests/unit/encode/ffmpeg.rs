use super::*;
use crate::foundation::core::{Canvas, FrameIndex};
use crate::render::backend::FrameRGBA;
use std::ffi::OsStr;

fn args_of(cmd: &Command) -> Vec<String> {
    cmd.get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn command_uses_image_sequence_and_x264_settings() {
    let enc = FfmpegEncoder::default();
    let cmd = enc.command(
        Path::new("/tmp/s/frame_%06d.jpg"),
        Fps::new(30, 1).unwrap(),
        Path::new("out/battle_recap_1_phantom.mp4"),
    );
    assert_eq!(cmd.get_program(), OsStr::new("ffmpeg"));
    let args = args_of(&cmd);
    assert_eq!(args[0], "-y");

    let joined = args.join(" ");
    assert!(joined.contains("-framerate 30/1 -i /tmp/s/frame_%06d.jpg"));
    assert!(joined.contains("-c:v libx264 -preset fast -crf 23 -pix_fmt yuv420p -movflags +faststart"));
    assert_eq!(args.last().unwrap(), "out/battle_recap_1_phantom.mp4");
}

#[test]
fn command_honours_overwrite_and_rational_fps() {
    let enc = FfmpegEncoder::new(EncodeOpts {
        overwrite: false,
        preset: "veryslow".to_owned(),
        crf: 18,
        ..EncodeOpts::default()
    })
    .unwrap();
    let args = args_of(&enc.command(
        Path::new("in_%06d.jpg"),
        Fps::new(30000, 1001).unwrap(),
        Path::new("o.mp4"),
    ));
    assert_eq!(args[0], "-n");
    let joined = args.join(" ");
    assert!(joined.contains("-framerate 30000/1001"));
    assert!(joined.contains("-preset veryslow -crf 18"));
}

#[test]
fn opts_validation() {
    assert!(EncodeOpts::default().validate().is_ok());
    for bad in [
        EncodeOpts {
            crf: 52,
            ..EncodeOpts::default()
        },
        EncodeOpts {
            jpeg_quality: 0,
            ..EncodeOpts::default()
        },
        EncodeOpts {
            preset: " ".to_owned(),
            ..EncodeOpts::default()
        },
    ] {
        assert!(matches!(bad.validate(), Err(RecapError::Validation(_))));
    }
}

#[test]
fn partial_json_overrides_only_named_fields() {
    let opts: EncodeOpts = serde_json::from_str(r#"{"crf": 30}"#).unwrap();
    assert_eq!(opts.crf, 30);
    assert_eq!(opts.preset, "fast");
    assert_eq!(opts.jpeg_quality, 85);
}

#[test]
fn stderr_tail_keeps_last_chars() {
    assert_eq!(stderr_tail("short", 500), "short");
    let long = format!("{}{}", "x".repeat(600), "é".repeat(10));
    let tail = stderr_tail(&long, 500);
    assert_eq!(tail.chars().count(), 500);
    assert!(tail.ends_with("éééééééééé"));
}

#[test]
fn odd_canvas_is_rejected_before_spawning() {
    let canvas = Canvas {
        width: 7,
        height: 6,
    };
    let mut store = FrameStore::new(canvas, &EncodeOpts::default()).unwrap();
    store
        .push(
            FrameIndex(0),
            &FrameRGBA {
                width: 7,
                height: 6,
                data: vec![255; 7 * 6 * 4],
                premultiplied: true,
            },
        )
        .unwrap();
    let out = store.dir().join("never.mp4");
    let err = FfmpegEncoder::default()
        .encode(&store, Fps::default(), &out)
        .unwrap_err();
    assert!(matches!(err, RecapError::Validation(_)));
    assert!(!out.exists());
}

#[test]
fn empty_store_is_an_encode_error() {
    let canvas = Canvas {
        width: 8,
        height: 8,
    };
    let store = FrameStore::new(canvas, &EncodeOpts::default()).unwrap();
    let err = FfmpegEncoder::default()
        .encode(&store, Fps::default(), &store.dir().join("o.mp4"))
        .unwrap_err();
    assert!(matches!(err, RecapError::Encode(_)));
}

#[test]
fn encodes_mp4_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let canvas = Canvas {
        width: 16,
        height: 16,
    };
    let mut store = FrameStore::new(canvas, &EncodeOpts::default()).unwrap();
    for i in 0..4u8 {
        store
            .push(
                FrameIndex(u64::from(i)),
                &FrameRGBA {
                    width: 16,
                    height: 16,
                    data: [i * 60, 0, 0, 255].repeat(256),
                    premultiplied: true,
                },
            )
            .unwrap();
    }
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("nested").join("clip.mp4");
    FfmpegEncoder::default()
        .encode(&store, Fps::default(), &out)
        .unwrap();
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}
