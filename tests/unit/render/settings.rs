use super::*;

#[test]
fn defaults_match_documented_values() {
    let s = RenderSettings::default();
    assert_eq!(s.fps, 60);
    assert_eq!(s.codec, VideoCodec::H264);
    assert_eq!(s.video_filename, "ImageToVideo");
    assert_eq!(s.video_filename_ext, "mp4");
    assert_eq!(s.bitrate, 12_000_000);
    assert!(s.cache_dir.is_none());
}

#[test]
fn validate_catches_bad_values() {
    assert!(RenderSettings::new(0, 10).validate().is_err());
    assert!(RenderSettings::new(10, 10).with_fps(0).validate().is_err());
    assert!(RenderSettings::new(10, 10).with_fps(1001).validate().is_err());

    let mut s = RenderSettings::new(10, 10);
    s.bitrate = 0;
    assert!(s.validate().is_err());

    let s = RenderSettings::new(10, 10).with_filename("", "mp4");
    assert!(s.validate().is_err());

    assert!(RenderSettings::new(10, 10).validate().is_ok());
}

#[test]
fn output_path_joins_stem_and_extension_under_cache_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("renders");
    let s = RenderSettings::new(4, 4)
        .with_cache_dir(&nested)
        .with_filename("clip", "mp4");

    let path = s.output_path().unwrap();
    assert_eq!(path, nested.join("clip.mp4"));
    assert!(nested.is_dir());
}

#[test]
fn output_path_fails_when_cache_dir_is_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not_a_dir");
    std::fs::write(&file, b"x").unwrap();

    let err = RenderSettings::new(4, 4)
        .with_cache_dir(&file)
        .output_path()
        .unwrap_err();
    assert!(matches!(err, StillreelError::PathResolution(_)));
}

#[test]
fn with_size_of_rounds_down_to_even() {
    let img = DecodedImage {
        width: 101,
        height: 75,
        rgba8_premul: std::sync::Arc::new(vec![0u8; 101 * 75 * 4]),
    };
    let s = RenderSettings::default().with_size_of(&img);
    assert_eq!((s.width, s.height), (100, 74));
}

#[test]
fn deserialize_fills_missing_fields_with_defaults() {
    let s: RenderSettings =
        serde_json::from_str(r#"{ "width": 320, "height": 240, "codec": "hevc" }"#).unwrap();
    assert_eq!(s.size(), Canvas::new(320, 240).unwrap());
    assert_eq!(s.codec, VideoCodec::Hevc);
    assert_eq!(s.fps, 60);
    assert_eq!(s.video_filename_ext, "mp4");
}
