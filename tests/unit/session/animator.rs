use std::cell::Cell;
use std::sync::Arc;

use super::*;
use crate::assets::decode::DecodedImage;
use crate::encode::backend::InMemoryBackend;
use crate::foundation::core::Canvas;
use crate::foundation::error::StillreelError;

/// Decodes "WxH.png" to a transparent image of that size; anything else fails.
struct SizeDecoder;

impl ImageDecoder for SizeDecoder {
    fn decode(&self, path: &Path) -> StillreelResult<DecodedImage> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let parsed = stem
            .split_once('x')
            .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
        let Some((width, height)) = parsed else {
            return Err(StillreelError::decode(format!("'{stem}' is not WxH")));
        };
        Ok(DecodedImage {
            width,
            height,
            rgba8_premul: Arc::new(vec![0; (width * height * 4) as usize]),
        })
    }
}

fn animator(dir: &Path, images: &[&str], backend: &InMemoryBackend) -> ImageAnimator {
    let settings = RenderSettings::new(8, 6)
        .with_fps(25)
        .with_cache_dir(dir)
        .with_filename("clip", "mp4");
    ImageAnimator::new(settings, images.iter().map(PathBuf::from))
        .with_decoder(SizeDecoder)
        .with_backend(backend.clone())
}

#[test]
fn output_is_sized_to_first_image_rounded_to_even() {
    let dir = tempfile::tempdir().unwrap();
    let backend = InMemoryBackend::new();
    let out = animator(dir.path(), &["33x21.png", "10x10.png"], &backend)
        .render(|_| {})
        .unwrap()
        .wait()
        .unwrap();

    let cfg = backend.config().unwrap();
    assert_eq!(cfg.size(), Canvas::new(32, 20).unwrap());
    assert_eq!(out.frames_written, 2);
    assert_eq!(out.duration, MediaTime::new(80, 1000).unwrap());
    assert_eq!(out.path, dir.path().join("clip.mp4"));
}

#[test]
fn undecodable_first_image_keeps_configured_size() {
    let dir = tempfile::tempdir().unwrap();
    let backend = InMemoryBackend::new();
    let out = animator(dir.path(), &["broken.png", "4x4.png"], &backend)
        .render(|_| {})
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(backend.config().unwrap().size(), Canvas::new(8, 6).unwrap());
    assert_eq!(out.frames_written, 1);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].path, PathBuf::from("broken.png"));
}

#[test]
fn stale_output_is_removed_before_start() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clip.mp4"), b"previous run").unwrap();

    let backend = InMemoryBackend::new();
    let job = animator(dir.path(), &["4x4.png"], &backend)
        .render(|_| {})
        .unwrap();
    assert_eq!(job.output_path(), dir.path().join("clip.mp4"));
    assert!(!job.output_path().exists());
    assert_eq!(job.wait().unwrap().frames_written, 1);
}

#[test]
fn completion_runs_once_on_waiting_thread() {
    let dir = tempfile::tempdir().unwrap();
    let backend = InMemoryBackend::new();
    let calls = Cell::new(0);
    let seen = Cell::new(0u64);
    let waiter = std::thread::current().id();

    let out = animator(dir.path(), &["4x4.png", "4x4.png", "4x4.png"], &backend)
        .render(|out: &RenderOutput| {
            assert_eq!(std::thread::current().id(), waiter);
            calls.set(calls.get() + 1);
            seen.set(out.frames_written);
        })
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(seen.get(), 3);
    assert_eq!(out.frames_written, 3);
}

#[test]
fn abort_policy_skips_completion_and_discards_output() {
    let dir = tempfile::tempdir().unwrap();
    let backend = InMemoryBackend::new();
    let called = Cell::new(false);

    let res = animator(
        dir.path(),
        &["4x4.png", "4x4.png", "nope.png", "4x4.png"],
        &backend,
    )
    .with_decode_failure_policy(DecodeFailurePolicy::Abort)
    .with_queue_depth(1)
    .render(|_| called.set(true))
    .unwrap()
    .wait();

    assert!(matches!(res, Err(StillreelError::Decode(_))));
    assert!(!called.get());
    assert!(backend.is_aborted());
    assert!(!backend.is_ended());
}

#[test]
fn invalid_settings_fail_before_starting() {
    let dir = tempfile::tempdir().unwrap();
    let backend = InMemoryBackend::new();
    let res = animator(dir.path(), &[], &backend)
        .with_queue_depth(0)
        .render(|_| {});
    assert!(matches!(res, Err(StillreelError::Validation(_))));
    assert!(backend.config().is_none());
}
