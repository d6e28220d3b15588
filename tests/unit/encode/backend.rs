use super::*;

fn cfg() -> EncoderConfig {
    EncoderConfig::from_settings(&RenderSettings::new(4, 4).with_fps(10), "out.mp4")
}

#[test]
fn config_validation_catches_bad_values() {
    assert!(cfg().validate().is_ok());

    let mut c = cfg();
    c.width = 0;
    assert!(c.validate().is_err());

    let mut c = cfg();
    c.fps = 0;
    assert!(c.validate().is_err());

    let mut c = cfg();
    c.bitrate = 0;
    assert!(c.validate().is_err());

    assert!(cfg().with_queue_depth(0).validate().is_err());
}

#[test]
fn from_settings_copies_fields() {
    let c = cfg();
    assert_eq!(c.size(), Canvas::new(4, 4).unwrap());
    assert_eq!(c.fps, 10);
    assert_eq!(c.codec, VideoCodec::H264);
    assert_eq!(c.bitrate, 12_000_000);
    assert_eq!(c.queue_depth, DEFAULT_QUEUE_DEPTH);
}

#[test]
fn in_memory_records_frames_in_order() {
    let mut backend = InMemoryBackend::new();
    let observer = backend.clone();
    let frame = PixelBuffer::allocate(Canvas::new(4, 4).unwrap()).unwrap();

    backend.begin(&cfg()).unwrap();
    backend
        .write_frame(&frame, MediaTime::new(0, 1000).unwrap())
        .unwrap();
    backend
        .write_frame(&frame, MediaTime::new(100, 1000).unwrap())
        .unwrap();
    backend.end().unwrap();

    assert_eq!(observer.config(), Some(cfg()));
    assert_eq!(
        observer.timestamps(),
        vec![
            MediaTime::new(0, 1000).unwrap(),
            MediaTime::new(100, 1000).unwrap()
        ]
    );
    assert!(observer.is_ended());
}

#[test]
fn in_memory_rejects_out_of_order_and_unstarted_writes() {
    let mut backend = InMemoryBackend::new();
    let frame = PixelBuffer::allocate(Canvas::new(4, 4).unwrap()).unwrap();
    assert!(backend.write_frame(&frame, MediaTime::ZERO).is_err());

    backend.begin(&cfg()).unwrap();
    backend
        .write_frame(&frame, MediaTime::new(100, 1000).unwrap())
        .unwrap();
    assert!(
        backend
            .write_frame(&frame, MediaTime::new(100, 1000).unwrap())
            .is_err()
    );
}

#[test]
fn gated_backend_waits_for_tokens() {
    let (mut backend, gate) = InMemoryBackend::gated();
    let observer = backend.clone();
    backend.begin(&cfg()).unwrap();
    let frame = PixelBuffer::allocate(Canvas::new(4, 4).unwrap()).unwrap();

    let writer = std::thread::spawn(move || {
        backend.write_frame(&frame, MediaTime::ZERO).unwrap();
    });

    while !observer.is_waiting_at_gate() {
        std::thread::yield_now();
    }
    assert!(observer.frames().is_empty());

    gate.send(()).unwrap();
    writer.join().unwrap();
    assert_eq!(observer.frames().len(), 1);
    assert!(!observer.is_waiting_at_gate());
}

#[test]
fn in_memory_abort_does_not_mark_ended() {
    let mut backend = InMemoryBackend::new();
    let frame = PixelBuffer::allocate(Canvas::new(4, 4).unwrap()).unwrap();
    backend.begin(&cfg()).unwrap();
    backend.write_frame(&frame, MediaTime::ZERO).unwrap();
    backend.abort();

    assert!(backend.is_aborted());
    assert!(!backend.is_ended());
}
