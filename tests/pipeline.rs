//! End-to-end overlay runs over in-memory video.
//!
//! Each run's output is compared with the renderer applied directly to the
//! pristine frame and the sample that frame should be matched with.

use telemetry_overlay::{
    Frame, FrameRate, MemorySink, MemorySource, OverlayError, OverlayPipeline, OverlayRenderer,
    PipelineConfig, PipelineState, Sample, TelemetryStore, VideoInfo,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

fn sample(timestamp_ms: f64, speed: f64) -> Sample {
    Sample {
        timestamp_ms,
        speed,
        rpm: speed * 70.0,
        boost: speed / 10.0,
        g_force: 0.5,
        ..Default::default()
    }
}

fn three_sample_store() -> TelemetryStore {
    TelemetryStore::new(vec![
        sample(0.0, 40.0),
        sample(1000.0, 80.0),
        sample(2000.0, 120.0),
    ])
    .unwrap()
}

fn one_fps() -> VideoInfo {
    VideoInfo::new(WIDTH, HEIGHT, FrameRate::new(1, 1))
}

/// Distinct, deterministic frame contents
fn pristine_frames(count: u8) -> Vec<Frame> {
    (0..count)
        .map(|i| Frame::filled(WIDTH, HEIGHT, [i * 20, 100, 200 - i * 10]))
        .collect()
}

fn expected(frame: &Frame, sample: &Sample) -> Frame {
    let mut out = frame.clone();
    OverlayRenderer::default().render(&mut out, sample).unwrap();
    out
}

#[tokio::test]
async fn frames_map_to_samples_in_order() {
    let store = three_sample_store();
    let samples = store.samples().to_vec();
    let frames = pristine_frames(3);

    let mut source = MemorySource::new(one_fps(), frames.clone());
    let mut sink = MemorySink::new();
    let mut pipeline = OverlayPipeline::new(store, PipelineConfig::default()).unwrap();

    let report = pipeline.run(&mut source, &mut sink).await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(report.frames_written, 3);
    assert_eq!(report.first_timestamp_ms, Some(0.0));
    assert_eq!(report.last_timestamp_ms, Some(2000.0));
    assert!(sink.is_finished());
    assert!(source.is_closed());

    let written = sink.into_frames();
    for (i, out) in written.iter().enumerate() {
        assert_eq!(*out, expected(&frames[i], &samples[i]), "frame {i}");
    }
}

#[tokio::test]
async fn offset_query_on_a_tie_uses_earlier_sample() {
    let store = three_sample_store();
    let samples = store.samples().to_vec();
    let frames = pristine_frames(3);

    let mut source = MemorySource::new(one_fps(), frames.clone());
    let mut sink = MemorySink::new();
    let config = PipelineConfig::default().with_sync_offset(500);
    let mut pipeline = OverlayPipeline::new(store, config).unwrap();

    let report = pipeline.run(&mut source, &mut sink).await.unwrap();
    assert_eq!(report.first_timestamp_ms, Some(500.0));

    let written = sink.into_frames();
    // 500 -> 0, 1500 -> 1000, 2500 -> 2000 (past the end, clamped)
    assert_eq!(written[0], expected(&frames[0], &samples[0]));
    assert_eq!(written[1], expected(&frames[1], &samples[1]));
    assert_eq!(written[2], expected(&frames[2], &samples[2]));
    assert_ne!(written[0], expected(&frames[0], &samples[1]));
}

#[tokio::test]
async fn read_failure_keeps_frames_already_written() {
    let store = three_sample_store();
    let mut source = MemorySource::new(one_fps(), pristine_frames(10)).failing_at(5);
    let mut sink = MemorySink::new();
    let mut pipeline = OverlayPipeline::new(store, PipelineConfig::default()).unwrap();

    let err = pipeline.run(&mut source, &mut sink).await.unwrap_err();

    assert!(matches!(err, OverlayError::ReadError { frame_index: 5, .. }));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(sink.frames().len(), 5);
    assert!(sink.is_aborted());
    assert!(!sink.is_finished());
    assert!(source.is_closed());
}

#[test]
fn empty_store_is_rejected_up_front() {
    let result = OverlayPipeline::new(TelemetryStore::default(), PipelineConfig::default());
    assert!(matches!(result, Err(OverlayError::EmptyStore)));
}

#[tokio::test]
async fn ntsc_rate_uses_exact_frame_times() {
    let store = TelemetryStore::new(vec![sample(0.0, 10.0), sample(1001.0, 20.0)]).unwrap();
    let info = VideoInfo::new(WIDTH, HEIGHT, FrameRate::new(30000, 1001));
    let mut source = MemorySource::solid(info, 31, [0, 0, 0]);
    let mut sink = MemorySink::new();
    let mut pipeline = OverlayPipeline::new(store, PipelineConfig::default()).unwrap();

    let report = pipeline.run(&mut source, &mut sink).await.unwrap();

    assert_eq!(report.frames_written, 31);
    // Frame 30 lands exactly on 1001 ms
    let last = report.last_timestamp_ms.unwrap();
    assert!((last - 1001.0).abs() < 1e-9, "{last}");
}
