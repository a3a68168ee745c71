//! Monitor loop integration tests
//!
//! The loop runs against scripted sample sources, a counting alarm, a
//! collecting sink, and a virtual clock, so every timing property is
//! deterministic: no real audio hardware and no wall-clock sleeps in the
//! loop itself.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use soundsentry_alarm::AlarmTrigger;
use soundsentry_audio::SampleSource;
use soundsentry_foundation::clock::TestClock;
use soundsentry_foundation::{
    AppError, AudioError, DiagnosticSink, MonitorError, MonitorState, SharedClock,
};
use soundsentry_level::{LevelEstimator, MonitorConfig};
use soundsentry_monitor::MonitorHandle;

const CHUNK: usize = 1024;

/// Amplitude whose constant buffer estimates to roughly `db`.
fn buffer_for_db(db: f32) -> Vec<i16> {
    let amp = (32767.0 * 10f64.powf((db as f64 - 96.0) / 20.0)).round() as i16;
    vec![amp; CHUNK]
}

struct ScriptedSource {
    steps: VecDeque<Result<Vec<i16>, AudioError>>,
    reads: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(
        steps: Vec<Result<Vec<i16>, AudioError>>,
        reads: &Arc<AtomicUsize>,
        closed: &Arc<AtomicUsize>,
    ) -> Self {
        Self {
            steps: steps.into(),
            reads: Arc::clone(reads),
            closed: Arc::clone(closed),
        }
    }
}

impl SampleSource for ScriptedSource {
    fn read_chunk(&mut self) -> Result<Vec<i16>, AudioError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.steps.pop_front().unwrap_or(Err(AudioError::NoDataTimeout {
            duration: Duration::from_secs(1),
        }))
    }

    fn chunk_size(&self) -> usize {
        CHUNK
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Source that always returns the same buffer.
struct ConstantSource {
    buffer: Vec<i16>,
}

impl SampleSource for ConstantSource {
    fn read_chunk(&mut self) -> Result<Vec<i16>, AudioError> {
        Ok(self.buffer.clone())
    }

    fn chunk_size(&self) -> usize {
        CHUNK
    }
}

#[derive(Default)]
struct CountingAlarm {
    fired: AtomicUsize,
}

impl AlarmTrigger for CountingAlarm {
    fn trigger(&self, _duration: Duration) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl DiagnosticSink for CollectingSink {
    fn line(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

fn test_config() -> MonitorConfig {
    MonitorConfig {
        threshold_db: 70.0,
        cooldown_secs: 3.0,
        chunk_size: CHUNK,
        update_interval_secs: 1.0,
        ..Default::default()
    }
}

fn wait_for(reads: &Arc<AtomicUsize>, at_least: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while reads.load(Ordering::SeqCst) < at_least {
        assert!(Instant::now() < deadline, "monitor loop made no progress");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn loud_burst_fires_exactly_one_alarm_within_cooldown() {
    // threshold 70, cooldown 3 s, readings [65, 75, 76, 50] polled at
    // t = 0, 1, 2, 3: one alarm, at t = 1
    let reads = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let steps = vec![
        Ok(buffer_for_db(65.0)),
        Ok(buffer_for_db(75.0)),
        Ok(buffer_for_db(76.0)),
        Ok(buffer_for_db(50.0)),
    ];
    let source = ScriptedSource::new(steps, &reads, &closed);

    let alarm = Arc::new(CountingAlarm::default());
    let sink = Arc::new(CollectingSink::default());
    let clock: SharedClock = Arc::new(TestClock::new());

    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::clone(&alarm) as Arc<dyn AlarmTrigger>,
        Arc::clone(&sink) as Arc<dyn DiagnosticSink>,
        clock,
    )
    .unwrap();

    wait_for(&reads, 5);
    handle.stop().unwrap();

    assert_eq!(alarm.fired.load(Ordering::SeqCst), 1);
    let lines = sink.lines.lock();
    let alarm_lines: Vec<_> = lines.iter().filter(|l| l.starts_with("ALARM")).collect();
    assert_eq!(alarm_lines.len(), 1);
    assert!(alarm_lines[0].contains("75.0 dB"));
}

#[test]
fn stop_releases_the_device_exactly_once() {
    let reads = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let steps = (0..4).map(|_| Ok(buffer_for_db(40.0))).collect();
    let source = ScriptedSource::new(steps, &reads, &closed);

    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::new(CountingAlarm::default()) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    wait_for(&reads, 2);
    assert_eq!(handle.state(), MonitorState::Running);
    handle.stop().unwrap();

    assert_eq!(closed.load(Ordering::SeqCst), 1, "device released exactly once");
    let reads_at_stop = reads.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(
        reads.load(Ordering::SeqCst),
        reads_at_stop,
        "no reads after stop"
    );
}

#[test]
fn read_failures_report_zero_and_keep_the_loop_alive() {
    let reads = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let steps = vec![
        Err(AudioError::ShortRead { got: 12, want: CHUNK }),
        Ok(buffer_for_db(75.0)),
        Err(AudioError::NoDataTimeout {
            duration: Duration::from_secs(1),
        }),
    ];
    let source = ScriptedSource::new(steps, &reads, &closed);

    let alarm = Arc::new(CountingAlarm::default());
    let sink = Arc::new(CollectingSink::default());

    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::clone(&alarm) as Arc<dyn AlarmTrigger>,
        Arc::clone(&sink) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    wait_for(&reads, 3);
    let stats = handle.stats();
    handle.stop().unwrap();

    // Errors were swallowed, the good reading between them still alarmed
    assert_eq!(alarm.fired.load(Ordering::SeqCst), 1);
    assert!(stats.read_errors.load(Ordering::SeqCst) >= 2);
    let lines = sink.lines.lock();
    assert!(lines.iter().any(|l| l.contains("Error measuring sound level")));
    assert!(lines.iter().any(|l| l.contains("Current sound level: 0.0 dB")));
}

#[test]
fn device_open_failure_surfaces_and_monitor_stays_idle() {
    let result = MonitorHandle::spawn(
        test_config(),
        || -> Result<ConstantSource, AudioError> {
            Err(AudioError::DeviceNotFound { index: Some(9) })
        },
        Arc::new(CountingAlarm::default()) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    );
    assert!(matches!(
        result,
        Err(AppError::Audio(AudioError::DeviceNotFound { index: Some(9) }))
    ));
}

#[test]
fn calibration_returns_the_ambient_mean() {
    let buffer = buffer_for_db(40.0);
    let estimator = LevelEstimator::new();
    let expected = estimator.estimate(&buffer);

    let source = ConstantSource { buffer };
    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::new(CountingAlarm::default()) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    let mean = handle.calibrate(Duration::from_secs(2)).unwrap();
    assert!((mean - expected).abs() < 0.01);
    handle.stop().unwrap();
}

#[test]
fn calibration_over_silence_is_a_failure_not_zero() {
    let source = ConstantSource {
        buffer: vec![0i16; CHUNK],
    };
    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::new(CountingAlarm::default()) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    let result = handle.calibrate(Duration::from_secs(1));
    assert!(matches!(result, Err(MonitorError::CalibrationEmpty)));
    handle.stop().unwrap();
}

#[test]
fn threshold_changes_apply_to_later_cycles() {
    let reads = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    // 60 dB for a long stretch; threshold starts above it
    let steps = (0..64).map(|_| Ok(buffer_for_db(60.0))).collect();
    let source = ScriptedSource::new(steps, &reads, &closed);

    let alarm = Arc::new(CountingAlarm::default());
    let handle = MonitorHandle::spawn(
        MonitorConfig {
            threshold_db: 80.0,
            cooldown_secs: 1000.0,
            chunk_size: CHUNK,
            update_interval_secs: 1.0,
            ..Default::default()
        },
        move || Ok(source),
        Arc::clone(&alarm) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    wait_for(&reads, 2);
    assert_eq!(alarm.fired.load(Ordering::SeqCst), 0);

    handle.set_threshold_db(50.0);
    assert_eq!(handle.threshold_db(), 50.0);
    wait_for(&reads, reads.load(Ordering::SeqCst) + 3);

    // Fired after the change; the long cooldown keeps it to one
    assert_eq!(alarm.fired.load(Ordering::SeqCst), 1);
    handle.stop().unwrap();
}

#[test]
fn state_subscription_observes_the_full_lifecycle() {
    let reads = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let steps = (0..2).map(|_| Ok(buffer_for_db(40.0))).collect();
    let source = ScriptedSource::new(steps, &reads, &closed);

    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::new(CountingAlarm::default()) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    let state_rx = handle.subscribe_state();
    wait_for(&reads, 1);
    handle.stop().unwrap();

    let observed: Vec<MonitorState> = state_rx.try_iter().collect();
    assert_eq!(
        observed,
        vec![
            MonitorState::Running,
            MonitorState::Stopping,
            MonitorState::Stopped
        ]
    );
}

#[test]
fn stats_track_levels_and_cycles() {
    let reads = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let steps = (0..8).map(|_| Ok(buffer_for_db(45.0))).collect();
    let source = ScriptedSource::new(steps, &reads, &closed);

    let handle = MonitorHandle::spawn(
        test_config(),
        move || Ok(source),
        Arc::new(CountingAlarm::default()) as Arc<dyn AlarmTrigger>,
        Arc::new(CollectingSink::default()) as Arc<dyn DiagnosticSink>,
        Arc::new(TestClock::new()) as SharedClock,
    )
    .unwrap();

    wait_for(&reads, 4);
    let stats = handle.stats();
    assert!(stats.cycles.load(Ordering::SeqCst) >= 3);
    handle.stop().unwrap();
}
