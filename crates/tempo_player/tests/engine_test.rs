mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{bytes_for_ms, Harness, MockBackend, SharedLog};
use tempo_player::{
    spawn_player, BackendEvent, Capabilities, LoadError, Notification, PlaybackState,
    PlayerConfig, PlayerError, RecordingListener, VideoSurface,
};

// ============================================================================
// 加载
// ============================================================================

#[test]
fn test_load_estimates_duration_from_size() {
    let h = Harness::sequential();
    let track = h.file("long.mp3", 3_840_000);
    h.engine.load(track.clone()).unwrap();

    let snapshot = h.engine.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Loaded);
    assert_eq!(snapshot.duration_ms, 240_000);
    assert!(snapshot.duration_estimated);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(snapshot.track, Some(track));
}

#[test]
fn test_load_uses_reported_duration() {
    let h = Harness::with_caps(Capabilities::NATIVE_AUDIO, Some(187_000));
    h.engine.load(h.file("a.flac", 1234)).unwrap();

    let snapshot = h.engine.snapshot();
    assert_eq!(snapshot.duration_ms, 187_000);
    assert!(!snapshot.duration_estimated);
}

#[test]
fn test_load_missing_file_leaves_idle() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", 16_000)).unwrap();

    let missing = tempo_player::Track::new(h.dir.path().join("gone.mp3"));
    let err = h.engine.load(missing).unwrap_err();

    assert!(matches!(err, LoadError::NotFound(_)));
    assert_eq!(h.engine.state(), PlaybackState::Idle);
    assert_eq!(h.engine.current_track(), None);
    // 旧会话已拆除
    assert_eq!(h.log().live, 0);
}

#[test]
fn test_backend_rejection_is_load_error() {
    let h = Harness::sequential();
    h.log().fail_open = true;

    let err = h.engine.load(h.file("a.mp3", 16_000)).unwrap_err();
    assert!(matches!(err, LoadError::Rejected { .. }));
    assert_eq!(h.engine.state(), PlaybackState::Idle);
}

#[test]
fn test_consecutive_loads_hold_one_handle() {
    let h = Harness::sequential();
    for name in ["a.mp3", "b.mp3", "c.mp3"] {
        h.engine.load(h.file(name, 16_000)).unwrap();
        h.engine.play().unwrap();
    }

    let log = h.log();
    assert_eq!(log.max_live, 1);
    assert_eq!(log.live, 1);
}

#[test]
fn test_load_while_playing_reports_stop() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", 16_000)).unwrap();
    h.engine.play().unwrap();
    h.recorder.take();

    h.engine.load(h.file("b.mp3", 16_000)).unwrap();
    assert_eq!(
        h.recorder.take(),
        vec![Notification::PlaybackStopped, Notification::PositionChanged(0)]
    );
}

// ============================================================================
// 状态机
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Command {
    Load,
    Play,
    Pause,
    Stop,
    Seek,
    Volume,
}

fn enter(h: &Harness, state: PlaybackState) {
    let track = h.file("state.mp3", bytes_for_ms(60_000));
    match state {
        PlaybackState::Idle => {}
        PlaybackState::Loaded => h.engine.load(track).unwrap(),
        PlaybackState::Playing => {
            h.engine.load(track).unwrap();
            h.engine.play().unwrap();
        }
        PlaybackState::Paused => {
            h.engine.load(track).unwrap();
            h.engine.play().unwrap();
            h.advance(100);
            h.engine.pause().unwrap();
        }
        PlaybackState::Stopped => {
            h.engine.load(track).unwrap();
            h.engine.play().unwrap();
            h.engine.stop();
        }
    }
    assert_eq!(h.engine.state(), state);
}

fn apply(h: &Harness, command: Command) {
    match command {
        Command::Load => h.engine.load(h.file("other.mp3", 16_000)).unwrap(),
        Command::Play => h.engine.play().unwrap(),
        Command::Pause => h.engine.pause().unwrap(),
        Command::Stop => h.engine.stop(),
        Command::Seek => h.engine.seek_to(5_000).unwrap(),
        Command::Volume => h.engine.set_volume(50),
    }
}

#[test]
fn test_every_state_command_pair_is_defined() {
    use Command::*;
    use PlaybackState::*;

    let table = [
        (Idle, [Loaded, Idle, Idle, Idle, Idle, Idle]),
        (Loaded, [Loaded, Playing, Loaded, Loaded, Paused, Loaded]),
        (Playing, [Loaded, Playing, Paused, Stopped, Playing, Playing]),
        (Paused, [Loaded, Playing, Paused, Stopped, Paused, Paused]),
        (Stopped, [Loaded, Playing, Stopped, Stopped, Paused, Stopped]),
    ];
    let commands = [Load, Play, Pause, Stop, Seek, Volume];

    for (from, expected) in table {
        for (command, want) in commands.iter().zip(expected) {
            let h = Harness::sequential();
            enter(&h, from);
            apply(&h, *command);
            assert_eq!(
                h.engine.state(),
                want,
                "{:?} --{:?}--> expected {:?}",
                from,
                command,
                want
            );
        }
    }
}

#[test]
fn test_pause_then_play_resumes_at_captured_position() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(60_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);
    h.clock.advance(30);

    h.engine.pause().unwrap();
    let snapshot = h.engine.snapshot();
    assert_eq!(snapshot.paused_position_ms, 1_030);
    assert_eq!(snapshot.position_ms, 1_030);

    // 暂停期间挂钟继续走，但位置不变
    h.advance(5_000);
    assert_eq!(h.engine.position_ms(), 1_030);

    h.engine.play().unwrap();
    assert_eq!(h.log().opens.last().unwrap().1, bytes_for_ms(1_030));

    let interval = h.engine.config().tick_interval_ms;
    h.advance(interval);
    let position = h.engine.position_ms();
    assert!(position >= 1_030 && position <= 1_030 + interval, "{}", position);
}

#[test]
fn test_stop_resets_positions_from_any_state() {
    for state in [
        PlaybackState::Loaded,
        PlaybackState::Playing,
        PlaybackState::Paused,
        PlaybackState::Stopped,
    ] {
        let h = Harness::sequential();
        enter(&h, state);
        if state != PlaybackState::Playing {
            h.engine.seek_to(7_000).unwrap();
        } else {
            h.advance(2_000);
        }

        h.engine.stop();
        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.position_ms, 0, "from {:?}", state);
        assert_eq!(snapshot.paused_position_ms, 0, "from {:?}", state);
    }
}

#[test]
fn test_stop_closes_stream() {
    let h = Harness::sequential();
    enter(&h, PlaybackState::Playing);
    h.engine.stop();

    let log = h.log();
    assert_eq!(log.live, 0);
    assert!(log.calls.ends_with(&["stop".to_string(), "close".to_string()]));
}

// ============================================================================
// Seek
// ============================================================================

#[test]
fn test_seek_is_clamped() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(60_000))).unwrap();

    h.engine.seek_to(-500).unwrap();
    assert_eq!(h.engine.position_ms(), 0);
    assert_eq!(h.engine.state(), PlaybackState::Paused);

    h.engine.seek_to(10_000_000).unwrap();
    let snapshot = h.engine.snapshot();
    assert_eq!(snapshot.position_ms, 60_000);
    assert_eq!(snapshot.paused_position_ms, 60_000);
}

#[test]
fn test_seek_without_session_is_noop() {
    let h = Harness::sequential();
    h.engine.seek_to(1_000).unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Idle);
    assert!(h.recorder.take().is_empty());
}

#[test]
fn test_emulated_seek_skips_bytes_and_keeps_playing() {
    let h = Harness::sequential();
    h.engine.load(h.file("long.mp3", 3_840_000)).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);

    h.engine.seek_to(120_000).unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    {
        let log = h.log();
        assert_eq!(log.opens.last().unwrap().1, 120_000 * 128_000 / 8 / 1_000);
        assert_eq!(log.max_live, 1);
    }
    assert!(h
        .recorder
        .snapshot()
        .contains(&Notification::PositionChanged(120_000)));

    // 两个 tick 内报告的位置不小于 119.9 秒
    h.advance(100);
    h.advance(100);
    assert!(h.engine.position_ms() >= 119_900);
}

#[test]
fn test_native_seek_does_not_reopen() {
    let h = Harness::with_caps(Capabilities::NATIVE_AUDIO, Some(200_000));
    h.engine.load(h.file("a.flac", 1_000)).unwrap();
    h.engine.play().unwrap();

    h.engine.seek_to(50_000).unwrap();
    h.advance(100);

    let log = h.log();
    assert_eq!(log.opens.len(), 1);
    assert_eq!(log.seeks, vec![50_000]);
    drop(log);
    assert_eq!(h.engine.position_ms(), 50_100);
}

#[test]
fn test_seek_while_paused_resumes_from_target() {
    let h = Harness::sequential();
    enter(&h, PlaybackState::Paused);
    h.engine.seek_to(30_000).unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Paused);

    h.engine.play().unwrap();
    assert_eq!(h.log().opens.last().unwrap().1, bytes_for_ms(30_000));
    h.advance(100);
    assert_eq!(h.engine.position_ms(), 30_100);
}

#[test]
fn test_native_pause_keeps_stream() {
    let h = Harness::with_caps(Capabilities::NATIVE_AUDIO, Some(100_000));
    h.engine.load(h.file("a.flac", 1_000)).unwrap();
    h.engine.play().unwrap();
    h.advance(500);
    h.engine.pause().unwrap();

    assert_eq!(h.log().live, 1);
    assert!(h.log().calls.contains(&"pause".to_string()));

    h.engine.play().unwrap();
    let log = h.log();
    assert_eq!(log.opens.len(), 1);
    assert_eq!(log.seeks, vec![500]);
}

// ============================================================================
// 自然结束
// ============================================================================

#[test]
fn test_natural_completion_fires_once() {
    let h = Harness::sequential();
    h.engine.load(h.file("short.mp3", bytes_for_ms(1_000))).unwrap();
    h.engine.play().unwrap();

    h.advance(500);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 0);

    h.advance(600);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.engine.position_ms(), 0);
    assert_eq!(h.log().live, 0);

    for _ in 0..5 {
        h.advance(100);
    }
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
}

#[test]
fn test_replay_after_completion_can_finish_again() {
    let h = Harness::sequential();
    h.engine.load(h.file("short.mp3", bytes_for_ms(1_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);

    h.engine.play().unwrap();
    h.advance(1_000);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 2);
}

#[test]
fn test_seek_after_completion_starts_new_play_through() {
    let h = Harness::sequential();
    h.engine.load(h.file("short.mp3", bytes_for_ms(1_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);

    h.engine.seek_to(500).unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Paused);
    h.engine.play().unwrap();
    for _ in 0..20 {
        h.advance(100);
    }

    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 2);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.engine.position_ms(), 0);
}

#[test]
fn test_explicit_event_and_heuristic_fire_once() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(9_700);

    h.emit(BackendEvent::Stopped);
    h.emit(BackendEvent::Finished);
    h.advance(0);
    h.advance(100);

    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_heuristic_completion_on_backend_stop() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(9_600);

    h.emit(BackendEvent::Stopped);
    h.advance(100);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);

    // 迟到的结束事件来自已关闭的流
    h.emit(BackendEvent::Finished);
    h.advance(100);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
}

#[test]
fn test_early_backend_stop_is_not_completion() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(5_000);

    h.emit(BackendEvent::Stopped);
    h.advance(100);
    h.advance(100);

    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 0);
    assert_eq!(h.recorder.count(&Notification::PlaybackStopped), 1);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_finished_after_early_backend_stop_completes_once() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(8_000);

    // 估算时长偏长：后端先停，下一次 tick 才报告结束
    h.emit(BackendEvent::Stopped);
    h.advance(100);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 0);

    h.emit(BackendEvent::Finished);
    h.advance(100);
    h.advance(100);

    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
    assert_eq!(h.recorder.count(&Notification::PlaybackStopped), 1);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_finished_after_user_stop_is_ignored() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(8_000);

    h.emit(BackendEvent::Stopped);
    h.advance(100);
    h.engine.stop();

    h.emit(BackendEvent::Finished);
    h.advance(100);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 0);
}

#[test]
fn test_completion_threshold_is_configurable() {
    let config = PlayerConfig {
        completion_threshold: 0.5,
        ..Default::default()
    };
    let h = Harness::with_config(Capabilities::SEQUENTIAL, None, config);
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(6_000);

    h.emit(BackendEvent::Stopped);
    h.advance(0);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
}

#[test]
fn test_user_stop_near_end_is_not_completion() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(9_800);

    h.engine.stop();
    h.advance(100);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 0);
}

#[test]
fn test_explicit_finished_event() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(3_000);

    h.emit(BackendEvent::Finished);
    h.advance(100);
    h.advance(100);

    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 1);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_events_from_closed_stream_are_ignored() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);

    let old_sink = h.log().sinks.last().cloned().unwrap();
    h.engine.pause().unwrap();
    old_sink.emit(BackendEvent::Finished);
    old_sink.emit(BackendEvent::Error("late".into()));
    h.advance(100);

    assert_eq!(h.engine.state(), PlaybackState::Paused);
    assert_eq!(h.recorder.count(&Notification::PlaybackFinished), 0);
}

// ============================================================================
// 错误
// ============================================================================

#[test]
fn test_backend_error_forces_stop() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(10_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);
    h.recorder.take();

    h.emit(BackendEvent::Error("decoder crashed".into()));
    h.advance(100);

    let seen = h.recorder.take();
    assert_eq!(
        seen,
        vec![
            Notification::PlaybackError("decoder crashed".into()),
            Notification::PlaybackStopped,
        ]
    );
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.engine.position_ms(), 0);
    assert_eq!(h.log().live, 0);
}

#[test]
fn test_play_failure_is_returned_and_notified() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", 16_000)).unwrap();
    h.log().fail_play = true;

    let err = h.engine.play().unwrap_err();
    assert!(matches!(err, PlayerError::Backend(_)));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.recorder.count(&Notification::PlaybackStarted), 0);
    assert!(h
        .recorder
        .snapshot()
        .iter()
        .any(|n| matches!(n, Notification::PlaybackError(_))));
}

// ============================================================================
// 音量 / 视频 / 时间事件
// ============================================================================

#[test]
fn test_volume_forwarded_when_supported() {
    let h = Harness::with_caps(Capabilities::NATIVE_AUDIO, Some(10_000));
    h.engine.load(h.file("a.flac", 1_000)).unwrap();
    h.engine.set_volume(150);
    h.engine.set_volume(-3);

    assert_eq!(h.engine.volume(), 0);
    assert_eq!(h.log().volumes, vec![80, 100, 0]);
}

#[test]
fn test_volume_ignored_when_unsupported() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", 16_000)).unwrap();
    h.engine.set_volume(30);

    assert_eq!(h.engine.volume(), 30);
    assert!(h.log().volumes.is_empty());
}

#[test]
fn test_video_surface_attached_for_video_tracks() {
    let caps = Capabilities {
        video: true,
        ..Capabilities::NATIVE_AUDIO
    };
    let h = Harness::with_caps(caps, Some(10_000));
    h.engine.set_video_surface(Some(VideoSurface(7)));

    h.engine.load(h.file("song.mp3", 1_000)).unwrap();
    assert!(h.log().surfaces.is_empty());

    h.engine.load(h.file("clip.mp4", 1_000)).unwrap();
    assert_eq!(h.log().surfaces, vec![VideoSurface(7)]);
}

#[test]
fn test_video_without_support_plays_audio_only() {
    let h = Harness::sequential();
    h.engine.set_video_surface(Some(VideoSurface(7)));
    h.engine.load(h.file("clip.mkv", 16_000)).unwrap();
    h.engine.play().unwrap();

    assert_eq!(h.engine.state(), PlaybackState::Playing);
    assert!(h.log().surfaces.is_empty());
}

#[test]
fn test_reported_time_rebases_position() {
    let h = Harness::with_caps(Capabilities::NATIVE_AUDIO, Some(100_000));
    h.engine.load(h.file("a.flac", 1_000)).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);

    h.emit(BackendEvent::TimeAdvanced(4_000));
    h.advance(100);
    assert_eq!(h.engine.position_ms(), 4_000);

    h.advance(100);
    assert_eq!(h.engine.position_ms(), 4_100);
}

#[test]
fn test_sequential_time_events_are_ignored() {
    let h = Harness::sequential();
    h.engine.load(h.file("a.mp3", bytes_for_ms(100_000))).unwrap();
    h.engine.play().unwrap();
    h.advance(1_000);

    h.emit(BackendEvent::TimeAdvanced(4_000));
    h.advance(100);
    assert_eq!(h.engine.position_ms(), 1_100);
}

// ============================================================================
// 生命周期
// ============================================================================

#[test]
fn test_shutdown_releases_backend_once() {
    let log = SharedLog::default();
    let backend = MockBackend::new(Capabilities::SEQUENTIAL, None, log.clone());
    let handle = spawn_player(Box::new(backend), PlayerConfig::default());

    handle.shutdown();
    handle.shutdown();
    assert!(!handle.synchronizer().is_running());
    assert_eq!(log.lock().unwrap().released, 1);

    drop(handle);
    assert_eq!(log.lock().unwrap().released, 1);
}

#[test]
fn test_synchronizer_ticks_and_stops_cleanly() {
    let log = SharedLog::default();
    let backend = MockBackend::new(Capabilities::SEQUENTIAL, None, log.clone());
    let config = PlayerConfig {
        tick_interval_ms: 5,
        ..Default::default()
    };
    let handle = spawn_player(Box::new(backend), config);
    let recorder = RecordingListener::new();
    handle.engine().add_listener(recorder.clone());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.mp3");
    std::fs::File::create(&path)
        .unwrap()
        .set_len(bytes_for_ms(60_000))
        .unwrap();
    handle.engine().load(tempo_player::Track::new(path)).unwrap();
    handle.engine().play().unwrap();

    thread::sleep(Duration::from_millis(100));
    let positions = recorder
        .snapshot()
        .iter()
        .filter(|n| matches!(n, Notification::PositionChanged(ms) if *ms > 0))
        .count();
    assert!(positions > 0);

    handle.synchronizer().stop();
    handle.synchronizer().stop();
    let seen = recorder.snapshot().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(recorder.snapshot().len(), seen);

    let engine = Arc::clone(handle.engine());
    handle.shutdown();
    assert_eq!(engine.state(), PlaybackState::Idle);
}

#[test]
fn test_listener_can_call_back_into_engine() {
    struct StopOnStart(std::sync::Weak<tempo_player::Engine>);

    impl tempo_player::PlaybackListener for StopOnStart {
        fn on_playback_started(&self) {
            if let Some(engine) = self.0.upgrade() {
                engine.stop();
            }
        }
    }

    let h = Harness::sequential();
    h.engine
        .add_listener(Arc::new(StopOnStart(Arc::downgrade(&h.engine))));
    h.engine.load(h.file("a.mp3", 16_000)).unwrap();
    h.engine.play().unwrap();

    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}
