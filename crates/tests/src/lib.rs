//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置到相机的装配测试
//! - 广播信号与生产线程的行为测试（使用 mock 源，无需真实相机）
//! - 并发压力测试

#[cfg(test)]
mod config_tests {
    use camera::SharedCamera;
    use config_loader::{ConfigFormat, ConfigLoader};

    const STREAMER_TOML: &str = r#"
[[cameras]]
id = "plaza"
idle_timeout_ms = 10000
stale_timeout_ms = 5000
reap_policy = "one_per_publish"
[cameras.source]
kind = "mock"
frequency_hz = 50.0
payload_size = 256

[[cameras]]
id = "dock"
reap_policy = "all_stale"
[cameras.source]
kind = "files"
directory = "/nonexistent/frames"
"#;

    #[test]
    fn test_blueprint_to_cameras() {
        let blueprint = ConfigLoader::load_from_str(STREAMER_TOML, ConfigFormat::Toml).unwrap();

        for config in &blueprint.cameras {
            let bundle = sources::from_config(config);
            let camera = SharedCamera::new(config, bundle.factory, bundle.side_task);
            assert_eq!(camera.source_id(), config.id.as_str());
            assert_eq!(camera.reap_policy(), config.reap_policy);
            assert!(!camera.is_running());
        }
    }

    #[test]
    fn test_missing_directory_fails_first_access() {
        let blueprint = ConfigLoader::load_from_str(STREAMER_TOML, ConfigFormat::Toml).unwrap();
        let config = blueprint.camera("dock").unwrap();
        let bundle = sources::from_config(config);
        let camera = SharedCamera::new(config, bundle.factory, None);

        let err = camera.get_frame(contracts::ConsumerId::next()).unwrap_err();
        assert!(matches!(err, camera::CameraError::Startup { .. }));
    }
}

#[cfg(test)]
mod signal_tests {
    use std::time::{Duration, Instant};

    use broadcast::{BroadcastSignal, DEFAULT_STALE_TIMEOUT};
    use contracts::{ConsumerId, ReapPolicy};

    /// 两个从不确认的消费者，间隔 6s 的两次发布各回收一个
    #[test]
    fn test_stale_consumers_reaped_one_per_publish() {
        let signal = BroadcastSignal::new();
        let (a, b) = (ConsumerId::next(), ConsumerId::next());
        signal.register(a);
        signal.register(b);

        let t0 = Instant::now();
        assert_eq!(signal.publish_at(t0).signaled, 2);
        assert_eq!(signal.slot_count(), 2);

        let report = signal.publish_at(t0 + Duration::from_secs(6));
        assert_eq!(report.reaped.len(), 1);
        assert_eq!(signal.slot_count(), 1);

        let report = signal.publish_at(t0 + Duration::from_secs(12));
        assert_eq!(report.reaped.len(), 1);
        assert_eq!(signal.slot_count(), 0);
    }

    #[test]
    fn test_all_stale_policy_reaps_at_once() {
        let signal = BroadcastSignal::with_policy(DEFAULT_STALE_TIMEOUT, ReapPolicy::AllStale);
        for _ in 0..3 {
            signal.register(ConsumerId::next());
        }

        let t0 = Instant::now();
        signal.publish_at(t0);
        let report = signal.publish_at(t0 + Duration::from_secs(6));
        assert_eq!(report.reaped.len(), 3);
        assert_eq!(signal.slot_count(), 0);
    }

    #[test]
    fn test_acknowledging_consumer_survives() {
        let signal = BroadcastSignal::new();
        let (active, gone) = (ConsumerId::next(), ConsumerId::next());
        signal.register(active);
        signal.register(gone);

        let t0 = Instant::now();
        signal.publish_at(t0);
        signal.acknowledge(active);

        let report = signal.publish_at(t0 + Duration::from_secs(6));
        assert_eq!(report.reaped, vec![gone]);
        assert!(signal.contains(active));
    }
}

#[cfg(test)]
mod camera_tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use camera::{CameraError, CameraRegistry, RunExit, SharedCamera};
    use contracts::{
        CameraConfig, ConsumerId, MockSourceSettings, ScheduledTask, SideTask, SideTaskError,
        SourceConfig,
    };
    use rand::Rng;
    use sources::{MockFrameSource, MockSourceConfig, MockSourceFactory};

    fn config(id: &str) -> CameraConfig {
        CameraConfig::new(id, SourceConfig::Mock(MockSourceSettings::default()))
            .frame_timeout(Duration::from_secs(2))
    }

    struct AlwaysFails;

    impl SideTask for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn run(&self) -> Result<(), SideTaskError> {
            Err(SideTaskError::failed("always-fails", "boom"))
        }
    }

    #[test]
    fn test_concurrent_consumers_see_increasing_generations() {
        let factory = MockSourceFactory::new(MockSourceConfig::new("gen", 200.0).with_payload_size(64));
        let camera = Arc::new(SharedCamera::new(&config("gen"), Arc::new(factory), None));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let camera = Arc::clone(&camera);
                thread::spawn(move || {
                    let consumer = ConsumerId::next();
                    (0..30)
                        .map(|_| camera.get_frame(consumer).unwrap().generation)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let generations = handle.join().unwrap();
            assert!(
                generations.windows(2).all(|w| w[0] < w[1]),
                "generations went backwards: {generations:?}"
            );
        }
    }

    #[test]
    fn test_idle_cycle_reopens_source() {
        let factory = Arc::new(MockSourceFactory::new(MockSourceConfig::new("idle", 100.0)));
        let counters = factory.counters();
        let camera = SharedCamera::new(
            &config("idle").idle_timeout(Duration::from_millis(150)),
            factory,
            None,
        );
        let consumer = ConsumerId::next();

        camera.get_frame(consumer).unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(2)));
        assert_eq!(camera.last_exit(), Some((1, RunExit::Idle)));
        assert_eq!(counters.closes(), 1);

        let frame = camera.get_frame(consumer).unwrap();
        assert!(MockFrameSource::is_intact(&frame.data));
        assert_eq!(counters.opens(), 2);
    }

    #[test]
    fn test_transient_failure_reserves_previous_payload() {
        // 20 Hz leaves each call time to re-arm before the next publish
        let factory = MockSourceFactory::new(
            MockSourceConfig::new("flaky", 20.0)
                .with_payload_size(64)
                .with_transient_failure_at(3),
        );
        let camera = SharedCamera::new(&config("flaky"), Arc::new(factory), None);
        let consumer = ConsumerId::next();

        let first = camera.get_frame(consumer).unwrap();
        let second = camera.get_frame(consumer).unwrap();
        let third = camera.get_frame(consumer).unwrap();

        assert_eq!(MockFrameSource::sequence_of(&first.data), Some(1));
        assert_eq!(third.data, second.data);
        assert_eq!(third.generation, second.generation + 1);
        assert_eq!(camera.stats().frames_reserved, 1);
    }

    #[test]
    fn test_failing_side_task_does_not_block_publishing() {
        let factory = MockSourceFactory::new(
            MockSourceConfig::new("side", 0.0)
                .with_payload_size(64)
                .with_end_after(40),
        );
        let task = ScheduledTask::new(Arc::new(AlwaysFails), Duration::ZERO);
        let camera = SharedCamera::new(&config("side"), Arc::new(factory), Some(task));

        camera.get_frame(ConsumerId::next()).unwrap();
        assert!(camera.wait_until_stopped(Duration::from_secs(5)));

        let stats = camera.stats();
        assert_eq!(camera.last_exit(), Some((1, RunExit::Exhausted)));
        assert_eq!(stats.frames_published, 40);
        assert_eq!(stats.side_task_failures, stats.frames_published);
    }

    #[test]
    fn test_fifty_consumers_at_100hz() {
        let factory = MockSourceFactory::new(
            MockSourceConfig::new("stress", 100.0).with_payload_size(1024),
        );
        let camera = Arc::new(SharedCamera::new(&config("stress"), Arc::new(factory), None));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let camera = Arc::clone(&camera);
                thread::spawn(move || {
                    let consumer = ConsumerId::next();
                    let mut rng = rand::rng();
                    let mut last = 0;
                    for _ in 0..40 {
                        let frame = camera.get_frame(consumer).unwrap();
                        assert!(MockFrameSource::is_intact(&frame.data), "torn payload");
                        assert!(frame.generation > last);
                        last = frame.generation;
                        thread::sleep(Duration::from_millis(rng.random_range(0..5)));
                    }
                    camera.release(consumer);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(camera.consumer_count(), 0);
        assert_eq!(camera.stats().frames_delivered, 50 * 40);
    }

    #[test]
    fn test_startup_failure_reaches_caller() {
        let factory = Arc::new(MockSourceFactory::new(
            MockSourceConfig::new("down", 25.0).with_open_failure(),
        ));
        let counters = factory.counters();
        let camera = SharedCamera::new(&config("down"), factory, None);
        let consumer = ConsumerId::next();

        for _ in 0..2 {
            let err = camera.get_frame(consumer).unwrap_err();
            assert!(matches!(err, CameraError::Startup { .. }));
        }
        assert_eq!(counters.opens(), 0);
        assert_eq!(camera.stats().startup_failures, 2);
        assert!(!camera.is_running());
    }

    #[test]
    fn test_fatal_fault_then_fresh_run() {
        let factory = Arc::new(MockSourceFactory::new(
            MockSourceConfig::new("fatal", 20.0)
                .with_payload_size(64)
                .with_fatal_failure_at(2),
        ));
        let counters = factory.counters();
        let camera = SharedCamera::new(&config("fatal"), factory, None);
        let consumer = ConsumerId::next();

        camera.get_frame(consumer).unwrap();
        let err = camera.get_frame(consumer).unwrap_err();
        assert!(matches!(err, CameraError::SourceFailed { .. }));

        // The next call opens a fresh source
        camera.get_frame(consumer).unwrap();
        assert_eq!(counters.opens(), 2);
    }

    #[test]
    fn test_empty_stream_opens_once_per_call() {
        let factory = Arc::new(MockSourceFactory::new(
            MockSourceConfig::new("empty", 25.0).with_end_after(0),
        ));
        let counters = factory.counters();
        let camera = SharedCamera::new(
            &config("empty").frame_timeout(Duration::from_secs(1)),
            factory,
            None,
        );
        let consumer = ConsumerId::next();

        for call in 1..=3 {
            let err = camera.get_frame(consumer).unwrap_err();
            assert!(matches!(err, CameraError::SourceExhausted { .. }), "{err}");
            assert_eq!(counters.opens(), call);
            assert_eq!(camera.run_count(), call);
        }
    }

    #[test]
    fn test_end_of_stream_then_fresh_run() {
        let factory = Arc::new(MockSourceFactory::new(
            MockSourceConfig::new("finite", 20.0)
                .with_payload_size(64)
                .with_end_after(1),
        ));
        let counters = factory.counters();
        let camera = SharedCamera::new(&config("finite"), factory, None);
        let consumer = ConsumerId::next();

        camera.get_frame(consumer).unwrap();
        let err = camera.get_frame(consumer).unwrap_err();
        assert!(matches!(err, CameraError::SourceExhausted { .. }));
        assert_eq!(counters.opens(), 1);
        assert_eq!(camera.last_exit(), Some((1, RunExit::Exhausted)));

        // The next call opens a fresh source
        camera.get_frame(consumer).unwrap();
        assert_eq!(counters.opens(), 2);
    }

    #[test]
    fn test_overlay_refresh_reaches_payloads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"first line\n").unwrap();

        let mut overlay = contracts::OverlayConfig::new(file.path());
        overlay.refresh_interval_ms = 20;
        let config = CameraConfig::new(
            "overlay",
            SourceConfig::Mock(MockSourceSettings {
                frequency_hz: 100.0,
                payload_size: 64,
            }),
        )
        .overlay(overlay);

        let bundle = sources::from_config(&config);
        let handle = bundle.overlay.clone().unwrap();
        let camera = SharedCamera::new(&config, bundle.factory, bundle.side_task);
        let consumer = ConsumerId::next();

        let mut seen_version = 0;
        for _ in 0..200 {
            let frame = camera.get_frame(consumer).unwrap();
            seen_version = MockFrameSource::overlay_version_of(&frame.data).unwrap();
            if seen_version >= 3 {
                break;
            }
        }
        assert!(seen_version >= 3, "overlay never refreshed");
        assert_eq!(handle.snapshot().lines, vec!["first line"]);
        assert_eq!(camera.stats().side_task_failures, 0);
    }

    #[test]
    fn test_global_registry_shares_producer() {
        let factory = Arc::new(MockSourceFactory::new(MockSourceConfig::new("registry-shared", 100.0)));
        let counters = factory.counters();

        let first = CameraRegistry::global().get_or_init("registry-shared", || {
            SharedCamera::new(&config("registry-shared"), factory.clone(), None)
        });
        let second = CameraRegistry::global().get_or_init("registry-shared", || {
            unreachable!("camera already registered")
        });

        first.get_frame(ConsumerId::next()).unwrap();
        second.get_frame(ConsumerId::next()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counters.opens(), 1);
    }
}

#[cfg(test)]
mod runtime_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use camera::SharedCamera;
    use contracts::{CameraConfig, ConsumerId, MockSourceSettings, SourceConfig};
    use sources::{MockSourceConfig, MockSourceFactory};

    /// 在 tokio 阻塞线程池上驱动消费者（与 CLI 的 run 命令一致）
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_consumers_on_blocking_pool() {
        let config = CameraConfig::new("tokio", SourceConfig::Mock(MockSourceSettings::default()))
            .frame_timeout(Duration::from_secs(2));
        let factory = MockSourceFactory::new(MockSourceConfig::new("tokio", 100.0));
        let camera = Arc::new(SharedCamera::new(&config, Arc::new(factory), None));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let camera = Arc::clone(&camera);
                tokio::task::spawn_blocking(move || {
                    let consumer = ConsumerId::next();
                    let frames: Vec<_> = (0..10).map(|_| camera.get_frame(consumer)).collect();
                    camera.release(consumer);
                    frames
                })
            })
            .collect();

        for task in tasks {
            let frames = task.await.unwrap();
            assert!(frames.iter().all(Result::is_ok));
        }
        assert_eq!(camera.consumer_count(), 0);
    }
}
