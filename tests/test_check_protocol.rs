mod mock_engine;

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use bvr_perception::common::PointXYZ;
use bvr_perception::{CheckOutcome, DispatchConfig, Dispatcher, SourceCloud, SourceId};
use mock_engine::{detection, frame, init_logging, test_config, GatedEngine, ScriptedEngine, GATE_TIMEOUT};

#[test]
fn check_succeeds_with_boxes() {
    init_logging();
    let engine = ScriptedEngine::new(2, vec![detection(1, 0.9, 10., 10., 50., 50.)]);
    let (dispatcher, receivers) = Dispatcher::new(test_config(), engine).unwrap();
    dispatcher.on_frame(frame());

    let outcome = dispatcher.check_for_objects();
    let boxes = outcome.bounding_boxes().unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes.bounding_boxes[0].label, "car");
    assert!(!dispatcher.is_checking_for_objects());

    // Successful checks go through the same publisher.
    assert_eq!(receivers.bounding_boxes_rx.try_recv().unwrap().len(), 1);
    assert_eq!(receivers.object_count_rx.try_recv().unwrap(), 1);
}

#[test]
fn second_request_is_busy() {
    init_logging();
    let (engine, gate) = GatedEngine::new(2, vec![detection(0, 0.8, 5., 5., 20., 20.)]);
    let (dispatcher, _receivers) = Dispatcher::new(test_config(), engine).unwrap();
    let dispatcher = Arc::new(dispatcher);
    dispatcher.on_frame(frame());

    let first = dispatcher.request_check();
    gate.started.recv_timeout(GATE_TIMEOUT).unwrap();
    assert!(dispatcher.is_checking_for_objects());

    assert_eq!(dispatcher.check_for_objects(), CheckOutcome::Busy);
    let second = dispatcher.request_check();
    assert_eq!(second.wait_timeout(GATE_TIMEOUT), Some(CheckOutcome::Busy));
    assert!(!second.cancel());

    gate.release.send(()).unwrap();
    let outcome = first.wait();
    assert!(outcome.is_succeeded());
    assert_eq!(outcome.bounding_boxes().unwrap().len(), 1);
    assert!(!dispatcher.is_checking_for_objects());
}

#[test]
fn cancel_while_running_is_preempted() {
    init_logging();
    let (engine, gate) = GatedEngine::new(2, vec![detection(1, 0.9, 10., 10., 50., 50.)]);
    let (dispatcher, receivers) = Dispatcher::new(test_config(), engine).unwrap();
    let dispatcher = Arc::new(dispatcher);
    dispatcher.on_frame(frame());

    let handle = dispatcher.request_check();
    gate.started.recv_timeout(GATE_TIMEOUT).unwrap();
    assert_eq!(handle.wait_timeout(Duration::from_millis(20)), None);
    assert!(handle.cancel());

    // Inference still runs to completion.
    gate.release.send(()).unwrap();
    assert_eq!(handle.wait(), CheckOutcome::Preempted);
    assert!(!dispatcher.is_checking_for_objects());

    // A preempted result is not published either.
    assert!(receivers.bounding_boxes_rx.try_recv().is_err());
    assert!(receivers.detection_image_rx.try_recv().is_err());
}

#[test]
fn preempt_check_cancels_active_request() {
    init_logging();
    let (engine, gate) = GatedEngine::new(2, vec![]);
    let (dispatcher, _receivers) = Dispatcher::new(test_config(), engine).unwrap();
    let dispatcher = Arc::new(dispatcher);
    dispatcher.on_frame(frame());

    assert!(!dispatcher.preempt_check());
    let handle = dispatcher.request_check();
    gate.started.recv_timeout(GATE_TIMEOUT).unwrap();
    assert!(dispatcher.preempt_check());
    gate.release.send(()).unwrap();
    assert_eq!(handle.wait(), CheckOutcome::Preempted);

    // The protocol is idle again and accepts a fresh request.
    let handle = dispatcher.request_check();
    gate.started.recv_timeout(GATE_TIMEOUT).unwrap();
    gate.release.send(()).unwrap();
    let outcome = handle.wait();
    assert!(outcome.is_succeeded());
    assert!(outcome.bounding_boxes().unwrap().is_empty());
}

#[test]
fn ingestion_and_cycle_during_check() {
    init_logging();
    let config = DispatchConfig {
        point_cloud_sources: 1,
        ..test_config()
    };
    let (engine, gate) = GatedEngine::new(2, vec![detection(1, 0.9, 10., 10., 50., 50.)]);
    let (dispatcher, _receivers) = Dispatcher::new(config, engine).unwrap();
    let dispatcher = Arc::new(dispatcher);
    let robot1 = SourceId::new(1).unwrap();

    assert_eq!(dispatcher.on_frame(frame()), 1);
    let handle = dispatcher.request_check();
    gate.started.recv_timeout(GATE_TIMEOUT).unwrap();

    // Ingestion does not wait on the running inference.
    assert_eq!(dispatcher.on_frame(frame()), 2);
    let cloud = SourceCloud::organized(10, 10, vec![PointXYZ::new(0., 0., 1.); 100]).unwrap();
    assert!(dispatcher.on_cloud(robot1, cloud));

    let cycle = {
        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || dispatcher.run_cycle())
    };
    // The cycle waits for the engine while the check holds it.
    assert!(gate.started.recv_timeout(Duration::from_millis(100)).is_err());

    gate.release.send(()).unwrap();
    let outcome = handle.wait();
    assert_eq!(outcome.bounding_boxes().unwrap().frame_seq, 1);

    gate.started.recv_timeout(GATE_TIMEOUT).unwrap();
    gate.release.send(()).unwrap();
    let report = cycle.join().unwrap().unwrap().unwrap();
    assert_eq!(report.frame_seq, 2);
    assert_eq!(report.fused_sources, vec![robot1]);
}

#[test]
fn check_without_frame_aborts() {
    init_logging();
    let engine = ScriptedEngine::new(2, vec![]);
    let calls = engine.calls();
    let (dispatcher, _receivers) = Dispatcher::new(test_config(), engine).unwrap();

    let outcome = dispatcher.check_for_objects();
    assert!(matches!(outcome, CheckOutcome::Aborted(_)));
    assert_eq!(outcome.as_str(), "aborted");
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(!dispatcher.is_checking_for_objects());
}

#[test]
fn engine_error_aborts() {
    init_logging();
    let (dispatcher, _receivers) = Dispatcher::new(test_config(), ScriptedEngine::failing(2)).unwrap();
    dispatcher.on_frame(frame());

    match dispatcher.check_for_objects() {
        CheckOutcome::Aborted(reason) => assert!(reason.contains("engine failure")),
        other => panic!("expected aborted, got {:?}", other),
    }
    assert!(!dispatcher.is_checking_for_objects());
}
