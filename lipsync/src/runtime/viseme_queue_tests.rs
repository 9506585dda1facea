use crate::{DecayScope, EngineConfig, MorphTargets, QueueItem, VisemeMap, VisemeQueue};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn face() -> MorphTargets {
    MorphTargets::from_names([
        "viseme_sil",
        "viseme_PP",
        "viseme_AA",
        "viseme_TH",
        "viseme_O",
        "viseme_U",
        "eyeBlinkLeft",
    ])
}

#[test]
fn scripted_utterance_pops_on_schedule_and_replaces_active_shape() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();

    queue.reset(1000.0);
    assert!(queue.push_viseme(2, 100.0));
    assert!(queue.push_viseme(5, 250.0));
    assert!(queue.close());

    let report = queue.tick(1050.0, &mut morphs, &map);
    assert_eq!(report.popped, 0);
    assert!(morphs.is_at_rest());
    assert_eq!(queue.len(), 3);

    let report = queue.tick(1120.0, &mut morphs, &map);
    assert_eq!(report.popped, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(queue.active().index, Some(2));
    assert_approx(morphs.weight_by_name("viseme_AA").unwrap(), 0.5);

    let report = queue.tick(1260.0, &mut morphs, &map);
    assert_eq!(report.popped, 1);
    assert!(report.finished);
    assert!(queue.is_finished());
    assert!(queue.is_empty());
    assert_eq!(queue.active().index, Some(5));
    assert_approx(morphs.weight_by_name("viseme_U").unwrap(), 0.5);
    let first = morphs.weight_by_name("viseme_AA").unwrap();
    assert!(first < 0.5, "first shape should already be decaying, got {first}");
    assert_approx(first, 0.485);
}

#[test]
fn event_is_not_popped_before_its_offset() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(4, 100.0);

    assert_eq!(queue.tick(99.999, &mut morphs, &map).popped, 0);
    assert_eq!(queue.tick(100.0, &mut morphs, &map).popped, 1);
}

#[test]
fn events_drain_in_enqueue_order_and_newest_due_event_wins() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(500.0);
    queue.push_viseme(1, 10.0);
    queue.push_viseme(2, 20.0);
    queue.push_viseme(3, 20.0);
    queue.push_viseme(4, 30.0);

    let report = queue.tick(510.0, &mut morphs, &map);
    assert_eq!(report.popped, 1);
    assert_eq!(queue.active().index, Some(1));

    let report = queue.tick(520.0, &mut morphs, &map);
    assert_eq!(report.popped, 2);
    assert_eq!(queue.active().index, Some(3));

    let report = queue.tick(540.0, &mut morphs, &map);
    assert_eq!(report.popped, 1);
    assert_eq!(queue.active().index, Some(4));
    assert!(queue.is_empty());
}

#[test]
fn out_of_order_offsets_wait_behind_the_head() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(2, 200.0);
    queue.push_viseme(5, 100.0);

    assert_eq!(queue.tick(150.0, &mut morphs, &map).popped, 0);
    let report = queue.tick(200.0, &mut morphs, &map);
    assert_eq!(report.popped, 2);
    assert_eq!(queue.active().index, Some(5));
}

#[test]
fn unknown_viseme_ids_are_dropped_silently() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(99, 0.0);
    // Known id, but this mesh has no such morph target.
    queue.push_viseme(8, 0.0);

    let report = queue.tick(10.0, &mut morphs, &map);
    assert_eq!(report.popped, 2);
    assert_eq!(report.dropped, 2);
    assert_eq!(report.applied, 0);
    assert_eq!(queue.active().index, None);
    assert!(morphs.is_at_rest());
}

#[test]
fn empty_queue_tick_is_a_quiet_no_op() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();

    let report = queue.tick(12_345.0, &mut morphs, &map);
    assert_eq!(report.popped, 0);
    assert!(!report.finished);
    assert!(morphs.is_at_rest());
}

#[test]
fn active_shape_pulses_down_to_rest() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(2, 0.0);

    queue.tick(0.0, &mut morphs, &map);
    assert_approx(morphs.weight(2).unwrap(), 0.5);
    queue.tick(16.0, &mut morphs, &map);
    assert_approx(morphs.weight(2).unwrap(), 0.485);
    queue.tick(32.0, &mut morphs, &map);
    assert_approx(morphs.weight(2).unwrap(), 0.47);

    for frame in 3..40 {
        queue.tick(frame as f64 * 16.0, &mut morphs, &map);
    }
    assert_eq!(morphs.weight(2), Some(0.0));
    assert_eq!(queue.active().strength, 0.0);
}

#[test]
fn weights_reach_rest_within_frames_to_rest_after_reset() {
    let config = EngineConfig::default();
    let map = VisemeMap::default();
    let mut morphs = face();
    for i in 0..morphs.len() {
        morphs.set_weight(i, 1.0);
    }
    let mut queue = VisemeQueue::new(&config);
    queue.reset(0.0);
    queue.push_viseme(2, 0.0);
    queue.tick(0.0, &mut morphs, &map);

    queue.reset(100.0);
    let frames = config.frames_to_rest();
    assert_eq!(frames, 67);
    for frame in 0..frames {
        queue.tick(100.0 + frame as f64 * 16.0, &mut morphs, &map);
    }
    assert!(morphs.is_at_rest(), "weights: {:?}", morphs.weights());
}

#[test]
fn every_valid_step_reaches_rest_within_frames_to_rest() {
    let map = VisemeMap::default();
    for step in [0.01, 0.015, 0.02, 0.03, 0.07, 0.1, 0.3, 0.7, 1.0] {
        let config = EngineConfig {
            decay_step: step,
            viseme_strength: 1.0,
            ..EngineConfig::default()
        };
        let mut morphs = face();
        morphs.set_weight(3, 1.0);
        let mut queue = VisemeQueue::new(&config);
        queue.reset(0.0);
        queue.push_viseme(2, 0.0);

        let frames = config.frames_to_rest();
        for frame in 0..=frames {
            queue.tick(frame as f64 * 16.0, &mut morphs, &map);
        }
        assert!(
            morphs.is_at_rest(),
            "step {step}: weights after {frames} frames: {:?}",
            morphs.weights()
        );
        assert_eq!(queue.active().strength, 0.0, "step {step}");
    }
}

#[test]
fn non_finite_offset_does_not_block_the_queue() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(2, f64::INFINITY);
    queue.close();

    let report = queue.tick(0.0, &mut morphs, &map);
    assert_eq!(report.popped, 1);
    assert!(report.finished);
}

#[test]
fn decay_step_is_tunable() {
    let map = VisemeMap::default();
    let mut morphs = face();
    morphs.set_weight(3, 1.0);
    let mut queue = VisemeQueue::default();
    queue.set_decay_step(0.25).unwrap();
    assert!(queue.set_decay_step(0.0).is_err());
    assert!(queue.set_decay_step(f32::NAN).is_err());
    assert!(queue.set_strength(1.5).is_err());

    for _ in 0..3 {
        queue.tick(0.0, &mut morphs, &map);
    }
    assert_approx(morphs.weight(3).unwrap(), 0.25);
    queue.tick(0.0, &mut morphs, &map);
    assert_eq!(morphs.weight(3), Some(0.0));
}

#[test]
fn viseme_scope_leaves_other_channels_alone() {
    let map = VisemeMap::default();
    let mut config = EngineConfig::default();
    config.decay_scope = DecayScope::VisemeChannels;

    let mut morphs = face();
    morphs.set_weight_by_name("eyeBlinkLeft", 1.0).unwrap();
    morphs.set_weight_by_name("viseme_O", 1.0).unwrap();
    let mut queue = VisemeQueue::new(&config);
    queue.tick(0.0, &mut morphs, &map);
    assert_eq!(morphs.weight_by_name("eyeBlinkLeft"), Some(1.0));
    assert_approx(morphs.weight_by_name("viseme_O").unwrap(), 0.985);

    queue.set_decay_scope(DecayScope::AllChannels);
    queue.tick(0.0, &mut morphs, &map);
    assert_approx(morphs.weight_by_name("eyeBlinkLeft").unwrap(), 0.985);
}

#[test]
fn viseme_channel_set_is_reused_until_rebound() {
    let map = VisemeMap::default();
    let mut config = EngineConfig::default();
    config.decay_scope = DecayScope::VisemeChannels;

    let mut morphs = face();
    morphs.set_weight_by_name("viseme_O", 1.0).unwrap();
    let mut queue = VisemeQueue::new(&config);
    queue.bind_channels(&VisemeMap::empty(), &morphs);

    // The bound set is empty, so the map passed per frame is not consulted.
    queue.tick(0.0, &mut morphs, &map);
    assert_eq!(morphs.weight_by_name("viseme_O"), Some(1.0));

    queue.bind_channels(&map, &morphs);
    queue.tick(16.0, &mut morphs, &map);
    assert_approx(morphs.weight_by_name("viseme_O").unwrap(), 0.985);
    assert_eq!(morphs.weight_by_name("eyeBlinkLeft"), Some(0.0));
}

#[test]
fn end_marker_closes_the_utterance_until_reset() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(2, 50.0);
    assert!(queue.close());
    assert!(queue.is_closed());
    assert!(!queue.push_viseme(3, 60.0));
    assert!(!queue.close());
    assert_eq!(queue.pending().last(), Some(&QueueItem::EndOfUtterance));

    // The marker waits behind the pending event.
    let report = queue.tick(10.0, &mut morphs, &map);
    assert!(!report.finished);
    let report = queue.tick(50.0, &mut morphs, &map);
    assert_eq!(report.popped, 1);
    assert!(report.finished);

    queue.reset(1000.0);
    assert!(!queue.is_closed());
    assert!(!queue.is_finished());
    assert_eq!(queue.active().index, None);
    assert_eq!(queue.clock().start_ms(), 1000.0);
    assert!(queue.push_viseme(3, 60.0));
}

#[test]
fn reset_discards_pending_events_of_the_previous_utterance() {
    let map = VisemeMap::default();
    let mut morphs = face();
    let mut queue = VisemeQueue::default();
    queue.reset(0.0);
    queue.push_viseme(2, 100.0);
    queue.push_viseme(3, 200.0);

    queue.reset(1000.0);
    assert!(queue.is_empty());
    let report = queue.tick(5000.0, &mut morphs, &map);
    assert_eq!(report.popped, 0);
    assert!(morphs.is_at_rest());
}
