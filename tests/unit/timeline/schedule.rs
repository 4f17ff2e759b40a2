use super::*;
use serde_json::json;

fn samples(n: usize) -> Vec<ReplaySample> {
    (0..n)
        .map(|i| {
            serde_json::from_value(json!({
                "timestamp": i as u64 * 3000,
                "agents": [{"name": "PHANTOM", "x": i as f64, "z": -(i as f64)}],
                "projectiles": [{"x": 0.5, "z": 0.5, "weapon": "rocket"}]
            }))
            .unwrap()
        })
        .collect()
}

fn replay(n: usize) -> Replay {
    Replay {
        frames: samples(n),
        ..Replay::default()
    }
}

fn collect<'a>(sched: TimelineScheduler<'a>) -> Vec<FrameDescriptor<'a>> {
    sched.map(|d| d.unwrap()).collect()
}

fn battle<'a>(d: &FrameDescriptor<'a>) -> Option<BattleFrame<'a>> {
    match d.kind {
        FrameKind::Battle(b) => Some(b),
        _ => None,
    }
}

#[test]
fn empty_replay_reports_missing_data() {
    let r = replay(0);
    let index = EventIndex::default();
    let err = TimelineScheduler::new(&r, &index, &ScheduleConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, RecapError::MissingData(_)));
}

#[test]
fn total_frame_count_is_exact() {
    let cfg = ScheduleConfig::default();
    for n in [1usize, 2, 7] {
        let r = replay(n);
        let index = EventIndex::default();
        let sched = TimelineScheduler::new(&r, &index, &cfg).unwrap();
        let expected = 90 + 45 * n as u64 + 120;
        assert_eq!(sched.total_frames(), expected);
        assert_eq!(sched.len() as u64, expected);

        let frames = collect(sched);
        assert_eq!(frames.len() as u64, expected);
        for (i, d) in frames.iter().enumerate() {
            assert_eq!(d.index, FrameIndex(i as u64));
            assert_eq!(d.total, expected);
        }
    }
}

#[test]
fn segments_appear_in_order() {
    let r = replay(2);
    let index = EventIndex::default();
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    assert!(matches!(frames[0].kind, FrameKind::Intro(_)));
    assert!(matches!(frames[89].kind, FrameKind::Intro(_)));
    assert!(matches!(frames[90].kind, FrameKind::Battle(_)));
    assert!(matches!(frames[179].kind, FrameKind::Battle(_)));
    assert!(matches!(frames[180].kind, FrameKind::Outro(_)));
    assert!(matches!(frames[299].kind, FrameKind::Outro(_)));
}

#[test]
fn intro_and_outro_fades_ramp_independently() {
    let r = replay(1);
    let index = EventIndex::default();
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    let FrameKind::Intro(first) = frames[0].kind else {
        panic!("expected intro");
    };
    assert_eq!(first.fade, 0.0);
    let FrameKind::Intro(mid) = frames[18].kind else {
        panic!("expected intro");
    };
    assert!((mid.fade - 0.5).abs() < 1e-9);
    let FrameKind::Intro(ramped) = frames[36].kind else {
        panic!("expected intro");
    };
    assert_eq!(ramped.fade, 1.0);

    let FrameKind::Outro(outro) = frames[135 + 30].kind else {
        panic!("expected outro");
    };
    assert_eq!(outro.frame, 30);
    assert!((outro.fade - 0.5).abs() < 1e-9);
}

#[test]
fn hold_frames_repeat_the_same_sample() {
    let r = replay(3);
    let index = EventIndex::default();
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    let battles: Vec<_> = frames.iter().filter_map(battle).collect();
    assert_eq!(battles.len(), 3 * 45);
    for run in battles.chunks(45) {
        let first = run[0];
        for (hi, b) in run.iter().enumerate() {
            assert_eq!(b.hold_index as usize, hi);
            assert_eq!(b.sample_index, first.sample_index);
            assert!(std::ptr::eq(b.sample, first.sample));
            assert_eq!(b.sample.agents, first.sample.agents);
            assert_eq!(b.sample.projectiles, first.sample.projectiles);
        }
    }
}

#[test]
fn decision_captions_gate_at_eighty_percent_of_hold() {
    let mut r = replay(8);
    r.combat_log = vec![
        json!({"type": "decision", "tick": 5, "actor": "A", "detail": "one"}),
        json!({"type": "decision", "tick": 5, "actor": "B", "detail": "two"}),
        json!({"type": "decision", "tick": 5, "actor": "C", "detail": "three"}),
    ];
    let (index, _) = EventIndex::build(&r);
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    let run: Vec<_> = frames
        .iter()
        .filter_map(battle)
        .filter(|b| b.sample_index == 5)
        .collect();
    assert_eq!(run.len(), 45);
    for b in &run[..36] {
        let actors: Vec<_> = b.decisions.iter().map(|d| d.actor.as_str()).collect();
        assert_eq!(actors, vec!["A", "B"]);
    }
    for b in &run[36..] {
        assert!(b.decisions.is_empty());
    }

    // Earlier samples have no captions; later ones keep the persisted set.
    assert!(
        frames
            .iter()
            .filter_map(battle)
            .filter(|b| b.sample_index < 5)
            .all(|b| b.decisions.is_empty())
    );
    let next = frames
        .iter()
        .filter_map(battle)
        .find(|b| b.sample_index == 6)
        .unwrap();
    assert_eq!(next.decisions.len(), 2);
}

#[test]
fn highlight_banner_gates_at_seventy_percent_of_hold() {
    let mut r = replay(2);
    r.highlights = vec![json!({"timestamp": 0, "duration": 10000, "type": "first_blood"})];
    let (index, _) = EventIndex::build(&r);
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    let run: Vec<_> = frames
        .iter()
        .filter_map(battle)
        .filter(|b| b.sample_index == 0)
        .collect();
    assert!(run[..32].iter().all(|b| b.highlight.is_some()));
    assert!(run[32..].iter().all(|b| b.highlight.is_none()));
}

#[test]
fn at_most_one_highlight_and_no_flicker_after_window() {
    let mut r = replay(12);
    r.highlights = vec![
        json!({"timestamp": 2000, "duration": 4000, "title": "a"}),
        json!({"timestamp": 4000, "duration": 3000, "title": "b"}),
    ];
    let (index, _) = EventIndex::build(&r);
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    for b in frames.iter().filter_map(battle) {
        if let Some(hl) = b.highlight {
            assert!(b.sample.timestamp < hl.window_end());
        }
    }
    let last_shown = frames
        .iter()
        .filter_map(battle)
        .filter(|b| b.highlight.is_some())
        .map(|b| b.sample_index)
        .max()
        .unwrap();
    assert!(last_shown <= 2);
}

#[test]
fn kill_flash_never_increases_outside_triggers() {
    let mut r = replay(10);
    r.events = vec![
        json!({"type": "kill", "timestamp": 6000}),
        json!({"type": "kill", "timestamp": 21000}),
    ];
    let (index, _) = EventIndex::build(&r);
    let frames = collect(TimelineScheduler::new(&r, &index, &ScheduleConfig::default()).unwrap());

    let battles: Vec<_> = frames.iter().filter_map(battle).collect();
    let mut saw_flash = false;
    for pair in battles.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b.hold_index != 0 {
            assert!(b.kill_flash <= a.kill_flash);
        }
        saw_flash |= a.kill_flash > 0;
    }
    assert!(saw_flash);
    // Trigger then one decay applied on the first hold frame.
    let first_triggered = battles.iter().find(|b| b.kill_flash > 0).unwrap();
    assert_eq!(first_triggered.kill_flash, 76);
    assert_eq!(first_triggered.hold_index, 0);
}

#[test]
fn stride_tick_mapping_spreads_decisions() {
    let mut r = replay(4);
    r.combat_log = vec![json!({"type": "decision", "tick": 1, "actor": "A", "detail": "x"})];
    let (index, _) = EventIndex::build(&r);
    let cfg = ScheduleConfig {
        tick_mapping: TickMapping::Stride {
            samples_per_tick: 2,
        },
        ..ScheduleConfig::default()
    };
    let frames = collect(TimelineScheduler::new(&r, &index, &cfg).unwrap());
    let first_with_caption = frames
        .iter()
        .filter_map(battle)
        .find(|b| !b.decisions.is_empty())
        .unwrap();
    assert_eq!(first_with_caption.sample_index, 2);
}

#[test]
fn invalid_config_is_rejected() {
    let r = replay(1);
    let index = EventIndex::default();
    let cfg = ScheduleConfig {
        hold_frames: 0,
        ..ScheduleConfig::default()
    };
    assert!(TimelineScheduler::new(&r, &index, &cfg).is_err());

    let cfg = ScheduleConfig {
        tick_mapping: TickMapping::Timestamp { ms_per_tick: 0 },
        ..ScheduleConfig::default()
    };
    assert!(TimelineScheduler::new(&r, &index, &cfg).is_err());
}

#[test]
fn schedule_config_parses_partial_json() {
    let cfg: ScheduleConfig = serde_json::from_value(json!({
        "hold_frames": 10,
        "tick_mapping": {"mode": "timestamp", "ms_per_tick": 1000},
        "tracker": {"flash_peak": 120}
    }))
    .unwrap();
    assert_eq!(cfg.hold_frames, 10);
    assert_eq!(cfg.intro_secs, 3);
    assert_eq!(cfg.tracker.flash_peak, 120);
    assert_eq!(cfg.tracker.flash_decay, 4);
    assert_eq!(
        cfg.tick_mapping,
        TickMapping::Timestamp { ms_per_tick: 1000 }
    );
}
