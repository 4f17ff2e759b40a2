use super::*;
use crate::foundation::core::{FrameIndex, Fps};
use crate::replay::model::{ProjectileState, Replay, RosterAgent};
use crate::timeline::index::EventIndex;
use crate::timeline::schedule::{ScheduleConfig, TimelineScheduler};

fn small_opts() -> CpuRasterOpts {
    CpuRasterOpts {
        canvas: Canvas {
            width: 160,
            height: 90,
        },
        ..CpuRasterOpts::default()
    }
}

fn agent(name: &str, x: f64, alive: bool) -> AgentState {
    serde_json::from_value(serde_json::json!({
        "name": name, "x": x, "z": 0.0, "isAlive": alive, "health": 60.0, "kills": 1
    }))
    .unwrap()
}

fn sample() -> ReplaySample {
    ReplaySample {
        timestamp: 0,
        agents: vec![agent("PHANTOM", -10.0, true), agent("TITAN", 10.0, false)],
        projectiles: vec![ProjectileState {
            x: 0.0,
            z: 5.0,
            weapon: "plasma".to_owned(),
        }],
    }
}

fn battle<'a>(s: &'a ReplaySample, kill_flash: u8) -> FrameDescriptor<'a> {
    FrameDescriptor {
        index: FrameIndex(5),
        total: 10,
        kind: FrameKind::Battle(BattleFrame {
            sample_index: 0,
            sample_count: 1,
            hold_index: 0,
            sample: s,
            highlight: None,
            kill_flash,
            decisions: &[],
        }),
    }
}

#[test]
fn battle_frame_matches_canvas_and_is_opaque() {
    let mut r = SchematicRasterizer::new(small_opts(), Arc::new(Palette::default())).unwrap();
    let s = sample();
    let frame = r.render(&battle(&s, 0)).unwrap();
    frame.check_canvas(r.canvas()).unwrap();
    assert!(frame.premultiplied);
    assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn rendering_is_deterministic() {
    let mut r = SchematicRasterizer::new(small_opts(), Arc::new(Palette::default())).unwrap();
    let s = sample();
    let a = r.render(&battle(&s, 40)).unwrap();
    let b = r.render(&battle(&s, 40)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn kill_flash_tints_the_frame() {
    let mut r = SchematicRasterizer::new(small_opts(), Arc::new(Palette::default())).unwrap();
    let s = sample();
    let calm = r.render(&battle(&s, 0)).unwrap();
    let flash = r.render(&battle(&s, 80)).unwrap();
    assert_ne!(calm.data, flash.data);

    // The flash color is red, so the top-left pixel gains red.
    assert!(flash.data[0] > calm.data[0]);
}

#[test]
fn every_scheduled_frame_renders() {
    let replay = Replay {
        agents: vec![RosterAgent {
            name: "PHANTOM".to_owned(),
            color: Some("#ff3366".to_owned()),
        }],
        mvp_name: "PHANTOM".to_owned(),
        frames: vec![sample(), ReplaySample { timestamp: 2000, ..sample() }],
        highlights: vec![serde_json::json!({
            "timestamp": 0, "type": "first_blood", "title": "FIRST BLOOD"
        })],
        ..Replay::default()
    };
    let (index, _) = EventIndex::build(&replay);
    let cfg = ScheduleConfig {
        fps: Fps::new(4, 1).unwrap(),
        intro_secs: 1,
        outro_secs: 1,
        hold_frames: 3,
        ..ScheduleConfig::default()
    };
    let mut r = SchematicRasterizer::new(small_opts(), Arc::new(Palette::default())).unwrap();
    let mut n = 0;
    for desc in TimelineScheduler::new(&replay, &index, &cfg).unwrap() {
        let frame = r.render(&desc.unwrap()).unwrap();
        assert_eq!(frame.data.len(), 160 * 90 * 4);
        n += 1;
    }
    assert_eq!(n, 4 + 6 + 4);
}

#[test]
fn rejects_degenerate_options() {
    let palette = Arc::new(Palette::default());
    let zero = CpuRasterOpts {
        canvas: Canvas {
            width: 0,
            height: 90,
        },
        ..CpuRasterOpts::default()
    };
    assert!(SchematicRasterizer::new(zero, palette.clone()).is_err());

    let flat = CpuRasterOpts {
        arena_size: 0.0,
        ..small_opts()
    };
    assert!(SchematicRasterizer::new(flat, palette).is_err());
}
