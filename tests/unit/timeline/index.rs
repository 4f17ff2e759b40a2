use super::*;
use serde_json::json;

fn replay_with(highlights: Vec<Value>, events: Vec<Value>, combat_log: Vec<Value>) -> Replay {
    Replay {
        highlights,
        events,
        combat_log,
        ..Replay::default()
    }
}

#[test]
fn duplicate_highlight_timestamps_keep_last_record() {
    let (map, report) = index_highlights(&[
        json!({"timestamp": 6000, "title": "first"}),
        json!({"timestamp": 6000, "title": "second"}),
    ]);
    assert_eq!(map.len(), 1);
    assert_eq!(map[&6000].title, "second");
    assert_eq!(report.accepted, 2);
}

#[test]
fn malformed_records_are_counted_not_fatal() {
    let replay = replay_with(
        vec![json!({"title": "no ts"}), json!({"timestamp": 1000})],
        vec![
            json!({"type": "kill"}),
            json!({"type": "kill", "timestamp": 500}),
            json!({"type": "spawn", "timestamp": 10}),
        ],
        vec![
            json!({"type": "decision", "actor": "TITAN"}),
            json!({"type": "decision", "tick": 2, "actor": "TITAN"}),
        ],
    );
    let (index, report) = EventIndex::build(&replay);
    assert_eq!(index.highlight_count(), 1);
    assert_eq!(index.kill_count(), 1);
    assert_eq!(report.highlights.skipped, 1);
    assert_eq!(report.kills.skipped, 1);
    assert_eq!(report.kills.accepted, 1);
    assert_eq!(report.decisions.skipped, 1);
    assert_eq!(report.skipped_total(), 3);
    assert_eq!(index.decisions_at(2).map(<[_]>::len), Some(1));
}

#[test]
fn decisions_keep_log_order_per_tick() {
    let (map, _) = index_decisions(&[
        json!({"type": "decision", "tick": 5, "actor": "A", "detail": "one"}),
        json!({"type": "decision", "tick": 7, "actor": "B", "detail": "other"}),
        json!({"type": "decision", "tick": 5, "actor": "C", "detail": "two"}),
    ]);
    let at5: Vec<_> = map[&5].iter().map(|d| d.rationale.as_str()).collect();
    assert_eq!(at5, vec!["one", "two"]);
}

#[test]
fn kills_are_sorted_and_window_is_strict() {
    let replay = replay_with(
        vec![],
        vec![
            json!({"type": "kill", "timestamp": 20000}),
            json!({"type": "kill", "timestamp": 9000}),
        ],
        vec![],
    );
    let (index, _) = EventIndex::build(&replay);
    assert!(index.kill_near(9000, 3000));
    assert!(index.kill_near(11999, 3000));
    assert!(!index.kill_near(12000, 3000));
    assert!(index.kill_near(6001, 3000));
    assert!(!index.kill_near(6000, 3000));
    assert!(index.kill_near(18000, 3000));
    assert!(!index.kill_near(9000, 0));
}

#[test]
fn highlights_near_scans_oldest_start_first() {
    let replay = replay_with(
        vec![
            json!({"timestamp": 8000, "title": "late"}),
            json!({"timestamp": 1000, "title": "early"}),
            json!({"timestamp": 30000, "title": "far"}),
        ],
        vec![],
        vec![],
    );
    let (index, _) = EventIndex::build(&replay);
    let titles: Vec<_> = index
        .highlights_near(4000, 5000)
        .map(|h| h.title.as_str())
        .collect();
    assert_eq!(titles, vec!["early", "late"]);
    assert_eq!(index.highlights_near(0, 1000).count(), 0);
}
