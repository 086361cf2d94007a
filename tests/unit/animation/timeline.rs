use super::*;
use crate::foundation::events::NoticeLog;
use proptest::prelude::*;

fn fallback() -> ParamValue {
    ParamValue::Number(-1.0)
}

fn times(t: &Timeline, param: &str) -> Vec<f64> {
    t.keyframes(param).iter().map(|k| k.time).collect()
}

#[test]
fn linear_midpoint_and_clamping() {
    let mut t = Timeline::new();
    t.add_keyframe("size", 0.0, 0.0);
    t.add_keyframe("size", 1.0, 100.0);

    assert_eq!(
        t.get_animated_value("size", 0.5, &fallback()),
        ParamValue::Number(50.0)
    );
    assert_eq!(
        t.get_animated_value("size", -0.2, &fallback()),
        ParamValue::Number(0.0)
    );
    assert_eq!(
        t.get_animated_value("size", 1.5, &fallback()),
        ParamValue::Number(100.0)
    );
}

#[test]
fn unanimated_param_returns_fallback() {
    let t = Timeline::new();
    assert_eq!(t.get_animated_value("nope", 0.3, &fallback()), fallback());
}

#[test]
fn single_keyframe_holds_everywhere() {
    let mut t = Timeline::new();
    t.add_keyframe("hue", 0.4, 12.0);
    for q in [0.0, 0.4, 0.9] {
        assert_eq!(
            t.get_animated_value("hue", q, &fallback()),
            ParamValue::Number(12.0)
        );
    }
}

#[test]
fn add_at_existing_time_replaces() {
    let mut t = Timeline::new();
    assert!(matches!(
        t.add_keyframe("a", 0.5, 1.0),
        TimelineChange::Added { .. }
    ));
    assert!(matches!(
        t.add_keyframe("a", 0.50005, 2.0),
        TimelineChange::Replaced { .. }
    ));
    assert_eq!(t.keyframes("a").len(), 1);
    assert_eq!(t.keyframes("a")[0].value, ParamValue::Number(2.0));
}

#[test]
fn add_clamps_time_and_keeps_sorted() {
    let mut t = Timeline::new();
    t.add_keyframe("a", 0.7, 1.0);
    t.add_keyframe("a", -3.0, 0.0);
    t.add_keyframe("a", 0.2, 0.5);
    t.add_keyframe("a", 9.0, 2.0);
    assert_eq!(times(&t, "a"), vec![0.0, 0.2, 0.7, 1.0]);
}

#[test]
fn removing_last_keyframe_deletes_entry() {
    let mut t = Timeline::new();
    t.add_keyframe("a", 0.3, 1.0);
    assert!(t.has_keyframes("a"));
    assert_eq!(
        t.remove_keyframe("a", 0.30002),
        Some(TimelineChange::Deleted {
            param: "a".to_owned()
        })
    );
    assert!(!t.has_keyframes("a"));
    assert!(t.is_empty());
}

#[test]
fn remove_outside_epsilon_is_noop() {
    let mut t = Timeline::new();
    t.add_keyframe("a", 0.3, 1.0);
    t.add_keyframe("a", 0.6, 1.0);
    assert_eq!(t.remove_keyframe("a", 0.31), None);
    assert!(matches!(
        t.remove_keyframe("a", 0.6),
        Some(TimelineChange::Removed { .. })
    ));
    assert_eq!(times(&t, "a"), vec![0.3]);
}

#[test]
fn update_moves_and_resorts() {
    let mut t = Timeline::new();
    t.add_keyframe("a", 0.1, 1.0);
    t.add_keyframe("a", 0.5, 2.0);
    t.add_keyframe("a", 0.9, 3.0);

    let change = t.update_keyframe("a", 0.1, 0.95, 4.0);
    assert_eq!(
        change,
        Some(TimelineChange::Updated {
            param: "a".to_owned(),
            from: 0.1,
            to: 0.95
        })
    );
    assert_eq!(times(&t, "a"), vec![0.5, 0.9, 0.95]);
    assert_eq!(t.keyframes("a")[2].value, ParamValue::Number(4.0));
}

#[test]
fn update_onto_existing_time_keeps_times_unique() {
    let mut t = Timeline::new();
    t.add_keyframe("a", 0.1, 1.0);
    t.add_keyframe("a", 0.5, 2.0);
    t.update_keyframe("a", 0.1, 0.5, 9.0);
    assert_eq!(t.keyframes("a").len(), 1);
    assert_eq!(t.keyframes("a")[0].value, ParamValue::Number(9.0));
}

#[test]
fn update_missing_keyframe_notifies() {
    let log = Arc::new(NoticeLog::new());
    let mut t = Timeline::with_events(log.clone());
    t.add_keyframe("a", 0.1, 1.0);
    assert_eq!(t.update_keyframe("a", 0.4, 0.5, 2.0), None);
    assert_eq!(t.update_keyframe("b", 0.1, 0.5, 2.0), None);
    assert_eq!(log.notices().len(), 2);
    assert_eq!(times(&t, "a"), vec![0.1]);
}

#[test]
fn mixing_value_kinds_notifies_once_per_add() {
    let log = Arc::new(NoticeLog::new());
    let mut t = Timeline::with_events(log.clone());
    t.add_keyframe("a", 0.0, 1.0);
    t.add_keyframe("a", 0.0, 2.0);
    assert!(log.notices().is_empty());

    t.add_keyframe("a", 1.0, "late");
    let notices = log.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Debug);
    assert!(notices[0].message.contains("number and text"));
    assert_eq!(
        t.get_animated_value("a", 0.6, &fallback()),
        ParamValue::from("late")
    );

    // Replacing the only keyframe at a time is not a mix.
    t.add_keyframe("b", 0.5, 1.0);
    t.add_keyframe("b", 0.5, true);
    assert_eq!(log.notices().len(), 1);
}

#[test]
fn easing_of_left_keyframe_shapes_segment() {
    let mut t = Timeline::new();
    t.add_keyframe_with_ease("a", 0.0, 0.0, Ease::InQuad);
    t.add_keyframe("a", 1.0, 100.0);
    assert_eq!(
        t.get_animated_value("a", 0.5, &fallback()),
        ParamValue::Number(25.0)
    );

    t.set_easing("a", 0.0, Ease::Linear);
    assert_eq!(
        t.get_animated_value("a", 0.5, &fallback()),
        ParamValue::Number(50.0)
    );
}

#[test]
fn text_steps_at_eased_midpoint() {
    let mut t = Timeline::new();
    t.add_keyframe("label", 0.0, "start");
    t.add_keyframe("label", 1.0, "end");
    assert_eq!(
        t.get_animated_value("label", 0.49, &fallback()),
        ParamValue::from("start")
    );
    assert_eq!(
        t.get_animated_value("label", 0.5, &fallback()),
        ParamValue::from("end")
    );
}

#[test]
fn overshooting_ease_shifts_text_step() {
    // OutBack crosses 0.5 well before linear time does.
    let mut t = Timeline::new();
    t.add_keyframe_with_ease("label", 0.0, "start", Ease::OutBack);
    t.add_keyframe("label", 1.0, "end");
    assert_eq!(
        t.get_animated_value("label", 0.3, &fallback()),
        ParamValue::from("end")
    );
}

#[test]
fn sample_all_overlays_defaults() {
    let mut t = Timeline::new();
    t.add_keyframe("speed", 0.0, 1.0);
    t.add_keyframe("speed", 1.0, 3.0);
    t.add_keyframe("extra", 0.0, true);

    let mut defaults = BTreeMap::new();
    defaults.insert("speed".to_owned(), ParamValue::Number(0.0));
    defaults.insert("count".to_owned(), ParamValue::Number(12.0));

    let out = t.sample_all(0.5, &defaults);
    assert_eq!(out["speed"], ParamValue::Number(2.0));
    assert_eq!(out["count"], ParamValue::Number(12.0));
    assert_eq!(out["extra"], ParamValue::Bool(true));
}

#[test]
fn snapshot_round_trip_and_unknown_easing() {
    let mut t = Timeline::new();
    t.add_keyframe_with_ease("a", 0.0, 0.0, Ease::OutElastic);
    t.add_keyframe("a", 1.0, 10.0);
    let snap = t.to_snapshot();
    assert_eq!(snap["a"][0].easing, "out_elastic");

    let log = Arc::new(NoticeLog::new());
    let back = Timeline::from_snapshot(&snap, log.clone());
    assert_eq!(back.keyframes("a"), t.keyframes("a"));
    assert!(log.notices().is_empty());

    let mut bad = snap.clone();
    bad.get_mut("a").unwrap()[0].easing = "wiggle".to_owned();
    let back = Timeline::from_snapshot(&bad, log.clone());
    assert_eq!(back.keyframes("a")[0].ease, Ease::Linear);
    assert_eq!(log.notices().len(), 1);
}

#[derive(Clone, Debug)]
enum Op {
    Add(f64, f64),
    Remove(f64),
    Update(f64, f64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-0.5f64..1.5, -10.0f64..10.0).prop_map(|(t, v)| Op::Add(t, v)),
        (0.0f64..1.0).prop_map(Op::Remove),
        (0.0f64..1.0, 0.0f64..1.0).prop_map(|(a, b)| Op::Update(a, b)),
    ]
}

proptest! {
    #[test]
    fn keyframes_stay_sorted_and_unique(ops in proptest::collection::vec(op(), 1..40)) {
        let mut t = Timeline::with_events(Arc::new(NoticeLog::new()));
        for op in ops {
            match op {
                Op::Add(time, v) => {
                    t.add_keyframe("p", time, v);
                }
                Op::Remove(time) => {
                    t.remove_keyframe("p", time);
                }
                Op::Update(from, to) => {
                    t.update_keyframe("p", from, to, 1.0);
                }
            }
            let ts = times(&t, "p");
            for w in ts.windows(2) {
                prop_assert!(w[1] - w[0] > TIME_EPSILON);
            }
            for time in &ts {
                prop_assert!((0.0..=1.0).contains(time));
            }
            prop_assert_eq!(t.has_keyframes("p"), !ts.is_empty());
        }
    }
}
