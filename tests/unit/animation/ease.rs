use super::*;
use crate::foundation::events::NoticeLog;
use proptest::prelude::*;

#[test]
fn endpoints_are_exact() {
    for ease in Ease::ALL {
        assert!((ease.apply(0.0) - 0.0).abs() < 1e-5, "{ease} at 0");
        assert!((ease.apply(1.0) - 1.0).abs() < 1e-5, "{ease} at 1");
    }
}

#[test]
fn inputs_are_clamped() {
    for ease in Ease::ALL {
        assert_eq!(ease.apply(-3.0), ease.apply(0.0));
        assert_eq!(ease.apply(7.5), ease.apply(1.0));
    }
    assert_eq!(Ease::Linear.apply(f64::NAN), 0.0);
}

#[test]
fn back_and_elastic_overshoot() {
    assert!(Ease::InBack.apply(0.2) < 0.0);
    assert!(Ease::OutBack.apply(0.8) > 1.0);
    assert!(Ease::OutElastic.apply(0.1) > 1.0);
    assert!(Ease::InElastic.apply(0.9) < 0.0);
}

#[test]
fn monotonic_spot_check() {
    for ease in [
        Ease::Linear,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InSine,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::InExpo,
        Ease::OutExpo,
    ] {
        let a = ease.apply(0.25);
        let b = ease.apply(0.5);
        let c = ease.apply(0.75);
        assert!(a < b, "{ease}");
        assert!(b < c, "{ease}");
    }
}

#[test]
fn names_round_trip() {
    for ease in Ease::ALL {
        assert_eq!(Ease::from_name(ease.name()), Some(ease));
        let json = serde_json::to_string(&ease).unwrap();
        assert_eq!(json, format!("\"{}\"", ease.name()));
    }
    assert_eq!(Ease::from_name("wobble"), None);
}

#[test]
fn unknown_name_falls_back_to_linear_with_notice() {
    let log = NoticeLog::new();
    assert_eq!(apply_easing("wobble", 0.3, &log), 0.3);
    let notices = log.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Debug);
    assert_eq!(notices[0].category, ErrorCategory::Validation);

    assert_eq!(apply_easing("in_quad", 0.5, &log), 0.25);
    assert_eq!(log.notices().len(), 1);
}

proptest! {
    #[test]
    fn out_of_range_inputs_match_endpoints(t in -100.0f64..100.0) {
        for ease in Ease::ALL {
            let v = ease.apply(t);
            if t <= 0.0 {
                prop_assert_eq!(v, 0.0);
            } else if t >= 1.0 {
                prop_assert_eq!(v, 1.0);
            } else {
                prop_assert!(v.is_finite());
            }
        }
    }
}
