use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::animation::ease::{Ease, resolve_easing};
use crate::animation::value::ParamValue;
use crate::foundation::error::ErrorCategory;
use crate::foundation::events::{EventSink, Notice, Severity, TracingEvents};

/// Two keyframe times closer than this are the same keyframe.
pub const TIME_EPSILON: f64 = 1e-4;

/// A `(time, value)` anchor for one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    /// Normalized time in `[0, 1]`.
    pub time: f64,
    /// Value at `time`.
    pub value: ParamValue,
    /// Curve leaving this keyframe toward the next one.
    pub ease: Ease,
}

/// Keyframes for one parameter, sorted ascending by time and unique within [`TIME_EPSILON`].
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterTimeline {
    param: String,
    keyframes: Vec<Keyframe>,
}

impl ParameterTimeline {
    fn new(param: &str) -> Self {
        Self {
            param: param.to_owned(),
            keyframes: Vec::new(),
        }
    }

    /// Parameter name.
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Keyframes, sorted by time.
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    fn closest_within_eps(&self, time: f64) -> Option<usize> {
        self.keyframes
            .iter()
            .enumerate()
            .map(|(i, k)| (i, (k.time - time).abs()))
            .filter(|(_, d)| *d <= TIME_EPSILON)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    fn sort(&mut self) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Value at normalized `time`, clamped to the first/last keyframe outside their span.
    fn sample(&self, time: f64) -> Option<ParamValue> {
        let first = self.keyframes.first()?;

        let mut before: Option<&Keyframe> = None;
        let mut after: Option<&Keyframe> = None;
        for k in &self.keyframes {
            if k.time <= time {
                before = Some(k);
            } else {
                after = Some(k);
                break;
            }
        }

        let Some(before) = before else {
            return Some(first.value.clone());
        };
        let Some(after) = after else {
            return Some(before.value.clone());
        };

        let span = after.time - before.time;
        if span <= 0.0 {
            return Some(before.value.clone());
        }
        let local_t = (time - before.time) / span;
        let eased_t = before.ease.apply(local_t);
        Some(ParamValue::blend(&before.value, &after.value, eased_t))
    }
}

/// What a timeline mutation did.
///
/// `param` is the parameter name; times are normalized.
#[derive(Clone, Debug, PartialEq)]
pub enum TimelineChange {
    /// A keyframe was inserted; the parameter may have been created.
    Added {
        /// Parameter name.
        param: String,
        /// Clamped keyframe time.
        time: f64,
    },
    /// A keyframe at the same time was overwritten.
    Replaced {
        /// Parameter name.
        param: String,
        /// Clamped keyframe time.
        time: f64,
    },
    /// A keyframe was removed; others remain.
    Removed {
        /// Parameter name.
        param: String,
        /// Time of the removed keyframe.
        time: f64,
    },
    /// The last keyframe was removed and the parameter entry deleted.
    Deleted {
        /// Parameter name.
        param: String,
    },
    /// A keyframe was moved and given a new value.
    Updated {
        /// Parameter name.
        param: String,
        /// Previous time.
        from: f64,
        /// New, clamped time.
        to: f64,
    },
    /// The easing leaving a keyframe changed.
    EasingChanged {
        /// Parameter name.
        param: String,
        /// Keyframe time.
        time: f64,
        /// New easing.
        ease: Ease,
    },
}

/// Per-parameter keyframe storage and interpolation.
#[derive(Clone)]
pub struct Timeline {
    params: BTreeMap<String, ParameterTimeline>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// Empty timeline reporting to `tracing`.
    pub fn new() -> Self {
        Self::with_events(Arc::new(TracingEvents))
    }

    /// Empty timeline reporting notices to `events`.
    pub fn with_events(events: Arc<dyn EventSink>) -> Self {
        Self {
            params: BTreeMap::new(),
            events,
        }
    }

    /// Whether `param` has at least one keyframe.
    pub fn has_keyframes(&self, param: &str) -> bool {
        self.params
            .get(param)
            .is_some_and(|p| !p.keyframes.is_empty())
    }

    /// Keyframes of `param`, sorted by time. Empty when not animated.
    pub fn keyframes(&self, param: &str) -> &[Keyframe] {
        self.params
            .get(param)
            .map(|p| p.keyframes())
            .unwrap_or(&[])
    }

    /// Animated parameter names, sorted.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Whether no parameter is animated.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Insert a linear keyframe. See [`Timeline::add_keyframe_with_ease`].
    pub fn add_keyframe(
        &mut self,
        param: &str,
        time: f64,
        value: impl Into<ParamValue>,
    ) -> TimelineChange {
        self.add_keyframe_with_ease(param, time, value, Ease::Linear)
    }

    /// Insert a keyframe at `time` (clamped to `[0, 1]`), replacing any keyframe within
    /// [`TIME_EPSILON`].
    pub fn add_keyframe_with_ease(
        &mut self,
        param: &str,
        time: f64,
        value: impl Into<ParamValue>,
        ease: Ease,
    ) -> TimelineChange {
        let time = clamp_time(time);
        let value = value.into();
        let entry = self
            .params
            .entry(param.to_owned())
            .or_insert_with(|| ParameterTimeline::new(param));

        if let Some(other) = entry
            .keyframes
            .iter()
            .find(|k| (k.time - time).abs() > TIME_EPSILON && k.value.kind() != value.kind())
        {
            self.events.notify(Notice::new(
                Severity::Debug,
                ErrorCategory::Validation,
                format!(
                    "'{param}' mixes {} and {} keyframes; values step between them",
                    other.value.kind(),
                    value.kind()
                ),
            ));
        }

        let before = entry.keyframes.len();
        entry
            .keyframes
            .retain(|k| (k.time - time).abs() > TIME_EPSILON);
        let replaced = entry.keyframes.len() != before;

        entry.keyframes.push(Keyframe { time, value, ease });
        entry.sort();

        let param = param.to_owned();
        if replaced {
            TimelineChange::Replaced { param, time }
        } else {
            TimelineChange::Added { param, time }
        }
    }

    /// Remove the keyframe closest to `time` within [`TIME_EPSILON`].
    ///
    /// Removing the last keyframe deletes the parameter entry.
    pub fn remove_keyframe(&mut self, param: &str, time: f64) -> Option<TimelineChange> {
        let entry = self.params.get_mut(param)?;
        let idx = entry.closest_within_eps(time)?;
        let removed = entry.keyframes.remove(idx);

        if entry.keyframes.is_empty() {
            self.params.remove(param);
            return Some(TimelineChange::Deleted {
                param: param.to_owned(),
            });
        }
        Some(TimelineChange::Removed {
            param: param.to_owned(),
            time: removed.time,
        })
    }

    /// Move the keyframe at `old_time` to `new_time` and give it `new_value`.
    ///
    /// Other keyframes within [`TIME_EPSILON`] of the new time are dropped. A missing keyframe is
    /// reported on the event sink and leaves the timeline untouched.
    pub fn update_keyframe(
        &mut self,
        param: &str,
        old_time: f64,
        new_time: f64,
        new_value: impl Into<ParamValue>,
    ) -> Option<TimelineChange> {
        let Some(idx) = self
            .params
            .get(param)
            .and_then(|p| p.closest_within_eps(old_time))
        else {
            self.events.notify(Notice::new(
                Severity::Info,
                ErrorCategory::Validation,
                format!("no keyframe for '{param}' at t={old_time:.4}; update ignored"),
            ));
            return None;
        };

        let entry = self.params.get_mut(param)?;
        let new_time = clamp_time(new_time);
        let mut moved = entry.keyframes.remove(idx);
        let from = moved.time;
        moved.time = new_time;
        moved.value = new_value.into();

        entry
            .keyframes
            .retain(|k| (k.time - new_time).abs() > TIME_EPSILON);
        entry.keyframes.push(moved);
        entry.sort();

        Some(TimelineChange::Updated {
            param: param.to_owned(),
            from,
            to: new_time,
        })
    }

    /// Change the easing leaving the keyframe at `time`.
    pub fn set_easing(&mut self, param: &str, time: f64, ease: Ease) -> Option<TimelineChange> {
        let entry = self.params.get_mut(param)?;
        let idx = entry.closest_within_eps(time)?;
        let k = &mut entry.keyframes[idx];
        k.ease = ease;
        Some(TimelineChange::EasingChanged {
            param: param.to_owned(),
            time: k.time,
            ease,
        })
    }

    /// Drop every keyframe of `param`.
    pub fn clear(&mut self, param: &str) -> Option<TimelineChange> {
        self.params
            .remove(param)
            .map(|_| TimelineChange::Deleted {
                param: param.to_owned(),
            })
    }

    /// Value of `param` at normalized `time`, or `fallback` when it is not animated.
    pub fn get_animated_value(&self, param: &str, time: f64, fallback: &ParamValue) -> ParamValue {
        self.params
            .get(param)
            .and_then(|p| p.sample(time))
            .unwrap_or_else(|| fallback.clone())
    }

    /// Every parameter in `defaults`, overlaid with animated values at `time`.
    ///
    /// Animated parameters without a default are included as well.
    pub fn sample_all(
        &self,
        time: f64,
        defaults: &BTreeMap<String, ParamValue>,
    ) -> BTreeMap<String, ParamValue> {
        let mut out = BTreeMap::new();
        for (name, fallback) in defaults {
            out.insert(name.clone(), self.get_animated_value(name, time, fallback));
        }
        for (name, p) in &self.params {
            if out.contains_key(name) {
                continue;
            }
            if let Some(v) = p.sample(time) {
                out.insert(name.clone(), v);
            }
        }
        out
    }

    /// Plain structural form for persistence and share links.
    pub fn to_snapshot(&self) -> TimelineSnapshot {
        self.params
            .iter()
            .map(|(name, p)| {
                let keys = p
                    .keyframes
                    .iter()
                    .map(|k| KeyframeSnapshot {
                        time: k.time,
                        value: k.value.clone(),
                        easing: k.ease.name().to_owned(),
                    })
                    .collect();
                (name.clone(), keys)
            })
            .collect()
    }

    /// Rebuild from a snapshot. Unknown easing names fall back to linear with a notice.
    pub fn from_snapshot(snapshot: &TimelineSnapshot, events: Arc<dyn EventSink>) -> Self {
        let mut timeline = Self::with_events(events);
        for (name, keys) in snapshot {
            for k in keys {
                let ease = resolve_easing(&k.easing, timeline.events.as_ref());
                timeline.add_keyframe_with_ease(name, k.time, k.value.clone(), ease);
            }
        }
        timeline
    }
}

fn clamp_time(time: f64) -> f64 {
    if time.is_nan() {
        0.0
    } else {
        time.clamp(0.0, 1.0)
    }
}

/// Serialized keyframe.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyframeSnapshot {
    /// Normalized time.
    pub time: f64,
    /// Untagged value.
    pub value: ParamValue,
    /// Easing name; unknown names load as linear.
    #[serde(default = "default_easing_name")]
    pub easing: String,
}

fn default_easing_name() -> String {
    Ease::Linear.name().to_owned()
}

/// Serialized timeline: parameter name to keyframes.
pub type TimelineSnapshot = BTreeMap<String, Vec<KeyframeSnapshot>>;

#[cfg(test)]
#[path = "../../tests/unit/animation/timeline.rs"]
mod tests;
