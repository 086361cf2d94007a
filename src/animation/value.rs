use crate::foundation::core::{Point, Vec2};

/// A keyframeable parameter value.
///
/// Serialized untagged, so snapshots stay plain JSON (`0.5`, `"hello"`, `true`,
/// `{"x":1,"y":2}`, `{"min":0,"max":1}`, `[{"x":0,"y":0}, ...]`).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// On/off switch; steps.
    Bool(bool),
    /// Scalar; blends linearly.
    Number(f64),
    /// Free text; steps.
    Text(String),
    /// 2D vector; blends per component.
    Vector(Vec2),
    /// Numeric interval; blends per bound.
    Range {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Control points; steps.
    Curve(Vec<Point>),
}

impl ParamValue {
    /// The number, if this is a [`ParamValue::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// The flag, if this is a [`ParamValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The text, if this is a [`ParamValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The vector, if this is a [`ParamValue::Vector`].
    pub fn as_vector(&self) -> Option<Vec2> {
        match self {
            Self::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// Short kind name, for notices.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
            Self::Range { .. } => "range",
            Self::Curve(_) => "curve",
        }
    }

    /// Blend from `a` toward `b` at eased progress `t`.
    ///
    /// Numeric kinds blend linearly when both ends share a kind. Everything else steps at the
    /// midpoint. `t` is not clamped, so overshooting easings overshoot numeric values too.
    pub fn blend(a: &Self, b: &Self, t: f64) -> Self {
        match (a, b) {
            (Self::Number(x), Self::Number(y)) => Self::Number(lerp(*x, *y, t)),
            (Self::Vector(x), Self::Vector(y)) => {
                Self::Vector(Vec2::new(lerp(x.x, y.x, t), lerp(x.y, y.y, t)))
            }
            (
                Self::Range {
                    min: a_min,
                    max: a_max,
                },
                Self::Range {
                    min: b_min,
                    max: b_max,
                },
            ) => Self::Range {
                min: lerp(*a_min, *b_min, t),
                max: lerp(*a_max, *b_max, t),
            },
            (
                Self::Bool(_)
                | Self::Text(_)
                | Self::Curve(_)
                | Self::Number(_)
                | Self::Vector(_)
                | Self::Range { .. },
                _,
            ) => step(a, b, t),
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn step(a: &ParamValue, b: &ParamValue, t: f64) -> ParamValue {
    if t < 0.5 { a.clone() } else { b.clone() }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec2> for ParamValue {
    fn from(v: Vec2) -> Self {
        Self::Vector(v)
    }
}
