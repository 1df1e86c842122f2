use std::fmt;

/// Three-component vector used for locations, euler rotations and scales.
///
/// Serialized as a plain `[x, y, z]` sequence so plan documents stay terse.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Component-wise product.
    pub fn mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Value written into a material node parameter.
///
/// Scalars are broadcast across every component when the target parameter is a vector.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum NodeValue {
    Bool(bool),
    Scalar(f64),
    Vector(Vec<f64>),
}

impl NodeValue {
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Bool(_) => true,
            Self::Scalar(v) => v.is_finite(),
            Self::Vector(vs) => vs.iter().all(|v| v.is_finite()),
        }
    }

    /// Coerce `self` into the shape of `current`, the parameter's existing value.
    pub fn coerce_like(&self, current: &NodeValue) -> Option<NodeValue> {
        match (self, current) {
            (Self::Scalar(v), Self::Scalar(_)) => Some(Self::Scalar(*v)),
            (Self::Bool(b), Self::Scalar(_)) => Some(Self::Scalar(if *b { 1.0 } else { 0.0 })),
            (Self::Bool(b), Self::Bool(_)) => Some(Self::Bool(*b)),
            (Self::Scalar(v), Self::Bool(_)) => Some(Self::Bool(*v != 0.0)),
            (Self::Scalar(v), Self::Vector(cur)) => Some(Self::Vector(vec![*v; cur.len()])),
            (Self::Vector(vs), Self::Vector(cur)) if vs.len() == cur.len() => {
                Some(Self::Vector(vs.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Vector(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Turn an arbitrary variation name into a file stem that is safe on every common filesystem.
///
/// Path separators, reserved punctuation and control characters become `_`; trailing dots and
/// spaces are dropped. Never returns an empty string.
pub fn sanitize_file_stem(name: &str) -> String {
    const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let mapped: String = name
        .trim()
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = mapped.trim_end_matches(['.', ' ']);
    match trimmed {
        "" | "." | ".." => "_".to_string(),
        s => s.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
