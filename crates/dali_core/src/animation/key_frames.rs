//! Key-frame tracks for animators.

use crate::property::{PropertyError, PropertyType, PropertyValue};

/// Interpolation between key frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Straight lines between frames
    #[default]
    Linear,
    /// Catmull-Rom spline through the frames (numeric types only)
    Cubic,
}

/// Values at progress points, sorted by progress
#[derive(Debug, Clone)]
pub struct KeyFrames {
    property_type: Option<PropertyType>,
    frames: Vec<(f32, PropertyValue)>,
}

impl Default for KeyFrames {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFrames {
    /// Empty track
    pub const fn new() -> Self {
        Self { property_type: None, frames: Vec::new() }
    }

    /// Add a frame; every frame must have the type of the first
    pub fn add(&mut self, progress: f32, value: PropertyValue) -> Result<(), PropertyError> {
        let found = value.property_type();
        match self.property_type {
            Some(expected) if expected != found => return Err(PropertyError::TypeMismatch { expected, found }),
            _ => self.property_type = Some(found),
        }
        let progress = progress.clamp(0.0, 1.0);
        let at = self.frames.partition_point(|(p, _)| *p <= progress);
        self.frames.insert(at, (progress, value));
        Ok(())
    }

    /// Builder form of [`add`](Self::add)
    pub fn with(mut self, progress: f32, value: impl Into<PropertyValue>) -> Result<Self, PropertyError> {
        self.add(progress, value.into())?;
        Ok(self)
    }

    /// Type of the frames, once one was added
    pub const fn property_type(&self) -> Option<PropertyType> {
        self.property_type
    }

    /// True once progress reaches the first frame
    pub fn is_active(&self, progress: f32) -> bool {
        self.frames.first().is_some_and(|(p, _)| progress >= *p)
    }

    /// Value at `progress`
    pub fn value(&self, progress: f32, interpolation: Interpolation) -> Option<PropertyValue> {
        let last = self.frames.len().checked_sub(1)?;
        let next = self.frames.partition_point(|(p, _)| *p <= progress);
        if next == 0 {
            return Some(self.frames[0].1);
        }
        if next > last {
            return Some(self.frames[last].1);
        }

        let (p1, v1) = self.frames[next - 1];
        let (p2, v2) = self.frames[next];
        let span = p2 - p1;
        let t = if span > 0.0 { (progress - p1) / span } else { 1.0 };

        match interpolation {
            Interpolation::Linear => v1.interpolate(&v2, t),
            Interpolation::Cubic => {
                let v0 = if next >= 2 { self.frames[next - 2].1 } else { v1 };
                let v3 = if next < last { self.frames[next + 1].1 } else { v2 };
                catmull_rom(&v0, &v1, &v2, &v3, t).or_else(|| v1.interpolate(&v2, t))
            }
        }
    }
}

fn catmull_rom(p0: &PropertyValue, p1: &PropertyValue, p2: &PropertyValue, p3: &PropertyValue, t: f32) -> Option<PropertyValue> {
    let t2 = t * t;
    let t3 = t2 * t;
    macro_rules! spline {
        ($a:expr, $b:expr, $c:expr, $d:expr) => {
            $b * 1.0
                + ($c - $a) * (0.5 * t)
                + ($a * 1.0 - $b * 2.5 + $c * 2.0 - $d * 0.5) * t2
                + ($b * 1.5 - $a * 0.5 - $c * 1.5 + $d * 0.5) * t3
        };
    }
    let value = match (p0, p1, p2, p3) {
        (PropertyValue::Float(a), PropertyValue::Float(b), PropertyValue::Float(c), PropertyValue::Float(d)) => {
            PropertyValue::Float(spline!(*a, *b, *c, *d))
        }
        (PropertyValue::Vector2(a), PropertyValue::Vector2(b), PropertyValue::Vector2(c), PropertyValue::Vector2(d)) => {
            PropertyValue::Vector2(spline!(*a, *b, *c, *d))
        }
        (PropertyValue::Vector3(a), PropertyValue::Vector3(b), PropertyValue::Vector3(c), PropertyValue::Vector3(d)) => {
            PropertyValue::Vector3(spline!(*a, *b, *c, *d))
        }
        (PropertyValue::Vector4(a), PropertyValue::Vector4(b), PropertyValue::Vector4(c), PropertyValue::Vector4(d)) => {
            PropertyValue::Vector4(spline!(*a, *b, *c, *d))
        }
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn track() -> KeyFrames {
        KeyFrames::new()
            .with(0.0, 0.0_f32)
            .and_then(|k| k.with(0.5, 10.0_f32))
            .and_then(|k| k.with(1.0, 0.0_f32))
            .unwrap()
    }

    #[test]
    fn test_linear_segments() {
        let k = track();
        assert_relative_eq!(k.value(0.25, Interpolation::Linear).unwrap().get::<f32>().unwrap(), 5.0);
        assert_relative_eq!(k.value(0.75, Interpolation::Linear).unwrap().get::<f32>().unwrap(), 5.0);
        assert_relative_eq!(k.value(1.0, Interpolation::Linear).unwrap().get::<f32>().unwrap(), 0.0);
    }

    #[test]
    fn test_cubic_passes_through_frames() {
        let k = track();
        assert_relative_eq!(k.value(0.5, Interpolation::Cubic).unwrap().get::<f32>().unwrap(), 10.0);
        let mid = k.value(0.25, Interpolation::Cubic).unwrap().get::<f32>().unwrap();
        assert!(mid > 5.0, "spline overshoots the chord towards the peak, got {mid}");
    }

    #[test]
    fn test_type_mismatch_and_activity() {
        let mut k = KeyFrames::new();
        k.add(0.2, PropertyValue::Float(1.0)).unwrap();
        assert!(k.add(0.4, PropertyValue::Boolean(true)).is_err());
        assert!(!k.is_active(0.1));
        assert!(k.is_active(0.2));
        assert!(KeyFrames::new().value(0.5, Interpolation::Linear).is_none());
    }
}
