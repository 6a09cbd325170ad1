//! Animators: one property of one owner, driven by an animation.

use log::warn;

use super::alpha::AlphaFunction;
use super::key_frames::{Interpolation, KeyFrames};
use crate::common::{BufferIndex, PropertyOwnerId};
use crate::foundation::math::{Quat, Vec3};
use crate::property::value::slerp;
use crate::property::{AnimatablePropertyBase, PropertyIndex, PropertyInput, PropertyOwnerLookup, PropertyValue};

/// What happens to animated values when an animation ends, is destroyed,
/// or loses its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndAction {
    /// Keep the current value
    #[default]
    Bake,
    /// Jump to the final value and keep it
    BakeFinal,
    /// Revert to the value before the animation
    Discard,
}

/// How an animator computes a new value from the current one
#[derive(Debug, Clone)]
pub enum AnimatorFunction {
    /// Towards an absolute target
    AnimateTo(PropertyValue),
    /// By a relative amount
    AnimateBy(PropertyValue),
    /// Rotate by an angle around an axis
    RotateByAngleAxis {
        /// Radians
        angle: f32,
        /// Rotation axis
        axis: Vec3,
    },
    /// Towards an absolute orientation
    RotateTo(Quat),
    /// Along a key-frame track
    KeyFrames(KeyFrames, Interpolation),
}

impl AnimatorFunction {
    /// New value for eased progress `alpha`; `None` on a type mismatch
    pub fn apply(&self, alpha: f32, current: &PropertyValue) -> Option<PropertyValue> {
        match self {
            Self::AnimateTo(target) => current.interpolate(target, alpha),
            Self::AnimateBy(relative) => current.offset(relative, alpha),
            Self::RotateByAngleAxis { angle, axis } => {
                let rotation = current.get::<Quat>()?;
                if alpha > 0.0 {
                    let axis = nalgebra::Unit::try_new(*axis, 1.0e-6)?;
                    Some(PropertyValue::Rotation(rotation * Quat::from_axis_angle(&axis, angle * alpha)))
                } else {
                    Some(*current)
                }
            }
            Self::RotateTo(target) => {
                let rotation = current.get::<Quat>()?;
                Some(PropertyValue::Rotation(slerp(&rotation, target, alpha)))
            }
            Self::KeyFrames(frames, interpolation) => {
                if frames.is_active(alpha) {
                    let value = frames.value(alpha, *interpolation)?;
                    (value.property_type() == current.property_type()).then_some(value)
                } else {
                    Some(*current)
                }
            }
        }
    }
}

/// Drives one property of one owner
#[derive(Debug, Clone)]
pub struct Animator {
    target: PropertyOwnerId,
    index: PropertyIndex,
    function: AnimatorFunction,
    alpha_function: AlphaFunction,
    duration: f32,
    initial_delay: f32,
    disconnect_action: EndAction,
    active: bool,
    enabled: bool,
    current_progress: f32,
}

impl Animator {
    /// Animator over the whole animation with linear easing
    pub fn new(target: impl Into<PropertyOwnerId>, index: PropertyIndex, function: AnimatorFunction, duration: f32) -> Self {
        Self {
            target: target.into(),
            index,
            function,
            alpha_function: AlphaFunction::Linear,
            duration,
            initial_delay: 0.0,
            disconnect_action: EndAction::BakeFinal,
            active: false,
            enabled: true,
            current_progress: 0.0,
        }
    }

    /// Builder: easing
    #[must_use]
    pub fn with_alpha_function(mut self, alpha_function: AlphaFunction) -> Self {
        self.alpha_function = alpha_function;
        self
    }

    /// Builder: start this many seconds into the animation
    #[must_use]
    pub fn with_initial_delay(mut self, seconds: f32) -> Self {
        self.initial_delay = seconds;
        self
    }

    /// Builder: what to do if the target leaves the scene graph
    #[must_use]
    pub fn with_disconnect_action(mut self, action: EndAction) -> Self {
        self.disconnect_action = action;
        self
    }

    /// Target owner
    pub const fn target(&self) -> PropertyOwnerId {
        self.target
    }

    /// Target property index
    pub const fn index(&self) -> PropertyIndex {
        self.index
    }

    /// Seconds this animator runs for; 0 jumps straight to the end
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds before this animator starts
    pub const fn initial_delay(&self) -> f32 {
        self.initial_delay
    }

    /// Progress of the last successful update
    pub const fn current_progress(&self) -> f32 {
        self.current_progress
    }

    /// True once the animator has written its target
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// False once the target is gone
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Write the value for `progress`; returns false if the animator is
    /// orphaned and should be dropped
    pub fn update(&mut self, buffer: BufferIndex, progress: f32, bake: bool, owners: &mut dyn PropertyOwnerLookup) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(property) = owners.animatable_mut(self.target, self.index) else {
            self.enabled = false;
            return false;
        };

        let alpha = self.alpha_function.apply(progress);
        let current = property.value(buffer);
        let Some(result) = self.function.apply(alpha, &current) else {
            warn!(
                "animator for {} property {} cannot animate a {:?}, dropping it",
                self.target,
                self.index,
                current.property_type()
            );
            self.enabled = false;
            return false;
        };

        let written = if bake {
            property.bake_value(buffer, &result)
        } else {
            property.set_value(buffer, &result)
        };
        if let Err(e) = written {
            warn!("animator for {} property {}: {e}", self.target, self.index);
            self.enabled = false;
            return false;
        }

        self.current_progress = progress;
        self.active = true;
        true
    }

    /// The target left the scene graph: apply the disconnect action and stop
    pub fn on_owner_disconnected(&mut self, buffer: BufferIndex, owners: &mut dyn PropertyOwnerLookup) {
        if self.active && self.disconnect_action != EndAction::Discard {
            let progress = if self.disconnect_action == EndAction::Bake { self.current_progress } else { 1.0 };
            self.update(buffer, progress, true, owners);
        }
        self.active = false;
        self.enabled = false;
    }

    /// The target was destroyed
    pub fn on_owner_destroyed(&mut self) {
        self.active = false;
        self.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ObjectId;
    use crate::property::SceneObject;
    use approx::assert_relative_eq;

    struct Objects(Vec<SceneObject>, bool);

    impl PropertyOwnerLookup for Objects {
        fn input(&self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&dyn PropertyInput> {
            let PropertyOwnerId::Object(id) = owner else { return None };
            self.0.iter().find(|o| o.id() == id)?.custom().get(index).map(|p| p.as_input())
        }

        fn animatable_mut(&mut self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&mut dyn AnimatablePropertyBase> {
            let PropertyOwnerId::Object(id) = owner else { return None };
            self.0.iter_mut().find(|o| o.id() == id)?.custom_mut().get_mut(index)
        }

        fn is_connected(&self, _owner: PropertyOwnerId) -> bool {
            self.1
        }
    }

    fn objects(initial: PropertyValue) -> (Objects, PropertyOwnerId, PropertyIndex) {
        let id = ObjectId::from_raw(1);
        let mut object = SceneObject::new(id);
        let index = object.custom().next_index();
        object.custom_mut().install(id.into(), index, &initial).unwrap();
        (Objects(vec![object], true), id.into(), index)
    }

    fn float(owners: &Objects, owner: PropertyOwnerId, index: PropertyIndex, buffer: BufferIndex) -> f32 {
        owners.input(owner, index).unwrap().value(buffer).get::<f32>().unwrap()
    }

    #[test]
    fn test_set_versus_bake() {
        let (mut owners, owner, index) = objects(PropertyValue::Float(0.0));
        let mut animator = Animator::new(owner, index, AnimatorFunction::AnimateTo(PropertyValue::Float(10.0)), 1.0);

        assert!(animator.update(BufferIndex::ZERO, 0.5, false, &mut owners));
        assert_relative_eq!(float(&owners, owner, index, BufferIndex::ZERO), 5.0);
        assert_relative_eq!(float(&owners, owner, index, BufferIndex::ONE), 0.0);

        assert!(animator.update(BufferIndex::ZERO, 1.0, true, &mut owners));
        assert_relative_eq!(float(&owners, owner, index, BufferIndex::ONE), 10.0);
    }

    #[test]
    fn test_orphaned_when_target_missing() {
        let (mut owners, _, index) = objects(PropertyValue::Float(0.0));
        let missing = PropertyOwnerId::Object(ObjectId::from_raw(99));
        let mut animator = Animator::new(missing, index, AnimatorFunction::AnimateBy(PropertyValue::Float(1.0)), 1.0);
        assert!(!animator.update(BufferIndex::ZERO, 0.5, false, &mut owners));
        assert!(!animator.is_enabled());
    }

    #[test]
    fn test_type_mismatch_disables() {
        let (mut owners, owner, index) = objects(PropertyValue::Float(0.0));
        let mut animator = Animator::new(owner, index, AnimatorFunction::RotateTo(Quat::identity()), 1.0);
        assert!(!animator.update(BufferIndex::ZERO, 0.5, false, &mut owners));
    }

    #[test]
    fn test_disconnect_bakes_current_progress() {
        let (mut owners, owner, index) = objects(PropertyValue::Float(0.0));
        let mut animator = Animator::new(owner, index, AnimatorFunction::AnimateTo(PropertyValue::Float(10.0)), 1.0)
            .with_disconnect_action(EndAction::Bake);
        animator.update(BufferIndex::ZERO, 0.3, false, &mut owners);
        animator.on_owner_disconnected(BufferIndex::ZERO, &mut owners);
        assert!(!animator.is_enabled());
        let baked = float(&owners, owner, index, BufferIndex::ONE);
        assert!(baked > 0.0 && baked < 10.0);
    }

    #[test]
    fn test_disconnect_bake_final() {
        let (mut owners, owner, index) = objects(PropertyValue::Float(0.0));
        let mut animator = Animator::new(owner, index, AnimatorFunction::AnimateBy(PropertyValue::Float(4.0)), 1.0);
        animator.update(BufferIndex::ZERO, 0.25, false, &mut owners);
        assert_relative_eq!(float(&owners, owner, index, BufferIndex::ZERO), 1.0);

        // next frame on the same buffer starts from the base value again
        owners.0[0].custom_mut().reset_to_base_values(BufferIndex::ZERO);
        animator.on_owner_disconnected(BufferIndex::ZERO, &mut owners);
        assert_relative_eq!(float(&owners, owner, index, BufferIndex::ZERO), 4.0);
        assert_relative_eq!(float(&owners, owner, index, BufferIndex::ONE), 4.0);
    }

    #[test]
    fn test_rotate_by_angle_axis() {
        let function = AnimatorFunction::RotateByAngleAxis { angle: std::f32::consts::PI, axis: Vec3::z() };
        let value = function.apply(0.5, &PropertyValue::Rotation(Quat::identity())).unwrap();
        assert_relative_eq!(value.get::<Quat>().unwrap().angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }
}
