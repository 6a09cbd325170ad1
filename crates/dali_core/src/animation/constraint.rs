//! Constraints: a property computed every frame from other properties.
//!
//! A constraint reads its sources, calls its function with the target's
//! current value and writes the result back. Evaluation is skipped while
//! nothing it depends on has changed. The weight blends the result in:
//! while it ramps towards [`FINAL_WEIGHT`] the written value is an
//! interpolation between the current value and the function's output,
//! and once it is final the output is baked or set depending on the
//! [`RemoveAction`].

use log::{debug, warn};

use crate::common::{BufferIndex, ConstraintId, PropertyOwnerId};
use crate::property::{AnimatableProperty, PropertyIndex, PropertyOwnerLookup, PropertyValue};

/// Weight at which a constraint is fully applied
pub const FINAL_WEIGHT: f32 = 1.0;

/// Computes the constrained value from the current one and the source values
pub type ConstraintFunction = Box<dyn Fn(&PropertyValue, &[PropertyValue]) -> PropertyValue + Send>;

/// Blends the current value towards the constrained one
pub type Interpolator = fn(&PropertyValue, &PropertyValue, f32) -> PropertyValue;

/// Interpolates like an animator; types without an interpolation jump to
/// the constrained value
pub fn default_interpolator(current: &PropertyValue, target: &PropertyValue, weight: f32) -> PropertyValue {
    current.interpolate(target, weight).unwrap_or(*target)
}

/// Whether the constrained value outlives the constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveAction {
    /// Bake the value once the weight is final
    #[default]
    Bake,
    /// Only set it; it reverts once the constraint is removed
    Discard,
}

/// One input of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintSource {
    /// Owner of the input property
    pub owner: PropertyOwnerId,
    /// Index of the input property
    pub index: PropertyIndex,
}

impl ConstraintSource {
    /// Source reading `index` of `owner`
    pub fn new(owner: impl Into<PropertyOwnerId>, index: PropertyIndex) -> Self {
        Self { owner: owner.into(), index }
    }
}

/// Outcome of one [`Constraint::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The target was written
    Applied,
    /// Nothing changed, or an input is not ready yet
    Skipped,
    /// An owner is gone or disconnected
    Disconnected,
}

#[derive(Debug, Clone, Copy)]
struct WeightRamp {
    duration: f32,
    elapsed: f32,
}

/// A property constraint living on the update side
pub struct Constraint {
    id: ConstraintId,
    target: PropertyOwnerId,
    index: PropertyIndex,
    sources: Vec<ConstraintSource>,
    function: ConstraintFunction,
    interpolator: Interpolator,
    remove_action: RemoveAction,
    weight: AnimatableProperty<f32>,
    ramp: Option<WeightRamp>,
    first_apply: bool,
    disconnected: bool,
    inputs: Vec<PropertyValue>,
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("index", &self.index)
            .field("sources", &self.sources)
            .field("remove_action", &self.remove_action)
            .field("disconnected", &self.disconnected)
            .finish_non_exhaustive()
    }
}

impl Constraint {
    /// Fully weighted constraint on `index` of `target`
    pub fn new(
        id: ConstraintId,
        target: impl Into<PropertyOwnerId>,
        index: PropertyIndex,
        sources: Vec<ConstraintSource>,
        function: ConstraintFunction,
    ) -> Self {
        Self {
            id,
            target: target.into(),
            index,
            inputs: Vec::with_capacity(sources.len()),
            sources,
            function,
            interpolator: default_interpolator,
            remove_action: RemoveAction::Bake,
            weight: AnimatableProperty::new(FINAL_WEIGHT),
            ramp: None,
            first_apply: true,
            disconnected: false,
        }
    }

    /// Builder: how the value survives removal
    #[must_use]
    pub fn with_remove_action(mut self, action: RemoveAction) -> Self {
        self.remove_action = action;
        self
    }

    /// Builder: blend function used while the weight ramps
    #[must_use]
    pub fn with_interpolator(mut self, interpolator: Interpolator) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Builder: ramp the weight from 0 to final over `seconds`
    #[must_use]
    pub fn with_apply_time(mut self, seconds: f32) -> Self {
        if seconds > 0.0 {
            self.weight = AnimatableProperty::new(0.0);
            self.ramp = Some(WeightRamp { duration: seconds, elapsed: 0.0 });
        }
        self
    }

    /// Constraint id
    pub const fn id(&self) -> ConstraintId {
        self.id
    }

    /// Constrained owner
    pub const fn target(&self) -> PropertyOwnerId {
        self.target
    }

    /// Constrained property
    pub const fn index(&self) -> PropertyIndex {
        self.index
    }

    /// Inputs in the order the function receives them
    pub fn sources(&self) -> &[ConstraintSource] {
        &self.sources
    }

    /// Remove action
    pub const fn remove_action(&self) -> RemoveAction {
        self.remove_action
    }

    /// Weight in `buffer`
    pub fn weight(&self, buffer: BufferIndex) -> f32 {
        self.weight.get(buffer)
    }

    /// True while an owner is disconnected or gone
    pub const fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// The target and every source owner, without duplicates
    pub fn owners(&self) -> Vec<PropertyOwnerId> {
        let mut owners = vec![self.target];
        for source in &self.sources {
            if !owners.contains(&source.owner) {
                owners.push(source.owner);
            }
        }
        owners
    }

    /// Bake a new weight, cancelling any ramp
    pub fn set_weight(&mut self, buffer: BufferIndex, weight: f32) {
        self.ramp = None;
        self.weight.bake(buffer, weight.clamp(0.0, FINAL_WEIGHT));
    }

    /// Restore the weight's base value before this frame's ramp step
    pub fn reset_weight(&mut self, buffer: BufferIndex) {
        self.weight.reset_to_base_value(buffer);
    }

    /// Advance the apply-time ramp; the final weight is baked
    pub fn advance_weight(&mut self, buffer: BufferIndex, elapsed_seconds: f32) {
        let Some(ramp) = self.ramp.as_mut() else { return };
        ramp.elapsed += elapsed_seconds;
        if ramp.elapsed >= ramp.duration {
            self.ramp = None;
            self.weight.bake(buffer, FINAL_WEIGHT);
        } else {
            let progress = ramp.elapsed / ramp.duration;
            self.weight.set(buffer, progress * FINAL_WEIGHT);
        }
    }

    /// Evaluate and write the target
    pub fn apply(&mut self, buffer: BufferIndex, owners: &mut dyn PropertyOwnerLookup) -> ApplyResult {
        if self.disconnected {
            return ApplyResult::Disconnected;
        }

        self.inputs.clear();
        let mut inputs_changed = false;
        for source in &self.sources {
            let Some(input) = owners.input(source.owner, source.index) else {
                debug!("{} lost source {} property {}", self.id, source.owner, source.index);
                self.disconnected = true;
                return ApplyResult::Disconnected;
            };
            if !input.input_initialized() {
                return ApplyResult::Skipped;
            }
            inputs_changed |= input.input_changed();
            self.inputs.push(input.value(buffer));
        }

        let Some(target) = owners.animatable_mut(self.target, self.index) else {
            debug!("{} lost target {} property {}", self.id, self.target, self.index);
            self.disconnected = true;
            return ApplyResult::Disconnected;
        };

        let needed = self.first_apply || !target.is_clean() || inputs_changed || !self.weight.is_clean();
        if !needed {
            return ApplyResult::Skipped;
        }
        self.first_apply = false;

        let current = target.value(buffer);
        let constrained = (self.function)(&current, &self.inputs);
        let weight = self.weight.get(buffer);

        let written = if !self.weight.is_clean() || (weight - FINAL_WEIGHT).abs() > f32::EPSILON {
            target.set_value(buffer, &(self.interpolator)(&current, &constrained, weight))
        } else {
            match self.remove_action {
                RemoveAction::Bake => target.bake_value(buffer, &constrained),
                RemoveAction::Discard => target.set_value(buffer, &constrained),
            }
        };

        match written {
            Ok(()) => ApplyResult::Applied,
            Err(e) => {
                warn!("{} cannot write {} property {}: {e}", self.id, self.target, self.index);
                self.disconnected = true;
                ApplyResult::Disconnected
            }
        }
    }

    /// An owner left the scene graph
    pub fn on_owner_disconnected(&mut self) {
        self.disconnected = true;
    }

    /// An owner joined the scene graph; resumes once every owner is connected
    pub fn on_owner_connected(&mut self, owners: &dyn PropertyOwnerLookup) {
        if self.disconnected && self.owners().into_iter().all(|o| owners.is_connected(o)) {
            self.disconnected = false;
            self.first_apply = true;
        }
    }
}
