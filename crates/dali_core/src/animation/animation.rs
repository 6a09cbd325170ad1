//! Update-side animation: play state, elapsed time and a list of animators.

use log::trace;

use super::animator::{Animator, EndAction};
use crate::common::{AnimationId, BufferIndex, PropertyOwnerId};
use crate::foundation::math::constants::MACHINE_EPSILON_1;
use crate::foundation::math::utils::wrap;
use crate::property::PropertyOwnerLookup;

/// Play state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// Not running; elapsed time at the start of the play range
    Stopped,
    /// Advancing every update
    Playing,
    /// Frozen but still applied
    Paused,
    /// Terminal
    Destroyed,
}

/// Direction time runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayDirection {
    /// Towards the end
    Forward,
    /// Towards the start
    Backward,
}

/// A set of animators sharing one clock
#[derive(Debug)]
pub struct Animation {
    id: AnimationId,
    duration: f32,
    duration_target: f32,
    direction: PlayDirection,
    playing_to: bool,
    looping: bool,
    loop_count: u32,
    current_loop: u32,
    play_range: (f32, f32),
    end_action: EndAction,
    destroy_action: EndAction,
    state: AnimationState,
    elapsed: f32,
    play_count: u32,
    animators: Vec<Animator>,
    animators_applied: usize,
}

impl Animation {
    /// Stopped animation of `duration` seconds
    pub fn new(id: AnimationId, duration: f32) -> Self {
        debug_assert!(duration >= 0.0, "negative duration for {id}");
        Self {
            id,
            duration,
            duration_target: duration,
            direction: PlayDirection::Forward,
            playing_to: false,
            looping: false,
            loop_count: 0,
            current_loop: 0,
            play_range: (0.0, 1.0),
            end_action: EndAction::Bake,
            destroy_action: EndAction::Bake,
            state: AnimationState::Stopped,
            elapsed: 0.0,
            play_count: 0,
            animators: Vec::new(),
            animators_applied: 0,
        }
    }

    /// Animation id
    pub const fn id(&self) -> AnimationId {
        self.id
    }

    /// Current state
    pub const fn state(&self) -> AnimationState {
        self.state
    }

    /// Seconds into the animation
    pub const fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }

    /// Total duration in seconds
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    /// Number of completed plays
    pub const fn play_count(&self) -> u32 {
        self.play_count
    }

    /// Current direction
    pub const fn direction(&self) -> PlayDirection {
        self.direction
    }

    /// Animators still attached
    pub fn animators(&self) -> &[Animator] {
        &self.animators
    }

    /// Animators applied by the last update
    pub const fn animators_applied(&self) -> usize {
        self.animators_applied
    }

    /// Distinct owners targeted by the animators
    pub fn targets(&self) -> Vec<PropertyOwnerId> {
        let mut targets: Vec<PropertyOwnerId> = Vec::new();
        for animator in &self.animators {
            if !targets.contains(&animator.target()) {
                targets.push(animator.target());
            }
        }
        targets
    }

    /// Attach an animator
    pub fn add_animator(&mut self, animator: Animator) {
        self.animators.push(animator);
    }

    /// Change the duration, keeping a pending `play_to` target proportional
    pub fn set_duration(&mut self, duration: f32) {
        debug_assert!(duration > 0.0);
        let target_progress = if self.duration_target < self.duration && self.duration > 0.0 {
            self.duration_target / self.duration
        } else {
            self.play_range.1
        };
        self.duration_target = duration * target_progress;
        self.duration = duration;
    }

    /// Loop forever when true
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.loop_count = 0;
        self.current_loop = 0;
    }

    /// Play `count` times; 0 loops forever, 1 plays once
    pub fn set_loop_count(&mut self, count: u32) {
        self.looping = count != 1;
        self.loop_count = count;
        self.current_loop = 0;
    }

    /// Restrict playback to `[start, end]`, as fractions of the duration
    pub fn set_play_range(&mut self, start: f32, end: f32) {
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(start, 1.0);
        self.play_range = (start, end);
        if self.state != AnimationState::Playing {
            self.duration_target = end * self.duration;
            self.elapsed = self.elapsed.clamp(self.range_start(), self.range_end());
        }
    }

    /// What finishing does to the animated values
    pub fn set_end_action(&mut self, action: EndAction) {
        self.end_action = action;
    }

    /// What destroying a running animation does to the animated values
    pub fn set_destroy_action(&mut self, action: EndAction) {
        self.destroy_action = action;
    }

    fn range_start(&self) -> f32 {
        self.play_range.0 * self.duration
    }

    fn range_end(&self) -> f32 {
        self.play_range.1 * self.duration
    }

    fn set_play_direction(&mut self, direction: PlayDirection) {
        if direction != self.direction {
            if self.elapsed > 0.0 {
                self.elapsed = self.duration - self.elapsed;
            }
            self.direction = direction;
        }
    }

    /// Play forward from the current position to the end of the play range
    pub fn play(&mut self) {
        self.set_play_direction(PlayDirection::Forward);
        self.duration_target = self.range_end();
        self.elapsed = self.elapsed.clamp(self.range_start(), self.range_end());
        self.playing_to = false;
        self.state = AnimationState::Playing;
    }

    /// Play forward from `progress`; no effect while already playing
    pub fn play_from(&mut self, progress: f32) {
        if self.state != AnimationState::Playing {
            self.set_play_direction(PlayDirection::Forward);
            self.duration_target = self.range_end();
            self.playing_to = false;
            self.elapsed = progress.clamp(0.0, 1.0) * self.duration;
            self.state = AnimationState::Playing;
        }
    }

    /// Play until `progress` is reached, backwards if it lies behind the
    /// current position; no effect while already playing
    pub fn play_to(&mut self, progress: f32) {
        if self.state != AnimationState::Playing {
            let target = progress.clamp(0.0, 1.0) * self.duration;
            if target >= self.elapsed {
                self.set_play_direction(PlayDirection::Forward);
                self.duration_target = target;
            } else {
                self.set_play_direction(PlayDirection::Backward);
                self.duration_target = self.duration - target;
            }
            self.playing_to = true;
            self.state = AnimationState::Playing;
        }
    }

    /// Freeze at the current position; only from `Playing`
    pub fn pause(&mut self) {
        if self.state == AnimationState::Playing {
            self.state = AnimationState::Paused;
        }
    }

    /// Stop, applying the end action
    ///
    /// Returns true if the animation was running, in which case the event
    /// side should be told it finished.
    pub fn stop(&mut self, buffer: BufferIndex, owners: &mut dyn PropertyOwnerLookup) -> bool {
        let mut finished = false;
        if matches!(self.state, AnimationState::Playing | AnimationState::Paused) {
            finished = true;
            if self.end_action != EndAction::Discard {
                if self.end_action == EndAction::BakeFinal {
                    self.elapsed = self.duration + MACHINE_EPSILON_1;
                    self.duration_target = self.duration;
                }
                self.update_animators(buffer, true, owners);
            }
            self.play_count += 1;
        }
        self.elapsed = self.range_start();
        self.current_loop = 0;
        self.state = AnimationState::Stopped;
        finished
    }

    /// The event side released the animation
    pub fn on_destroy(&mut self, buffer: BufferIndex, owners: &mut dyn PropertyOwnerLookup) {
        if matches!(self.state, AnimationState::Playing | AnimationState::Paused)
            && self.destroy_action != EndAction::Discard
        {
            if self.destroy_action == EndAction::BakeFinal {
                self.elapsed = self.duration + MACHINE_EPSILON_1;
                self.duration_target = self.duration;
            }
            self.update_animators(buffer, true, owners);
        }
        self.state = AnimationState::Destroyed;
    }

    /// Advance by `elapsed_seconds` and apply every animator
    ///
    /// Returns true if the animation finished during this update.
    pub fn update(&mut self, buffer: BufferIndex, elapsed_seconds: f32, owners: &mut dyn PropertyOwnerLookup) -> bool {
        self.animators_applied = 0;
        if matches!(self.state, AnimationState::Stopped | AnimationState::Destroyed) {
            return false;
        }

        if self.state == AnimationState::Playing {
            self.elapsed += elapsed_seconds;
        }

        if self.looping && !self.playing_to && self.elapsed > self.range_end() {
            let more_loops = self.loop_count == 0 || self.current_loop + 1 < self.loop_count;
            if more_loops {
                let (start, end) = (self.range_start(), self.range_end());
                self.elapsed = if end > start { start + wrap(self.elapsed - start, end - start) } else { start };
                self.current_loop += 1;
                trace!("{} loop {}", self.id, self.current_loop);
            }
        }

        let finished = self.state == AnimationState::Playing && self.elapsed > self.duration_target;
        self.update_animators(buffer, finished && self.end_action != EndAction::Discard, owners);

        if finished {
            self.play_count += 1;
            self.elapsed = self.range_start();
            self.current_loop = 0;
            self.state = AnimationState::Stopped;
        }
        finished
    }

    fn update_animators(&mut self, buffer: BufferIndex, bake: bool, owners: &mut dyn PropertyOwnerLookup) {
        let elapsed = self.elapsed.min(self.duration_target);
        let duration = self.duration;
        let direction = self.direction;
        let mut applied = 0;

        self.animators.retain_mut(|animator| {
            let delay = animator.initial_delay();
            let animator_duration = animator.duration();
            let progress = match direction {
                PlayDirection::Forward => (elapsed >= delay).then(|| {
                    if animator_duration > 0.0 {
                        ((elapsed - delay) / animator_duration).min(1.0)
                    } else {
                        1.0
                    }
                }),
                PlayDirection::Backward => {
                    let inverse = duration - elapsed;
                    (inverse <= animator_duration + delay).then(|| {
                        if animator_duration > 0.0 {
                            ((inverse - delay) / animator_duration).max(0.0)
                        } else {
                            0.0
                        }
                    })
                }
            };
            match progress {
                Some(progress) => {
                    let kept = animator.update(buffer, progress, bake, owners);
                    if kept {
                        applied += 1;
                    }
                    kept
                }
                None => animator.is_enabled(),
            }
        });

        self.animators_applied = applied;
    }

    /// An owner left the scene graph
    pub fn on_owner_disconnected(&mut self, owner: PropertyOwnerId, buffer: BufferIndex, owners: &mut dyn PropertyOwnerLookup) {
        for animator in self.animators.iter_mut().filter(|a| a.target() == owner) {
            animator.on_owner_disconnected(buffer, owners);
        }
    }

    /// An owner was destroyed; its animators are dropped on the next update
    pub fn on_owner_destroyed(&mut self, owner: PropertyOwnerId) {
        for animator in self.animators.iter_mut().filter(|a| a.target() == owner) {
            animator.on_owner_destroyed();
        }
        self.animators.retain(Animator::is_enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::animator::AnimatorFunction;
    use crate::common::ObjectId;
    use crate::property::{AnimatablePropertyBase, PropertyIndex, PropertyInput, PropertyValue, SceneObject};
    use approx::assert_relative_eq;

    struct Objects(Vec<SceneObject>);

    impl PropertyOwnerLookup for Objects {
        fn input(&self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&dyn PropertyInput> {
            let PropertyOwnerId::Object(id) = owner else { return None };
            self.0.iter().find(|o| o.id() == id)?.custom().get(index).map(|p| p.as_input())
        }

        fn animatable_mut(&mut self, owner: PropertyOwnerId, index: PropertyIndex) -> Option<&mut dyn AnimatablePropertyBase> {
            let PropertyOwnerId::Object(id) = owner else { return None };
            self.0.iter_mut().find(|o| o.id() == id)?.custom_mut().get_mut(index)
        }

        fn is_connected(&self, owner: PropertyOwnerId) -> bool {
            self.input(owner, crate::property::CUSTOM_PROPERTY_START_INDEX).is_some()
        }
    }

    fn setup(end_action: EndAction) -> (Animation, Objects, PropertyOwnerId, PropertyIndex) {
        let id = ObjectId::from_raw(1);
        let mut object = SceneObject::new(id);
        let index = object.custom().next_index();
        object.custom_mut().install(id.into(), index, &PropertyValue::Float(0.0)).unwrap();

        let mut animation = Animation::new(AnimationId::from_raw(1), 1.0);
        animation.set_end_action(end_action);
        animation.add_animator(Animator::new(id, index, AnimatorFunction::AnimateTo(PropertyValue::Float(10.0)), 1.0));
        (animation, Objects(vec![object]), id.into(), index)
    }

    fn value(objects: &Objects, owner: PropertyOwnerId, index: PropertyIndex, buffer: BufferIndex) -> f32 {
        objects.input(owner, index).unwrap().value(buffer).get::<f32>().unwrap()
    }

    #[test]
    fn test_play_and_finish_bakes() {
        let (mut animation, mut objects, owner, index) = setup(EndAction::Bake);
        animation.play();

        assert!(!animation.update(BufferIndex::ZERO, 0.5, &mut objects));
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ZERO), 5.0);

        assert!(animation.update(BufferIndex::ONE, 0.6, &mut objects));
        assert_eq!(animation.state(), AnimationState::Stopped);
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ZERO), 10.0);
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ONE), 10.0);
        assert_eq!(animation.play_count(), 1);
    }

    #[test]
    fn test_pause_only_from_playing() {
        let (mut animation, _, _, _) = setup(EndAction::Bake);
        animation.pause();
        assert_eq!(animation.state(), AnimationState::Stopped);
        animation.play();
        animation.pause();
        assert_eq!(animation.state(), AnimationState::Paused);
    }

    #[test]
    fn test_paused_keeps_elapsed() {
        let (mut animation, mut objects, owner, index) = setup(EndAction::Bake);
        animation.play();
        animation.update(BufferIndex::ZERO, 0.25, &mut objects);
        animation.pause();
        animation.update(BufferIndex::ONE, 0.5, &mut objects);
        assert_relative_eq!(animation.elapsed_seconds(), 0.25);
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ONE), 2.5);
    }

    #[test]
    fn test_play_from_ignored_while_playing() {
        let (mut animation, _, _, _) = setup(EndAction::Bake);
        animation.play_from(0.5);
        assert_relative_eq!(animation.elapsed_seconds(), 0.5);
        animation.play_from(0.9);
        assert_relative_eq!(animation.elapsed_seconds(), 0.5);
    }

    #[test]
    fn test_stop_bake_final() {
        let (mut animation, mut objects, owner, index) = setup(EndAction::BakeFinal);
        animation.play();
        animation.update(BufferIndex::ZERO, 0.2, &mut objects);
        assert!(animation.stop(BufferIndex::ZERO, &mut objects));
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ONE), 10.0);
        assert!(!animation.stop(BufferIndex::ZERO, &mut objects));
    }

    #[test]
    fn test_stop_discard_leaves_base() {
        let (mut animation, mut objects, owner, index) = setup(EndAction::Discard);
        animation.play();
        animation.update(BufferIndex::ZERO, 0.5, &mut objects);
        assert!(animation.stop(BufferIndex::ZERO, &mut objects));
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ONE), 0.0);
    }

    #[test]
    fn test_play_to_backwards() {
        let (mut animation, mut objects, owner, index) = setup(EndAction::Bake);
        animation.play_from(0.8);
        animation.pause();
        animation.play_to(0.4);
        assert_eq!(animation.direction(), PlayDirection::Backward);

        animation.update(BufferIndex::ZERO, 0.2, &mut objects);
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ZERO), 6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_loop_count() {
        let (mut animation, mut objects, _, _) = setup(EndAction::Bake);
        animation.set_loop_count(2);
        animation.play();
        assert!(!animation.update(BufferIndex::ZERO, 1.5, &mut objects));
        assert_relative_eq!(animation.elapsed_seconds(), 0.5, epsilon = 1e-5);
        assert!(animation.update(BufferIndex::ONE, 0.6, &mut objects));
    }

    #[test]
    fn test_play_range_starts_inside() {
        let (mut animation, mut objects, owner, index) = setup(EndAction::Bake);
        animation.set_play_range(0.5, 0.75);
        animation.play();
        animation.update(BufferIndex::ZERO, 0.1, &mut objects);
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ZERO), 6.0, epsilon = 1e-4);
        assert!(animation.update(BufferIndex::ONE, 0.2, &mut objects));
        assert_relative_eq!(value(&objects, owner, index, BufferIndex::ONE), 7.5, epsilon = 1e-4);
    }

    #[test]
    fn test_destroyed_target_drops_animator() {
        let (mut animation, mut objects, owner, _) = setup(EndAction::Bake);
        animation.play();
        animation.on_owner_destroyed(owner);
        assert!(animation.animators().is_empty());
        objects.0.clear();
        animation.update(BufferIndex::ZERO, 0.1, &mut objects);
        assert_eq!(animation.animators_applied(), 0);
    }
}
