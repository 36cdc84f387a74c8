//! Keyframe clips and the mixer that plays them on a model's nodes.

use crate::transform::Transform;
use crate::{Quat, Vec3};

/// How values between two keys are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

/// Keyed values for one node property. Same length as the channel's times.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    fn len(&self) -> usize {
        match self {
            Self::Translation(v) | Self::Scale(v) => v.len(),
            Self::Rotation(v) => v.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Index into the model's flattened node list.
    pub node: usize,
    /// Key times in seconds, ascending.
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

impl Channel {
    /// Write the value at `t` into `target`. Times outside the keyed range
    /// hold the first/last key.
    pub fn apply(&self, t: f32, target: &mut Transform) {
        let n = self.times.len().min(self.values.len());
        if n == 0 {
            return;
        }
        let (i, j, f) = locate(&self.times[..n], t, self.interpolation);
        match &self.values {
            ChannelValues::Translation(v) => target.translation = v[i].lerp(v[j], f),
            ChannelValues::Scale(v) => target.scale = v[i].lerp(v[j], f),
            ChannelValues::Rotation(v) => target.rotation = v[i].slerp(v[j], f).normalize(),
        }
    }
}

/// Surrounding key indices and blend factor for time `t`.
fn locate(times: &[f32], t: f32, interpolation: Interpolation) -> (usize, usize, f32) {
    let last = times.len() - 1;
    if t <= times[0] {
        return (0, 0, 0.0);
    }
    if t >= times[last] {
        return (last, last, 0.0);
    }
    // First key strictly after t. Only unordered or NaN keys land outside
    // 1..=last; those hold the nearest end.
    let next = times.partition_point(|&k| k <= t);
    if next == 0 {
        return (0, 0, 0.0);
    }
    if next > last {
        return (last, last, 0.0);
    }
    let prev = next - 1;
    match interpolation {
        Interpolation::Step => (prev, prev, 0.0),
        Interpolation::Linear => {
            let span = times[next] - times[prev];
            let f = if span > 0.0 { (t - times[prev]) / span } else { 0.0 };
            (prev, next, f)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            channels,
            duration,
        }
    }
}

/// Plays every clip of a model at once, looping each on its own duration.
#[derive(Clone, Debug)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    time: f32,
    pub time_scale: f32,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            time: 0.0,
            time_scale: 1.0,
        }
    }

    /// Advance local time by `delta` seconds and pose `nodes`.
    pub fn update(&mut self, delta: f32, nodes: &mut [Transform]) {
        self.time += delta.max(0.0) * self.time_scale;
        for clip in &self.clips {
            let t = if clip.duration > 0.0 {
                self.time % clip.duration
            } else {
                0.0
            };
            for channel in &clip.channels {
                if let Some(target) = nodes.get_mut(channel.node) {
                    channel.apply(t, target);
                }
            }
        }
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;

    fn slide(interpolation: Interpolation) -> AnimationClip {
        AnimationClip::new(
            "slide",
            vec![Channel {
                node: 0,
                times: vec![0.0, 1.0, 2.0],
                values: ChannelValues::Translation(vec![
                    vec3(0.0, 0.0, 0.0),
                    vec3(10.0, 0.0, 0.0),
                    vec3(10.0, 10.0, 0.0),
                ]),
                interpolation,
            }],
        )
    }

    #[test]
    fn clip_duration_is_last_key() {
        assert_eq!(slide(Interpolation::Linear).duration, 2.0);
        assert_eq!(AnimationClip::new("empty", vec![]).duration, 0.0);
    }

    #[test]
    fn linear_sampling_between_keys() {
        let mut mixer = AnimationMixer::new(vec![slide(Interpolation::Linear)]);
        let mut nodes = [Transform::identity()];
        mixer.update(0.5, &mut nodes);
        assert!((nodes[0].translation - vec3(5.0, 0.0, 0.0)).length() < 1e-5);
        mixer.update(1.0, &mut nodes);
        assert!((nodes[0].translation - vec3(10.0, 5.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn step_sampling_holds_previous_key() {
        let mut mixer = AnimationMixer::new(vec![slide(Interpolation::Step)]);
        let mut nodes = [Transform::identity()];
        mixer.update(0.99, &mut nodes);
        assert_eq!(nodes[0].translation, Vec3::ZERO);
        mixer.update(0.02, &mut nodes);
        assert_eq!(nodes[0].translation, vec3(10.0, 0.0, 0.0));
    }

    #[test]
    fn clips_loop_on_their_duration() {
        let mut mixer = AnimationMixer::new(vec![slide(Interpolation::Linear)]);
        let mut nodes = [Transform::identity()];
        mixer.update(2.5, &mut nodes);
        assert!((mixer.time() - 2.5).abs() < 1e-6);
        assert!((nodes[0].translation - vec3(5.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_is_slerped() {
        let clip = AnimationClip::new(
            "spin",
            vec![Channel {
                node: 0,
                times: vec![0.0, 1.0],
                values: ChannelValues::Rotation(vec![
                    Quat::IDENTITY,
                    Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                ]),
                interpolation: Interpolation::Linear,
            }],
        );
        let mut mixer = AnimationMixer::new(vec![clip]);
        let mut nodes = [Transform::identity()];
        mixer.update(0.5, &mut nodes);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(nodes[0].rotation.angle_between(expected) < 1e-4);
    }

    #[test]
    fn channels_for_missing_nodes_are_ignored() {
        let mut clip = slide(Interpolation::Linear);
        clip.channels[0].node = 7;
        let mut mixer = AnimationMixer::new(vec![clip]);
        let mut nodes = [Transform::identity()];
        mixer.update(0.5, &mut nodes);
        assert_eq!(nodes[0], Transform::identity());
    }

    #[test]
    fn nan_keys_hold_the_nearest_key() {
        let channel = |times: Vec<f32>| Channel {
            node: 0,
            times,
            values: ChannelValues::Translation(vec![vec3(1.0, 0.0, 0.0), vec3(2.0, 0.0, 0.0)]),
            interpolation: Interpolation::Linear,
        };
        let mut mixer = AnimationMixer::new(vec![AnimationClip::new(
            "broken",
            vec![channel(vec![f32::NAN, 1.0])],
        )]);
        let mut nodes = [Transform::identity()];
        mixer.update(0.5, &mut nodes);
        assert_eq!(nodes[0].translation, vec3(1.0, 0.0, 0.0));

        let (i, j, f) = locate(&[0.0, f32::NAN], 0.5, Interpolation::Linear);
        assert!(i <= 1 && j <= 1);
        assert!(f.is_finite());
    }
}
