use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// RGBA color as uploaded to the `ourColor` uniform
#[derive(Clone, Copy, PartialEq, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn channel(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
        }
    }

    fn with_channel(mut self, channel: Channel, value: f32) -> Self {
        match channel {
            Channel::Red => self.r = value,
            Channel::Green => self.g = value,
            Channel::Blue => self.b = value,
        }
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

/// Periodic function of elapsed time driving a channel
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Wave {
    Sin,
    Cos,
    NegSin,
    NegCos,
}

impl Wave {
    const CYCLE: [Wave; 4] = [Wave::Sin, Wave::Cos, Wave::NegSin, Wave::NegCos];

    /// `sin(t + index * pi/2)`: sign and phase alternate with the region index
    pub fn for_region(index: usize) -> Self {
        Self::CYCLE[index % Self::CYCLE.len()]
    }

    /// Value of the wave remapped from [-1, 1] to [0, 1]
    pub fn eval(self, t: f64) -> f32 {
        let wave = match self {
            Wave::Sin => t.sin(),
            Wave::Cos => t.cos(),
            Wave::NegSin => -t.sin(),
            Wave::NegCos => -t.cos(),
        };

        (wave / 2.0 + 0.5) as f32
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ChannelAnimation {
    pub channel: Channel,
    pub wave: Wave,
}

impl ChannelAnimation {
    pub fn color(&self, t: f64) -> Color {
        Color::BLACK.with_channel(self.channel, self.wave.eval(t))
    }
}

/// Per-region animation table, indexed by region modulo its length
#[derive(Clone, PartialEq, Debug)]
pub struct ColorPolicy {
    animations: Vec<ChannelAnimation>,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        let channels = [Channel::Green, Channel::Red, Channel::Green, Channel::Green];

        Self {
            animations: channels
                .into_iter()
                .enumerate()
                .map(|(index, channel)| ChannelAnimation {
                    channel,
                    wave: Wave::for_region(index),
                })
                .collect(),
        }
    }
}

impl ColorPolicy {
    /// An empty table falls back to the default one
    pub fn new(animations: Vec<ChannelAnimation>) -> Self {
        if animations.is_empty() {
            Self::default()
        } else {
            Self { animations }
        }
    }

    pub fn animation(&self, region: usize) -> ChannelAnimation {
        self.animations[region % self.animations.len()]
    }

    pub fn color(&self, region: usize, t: f64) -> Color {
        self.animation(region).color(t)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};
    use test_case::test_case;

    const EPSILON: f32 = 1e-6;

    #[test_case(Wave::Sin, 0.5)]
    #[test_case(Wave::Cos, 1.0)]
    #[test_case(Wave::NegSin, 0.5)]
    #[test_case(Wave::NegCos, 0.0)]
    fn wave_at_zero(wave: Wave, expected: f32) {
        assert!((wave.eval(0.0) - expected).abs() < EPSILON);
    }

    #[test_case(Wave::Sin)]
    #[test_case(Wave::Cos)]
    #[test_case(Wave::NegSin)]
    #[test_case(Wave::NegCos)]
    fn wave_stays_in_unit_range(wave: Wave) {
        for step in 0..2000 {
            let t = step as f64 * 0.0137 - 5.0;
            let value = wave.eval(t);
            assert!((0.0..=1.0).contains(&value), "{wave:?}({t}) = {value}");
        }
    }

    #[test_case(0.0)]
    #[test_case(0.75)]
    #[test_case(13.2)]
    #[test_case(1000.0)]
    fn policy_is_periodic(t: f64) {
        let policy = ColorPolicy::default();
        for region in 0..8 {
            let now = policy.color(region, t);
            let later = policy.color(region, t + TAU);
            for channel in [Channel::Red, Channel::Green, Channel::Blue] {
                assert!((now.channel(channel) - later.channel(channel)).abs() < 1e-5);
            }
            assert_eq!(now.a, 1.0);
        }
    }

    #[test]
    fn region_waves_are_phase_shifted_sines() {
        let t = 0.4;
        for region in 0..4 {
            let expected = ((t + region as f64 * PI / 2.0).sin() / 2.0 + 0.5) as f32;
            assert!((Wave::for_region(region).eval(t) - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn default_table() {
        let policy = ColorPolicy::default();

        assert_eq!(
            ChannelAnimation {
                channel: Channel::Green,
                wave: Wave::Sin
            },
            policy.animation(0)
        );
        assert_eq!(
            ChannelAnimation {
                channel: Channel::Red,
                wave: Wave::Cos
            },
            policy.animation(1)
        );
        assert_eq!(Wave::NegSin, policy.animation(2).wave);
        assert_eq!(Wave::NegCos, policy.animation(3).wave);
        assert_eq!(policy.animation(0), policy.animation(4));
    }

    #[test]
    fn color_sets_only_its_channel() {
        let color = ChannelAnimation {
            channel: Channel::Red,
            wave: Wave::Cos,
        }
        .color(0.0);

        assert_eq!(
            Color {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 1.0
            },
            color
        );
    }

    #[test]
    fn empty_policy_uses_default() {
        assert_eq!(ColorPolicy::default(), ColorPolicy::new(vec![]));
    }
}
