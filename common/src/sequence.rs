use crate::{
    config::{ModeCycle, RangeConfig},
    types::{Active, SwingMode, TargetMode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn towards<T: Ord>(current: T, target: T) -> Self {
        if current < target {
            Self::Forward
        } else {
            Self::Backward
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Wrap,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    Moved(T),
    // current value was not in the sequence, fell back to its first element
    Recovered(T),
}

impl<T: Copy> Step<T> {
    pub fn value(self) -> T {
        match self {
            Self::Moved(value) | Self::Recovered(value) => value,
        }
    }

    pub fn is_recovered(self) -> bool {
        matches!(self, Self::Recovered(_))
    }
}

/// Panics if `sequence` is empty.
pub fn step<T: Copy + PartialEq>(
    sequence: &[T],
    current: T,
    direction: Direction,
    overflow: Overflow,
) -> Step<T> {
    let Some(index) = sequence.iter().position(|value| *value == current) else {
        return Step::Recovered(sequence[0]);
    };

    let last = sequence.len() - 1;
    let next = match direction {
        Direction::Forward if index == last => match overflow {
            Overflow::Wrap => 0,
            Overflow::Clamp => last,
        },
        Direction::Forward => index + 1,
        Direction::Backward if index == 0 => match overflow {
            Overflow::Wrap => last,
            Overflow::Clamp => 0,
        },
        Direction::Backward => index - 1,
    };

    Step::Moved(sequence[next])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequences {
    pub active: Vec<Active>,
    pub target_mode: Vec<TargetMode>,
    pub cooling_threshold: Vec<u8>,
    pub heating_threshold: Vec<u8>,
    pub swing: Vec<SwingMode>,
}

impl Sequences {
    pub fn new(ranges: &RangeConfig, mode_cycle: &ModeCycle) -> Self {
        Self {
            active: vec![Active::Inactive, Active::Active],
            target_mode: mode_cycle.0.clone(),
            cooling_threshold: ranges.cooling.values(),
            heating_threshold: ranges.heating.values(),
            swing: vec![SwingMode::Disabled, SwingMode::Enabled],
        }
    }
}

impl Default for Sequences {
    fn default() -> Self {
        Self::new(&RangeConfig::default(), &ModeCycle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_wrap<T: Copy + PartialEq + std::fmt::Debug>(sequence: &[T]) {
        let first = sequence[0];
        let last = sequence[sequence.len() - 1];
        assert_eq!(
            step(sequence, last, Direction::Forward, Overflow::Wrap),
            Step::Moved(first)
        );
        assert_eq!(
            step(sequence, first, Direction::Backward, Overflow::Wrap),
            Step::Moved(last)
        );
    }

    #[test]
    fn circular_sequences_wrap_at_both_ends() {
        let sequences = Sequences::default();
        check_wrap(&sequences.active);
        check_wrap(&sequences.target_mode);
        check_wrap(&sequences.swing);
        check_wrap(&sequences.cooling_threshold);
    }

    #[test]
    fn clamped_sequences_saturate() {
        let sequences = Sequences::default();
        let cooling = &sequences.cooling_threshold;

        assert_eq!(
            step(cooling, 32, Direction::Forward, Overflow::Clamp),
            Step::Moved(32)
        );
        assert_eq!(
            step(cooling, 18, Direction::Backward, Overflow::Clamp),
            Step::Moved(18)
        );
        assert_eq!(
            step(&sequences.heating_threshold, 27, Direction::Forward, Overflow::Clamp),
            Step::Moved(27)
        );
    }

    #[test]
    fn steps_one_position_inside_sequence() {
        let sequences = Sequences::default();
        assert_eq!(
            step(&sequences.cooling_threshold, 20, Direction::Forward, Overflow::Clamp),
            Step::Moved(21)
        );
        assert_eq!(
            step(&sequences.heating_threshold, 16, Direction::Backward, Overflow::Clamp),
            Step::Moved(15)
        );
    }

    #[test]
    fn unknown_value_recovers_to_first_element() {
        let sequences = Sequences::default();

        for overflow in [Overflow::Wrap, Overflow::Clamp] {
            for direction in [Direction::Forward, Direction::Backward] {
                assert_eq!(
                    step(&sequences.cooling_threshold, 99, direction, overflow),
                    Step::Recovered(18)
                );
                assert_eq!(
                    step(&sequences.heating_threshold, 0, direction, overflow),
                    Step::Recovered(13)
                );
            }
        }

        let partial = [TargetMode::Heat, TargetMode::Cool];
        let recovered = step(&partial, TargetMode::Dry, Direction::Forward, Overflow::Wrap);
        assert!(recovered.is_recovered());
        assert_eq!(recovered.value(), TargetMode::Heat);
    }

    #[test]
    fn mode_button_walks_unit_cycle_not_enum_order() {
        let modes = Sequences::default().target_mode;
        let mut current = TargetMode::Heat;
        let mut visited = Vec::new();

        for _ in 0..5 {
            current = step(&modes, current, Direction::Forward, Overflow::Wrap).value();
            visited.push(current);
        }

        assert_eq!(
            visited,
            vec![
                TargetMode::CoolAuto,
                TargetMode::Cool,
                TargetMode::Dry,
                TargetMode::Auto,
                TargetMode::Heat,
            ]
        );
    }

    #[test]
    fn direction_points_towards_target() {
        assert_eq!(Direction::towards(20, 24), Direction::Forward);
        assert_eq!(Direction::towards(24, 20), Direction::Backward);
    }
}
