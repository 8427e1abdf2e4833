use std::f32::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use winit::keyboard::KeyCode;

use super::input::PressedKeys;
use super::Vec2;

/// Facing and walking direction of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "lt")]
    TopLeft,
    #[serde(rename = "ct")]
    TopCenter,
    #[serde(rename = "rt")]
    TopRight,
    #[serde(rename = "lm")]
    MidLeft,
    #[serde(rename = "rm")]
    MidRight,
    #[serde(rename = "lb")]
    BottomLeft,
    #[serde(rename = "cb")]
    BottomCenter,
    #[serde(rename = "rb")]
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}', expected one of lt ct rt lm rm lb cb rb")]
pub struct InvalidDirection(pub String);

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::TopLeft,
        Direction::TopCenter,
        Direction::TopRight,
        Direction::MidLeft,
        Direction::MidRight,
        Direction::BottomLeft,
        Direction::BottomCenter,
        Direction::BottomRight,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Direction::TopLeft => "lt",
            Direction::TopCenter => "ct",
            Direction::TopRight => "rt",
            Direction::MidLeft => "lm",
            Direction::MidRight => "rm",
            Direction::BottomLeft => "lb",
            Direction::BottomCenter => "cb",
            Direction::BottomRight => "rb",
        }
    }

    /// Screen-space unit vector; y grows downward.
    pub fn unit_vector(self) -> Vec2 {
        let d = FRAC_1_SQRT_2;
        match self {
            Direction::TopLeft => Vec2::new(-d, -d),
            Direction::TopCenter => Vec2::new(0.0, -1.0),
            Direction::TopRight => Vec2::new(d, -d),
            Direction::MidLeft => Vec2::new(-1.0, 0.0),
            Direction::MidRight => Vec2::new(1.0, 0.0),
            Direction::BottomLeft => Vec2::new(-d, d),
            Direction::BottomCenter => Vec2::new(0.0, 1.0),
            Direction::BottomRight => Vec2::new(d, d),
        }
    }

    pub const fn default_keys(self) -> &'static [KeyCode] {
        match self {
            Direction::TopLeft => &[KeyCode::ArrowLeft, KeyCode::ArrowUp],
            Direction::TopCenter => &[KeyCode::ArrowUp],
            Direction::TopRight => &[KeyCode::ArrowRight, KeyCode::ArrowUp],
            Direction::MidLeft => &[KeyCode::ArrowLeft],
            Direction::MidRight => &[KeyCode::ArrowRight],
            Direction::BottomLeft => &[KeyCode::ArrowLeft, KeyCode::ArrowDown],
            Direction::BottomCenter => &[KeyCode::ArrowDown],
            Direction::BottomRight => &[KeyCode::ArrowRight, KeyCode::ArrowDown],
        }
    }

    const fn keypad_key(self) -> KeyCode {
        match self {
            Direction::TopLeft => KeyCode::Numpad7,
            Direction::TopCenter => KeyCode::Numpad8,
            Direction::TopRight => KeyCode::Numpad9,
            Direction::MidLeft => KeyCode::Numpad4,
            Direction::MidRight => KeyCode::Numpad6,
            Direction::BottomLeft => KeyCode::Numpad1,
            Direction::BottomCenter => KeyCode::Numpad2,
            Direction::BottomRight => KeyCode::Numpad3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.code() == value.trim())
            .ok_or_else(|| InvalidDirection(value.to_string()))
    }
}

/// Place exit directions used by the transition map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compass {
    Up,
    Right,
    Down,
    Left,
}

impl Compass {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "^" => Some(Compass::Up),
            ">" => Some(Compass::Right),
            "v" => Some(Compass::Down),
            "<" => Some(Compass::Left),
            _ => None,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Compass::Up => '^',
            Compass::Right => '>',
            Compass::Down => 'v',
            Compass::Left => '<',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionBinding {
    pub direction: Direction,
    pub keys: Vec<KeyCode>,
}

/// Key chords per direction. A direction may be bound more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionKeyMap {
    bindings: Vec<DirectionBinding>,
}

impl Default for DirectionKeyMap {
    fn default() -> Self {
        let mut bindings = Vec::with_capacity(Direction::ALL.len() * 2);
        for direction in Direction::ALL {
            bindings.push(DirectionBinding {
                direction,
                keys: direction.default_keys().to_vec(),
            });
        }
        for direction in Direction::ALL {
            bindings.push(DirectionBinding {
                direction,
                keys: vec![direction.keypad_key()],
            });
        }
        Self { bindings }
    }
}

impl DirectionKeyMap {
    pub fn new(bindings: Vec<DirectionBinding>) -> Self {
        Self { bindings }
    }

    pub fn bind(&mut self, direction: Direction, keys: Vec<KeyCode>) {
        self.bindings.push(DirectionBinding { direction, keys });
    }

    pub fn bindings(&self) -> &[DirectionBinding] {
        &self.bindings
    }

    pub fn resolve(&self, pressed: &PressedKeys) -> Option<Direction> {
        resolve_direction(pressed, &self.bindings)
    }
}

/// Picks the binding whose keys are all held. More keys wins, then the lowest
/// sum of press-order indices, then the earliest binding.
pub fn resolve_direction(
    pressed: &PressedKeys,
    bindings: &[DirectionBinding],
) -> Option<Direction> {
    let mut best: Option<(usize, usize, Direction)> = None;

    for binding in bindings {
        if binding.keys.is_empty() {
            continue;
        }
        let mut order_sum = 0usize;
        let mut satisfied = true;
        for key in &binding.keys {
            match pressed.press_index(*key) {
                Some(index) => order_sum += index,
                None => {
                    satisfied = false;
                    break;
                }
            }
        }
        if !satisfied {
            continue;
        }

        let key_count = binding.keys.len();
        let better = match best {
            None => true,
            Some((best_count, best_sum, _)) => {
                key_count > best_count || (key_count == best_count && order_sum < best_sum)
            }
        };
        if better {
            best = Some((key_count, order_sum, binding.direction));
        }
    }

    best.map(|(_, _, direction)| direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrow_bindings() -> Vec<DirectionBinding> {
        vec![
            DirectionBinding {
                direction: Direction::MidLeft,
                keys: vec![KeyCode::ArrowLeft],
            },
            DirectionBinding {
                direction: Direction::TopCenter,
                keys: vec![KeyCode::ArrowUp],
            },
            DirectionBinding {
                direction: Direction::TopLeft,
                keys: vec![KeyCode::ArrowLeft, KeyCode::ArrowUp],
            },
        ]
    }

    #[test]
    fn diagonal_beats_single_axis_when_both_keys_held() {
        let pressed = PressedKeys::from_sequence(&[KeyCode::ArrowLeft, KeyCode::ArrowUp]);
        assert_eq!(
            resolve_direction(&pressed, &arrow_bindings()),
            Some(Direction::TopLeft)
        );
    }

    #[test]
    fn earlier_pressed_key_wins_between_equal_chords() {
        let pressed = PressedKeys::from_sequence(&[KeyCode::ArrowUp, KeyCode::ArrowLeft]);
        let bindings = vec![
            DirectionBinding {
                direction: Direction::MidLeft,
                keys: vec![KeyCode::ArrowLeft],
            },
            DirectionBinding {
                direction: Direction::TopCenter,
                keys: vec![KeyCode::ArrowUp],
            },
        ];
        assert_eq!(
            resolve_direction(&pressed, &bindings),
            Some(Direction::TopCenter)
        );
    }

    #[test]
    fn no_satisfied_binding_resolves_to_none() {
        let pressed = PressedKeys::from_sequence(&[KeyCode::KeyQ]);
        assert_eq!(resolve_direction(&pressed, &arrow_bindings()), None);
        assert_eq!(
            resolve_direction(&PressedKeys::default(), &arrow_bindings()),
            None
        );
    }

    #[test]
    fn default_map_resolves_arrows_and_keypad() {
        let map = DirectionKeyMap::default();
        let pressed = PressedKeys::from_sequence(&[KeyCode::ArrowDown, KeyCode::ArrowRight]);
        assert_eq!(map.resolve(&pressed), Some(Direction::BottomRight));

        let keypad = PressedKeys::from_sequence(&[KeyCode::Numpad7]);
        assert_eq!(map.resolve(&keypad), Some(Direction::TopLeft));
    }

    #[test]
    fn codes_parse_and_unknown_codes_fail() {
        for direction in Direction::ALL {
            assert_eq!(direction.code().parse::<Direction>(), Ok(direction));
        }
        assert_eq!(
            "up".parse::<Direction>(),
            Err(InvalidDirection("up".to_string()))
        );
    }

    #[test]
    fn unit_vectors_have_unit_length() {
        for direction in Direction::ALL {
            let v = direction.unit_vector();
            let length = (v.x * v.x + v.y * v.y).sqrt();
            assert!((length - 1.0).abs() < 1e-5, "direction={direction}");
        }
    }

    #[test]
    fn compass_symbols_round_trip() {
        for compass in [Compass::Up, Compass::Right, Compass::Down, Compass::Left] {
            let symbol = compass.symbol().to_string();
            assert_eq!(Compass::from_symbol(&symbol), Some(compass));
        }
        assert_eq!(Compass::from_symbol("x"), None);
    }
}
