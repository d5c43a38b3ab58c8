// src/playback/transport.rs

use crossterm::event::KeyCode;

/// The four supported playback speeds (§3, §6), in cycle order.
pub const SPEED_STEPS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

/// A parsed runtime control key (§6), decoupled from `crossterm`'s event
/// type so the driver's state machine stays testable without a terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    VolumeUp,
    VolumeDown,
    TogglePause,
    SeekForward,
    SeekBackward,
    NextTrack,
    PrevTrack,
    SpeedDown,
    SpeedUp,
    SelectPreset(usize),
    Quit,
}

/// Maps a key event to a [`TransportCommand`]; `preset_count` bounds which
/// digit keys are meaningful (`1..=preset_count`).
pub fn parse_key(code: KeyCode, preset_count: usize) -> Option<TransportCommand> {
    match code {
        KeyCode::Char('+') => Some(TransportCommand::VolumeUp),
        KeyCode::Char('-') => Some(TransportCommand::VolumeDown),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(TransportCommand::TogglePause),
        KeyCode::Char('f') => Some(TransportCommand::SeekForward),
        KeyCode::Char('b') => Some(TransportCommand::SeekBackward),
        KeyCode::Char('.') => Some(TransportCommand::NextTrack),
        KeyCode::Char(',') => Some(TransportCommand::PrevTrack),
        KeyCode::Char('[') => Some(TransportCommand::SpeedDown),
        KeyCode::Char(']') => Some(TransportCommand::SpeedUp),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(TransportCommand::Quit),
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let n = c.to_digit(10).unwrap() as usize;
            if n >= 1 && n <= preset_count {
                Some(TransportCommand::SelectPreset(n - 1))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Cycles to the next higher speed step, clamping at the top of [`SPEED_STEPS`].
pub fn speed_up(current: f64) -> f64 {
    let idx = closest_step_index(current);
    SPEED_STEPS[(idx + 1).min(SPEED_STEPS.len() - 1)]
}

/// Cycles to the next lower speed step, clamping at the bottom of [`SPEED_STEPS`].
pub fn speed_down(current: f64) -> f64 {
    let idx = closest_step_index(current);
    SPEED_STEPS[idx.saturating_sub(1)]
}

fn closest_step_index(current: f64) -> usize {
    SPEED_STEPS
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - current).abs().partial_cmp(&(*b - current).abs()).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_volume_and_pause_keys() {
        assert_eq!(parse_key(KeyCode::Char('+'), 3), Some(TransportCommand::VolumeUp));
        assert_eq!(parse_key(KeyCode::Char('-'), 3), Some(TransportCommand::VolumeDown));
        assert_eq!(parse_key(KeyCode::Char('p'), 3), Some(TransportCommand::TogglePause));
    }

    #[test]
    fn parses_seek_and_track_keys() {
        assert_eq!(parse_key(KeyCode::Char('f'), 3), Some(TransportCommand::SeekForward));
        assert_eq!(parse_key(KeyCode::Char('b'), 3), Some(TransportCommand::SeekBackward));
        assert_eq!(parse_key(KeyCode::Char('.'), 3), Some(TransportCommand::NextTrack));
        assert_eq!(parse_key(KeyCode::Char(','), 3), Some(TransportCommand::PrevTrack));
    }

    #[test]
    fn parses_speed_keys() {
        assert_eq!(parse_key(KeyCode::Char('['), 3), Some(TransportCommand::SpeedDown));
        assert_eq!(parse_key(KeyCode::Char(']'), 3), Some(TransportCommand::SpeedUp));
    }

    #[test]
    fn digit_keys_bounded_by_preset_count() {
        assert_eq!(parse_key(KeyCode::Char('1'), 3), Some(TransportCommand::SelectPreset(0)));
        assert_eq!(parse_key(KeyCode::Char('3'), 3), Some(TransportCommand::SelectPreset(2)));
        assert_eq!(parse_key(KeyCode::Char('4'), 3), None);
        assert_eq!(parse_key(KeyCode::Char('0'), 3), None);
    }

    #[test]
    fn unrecognised_key_is_none() {
        assert_eq!(parse_key(KeyCode::Char('z'), 3), None);
    }

    #[test]
    fn speed_cycles_through_steps_without_overshoot() {
        assert_eq!(speed_up(1.0), 1.5);
        assert_eq!(speed_up(2.0), 2.0);
        assert_eq!(speed_down(1.0), 0.5);
        assert_eq!(speed_down(0.5), 0.5);
    }
}
