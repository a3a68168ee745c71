/// Interactive commands accepted while monitoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    SetThreshold(f32),
    SetCooldown(f32),
    /// Calibration window in seconds
    Calibrate(f32),
    Help,
}

pub const DEFAULT_CALIBRATION_SECS: f32 = 5.0;

/// Parse one input line: `q`, `t<dB>`, `c<secs>`, `a[<secs>]`, `h`/`?`.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let mut chars = line.chars();
    let head = match chars.next() {
        Some(c) => c,
        None => return Err("empty command".to_string()),
    };
    let rest = chars.as_str().trim();
    match head {
        'q' | 'Q' if rest.is_empty() => Ok(Command::Quit),
        'h' | '?' if rest.is_empty() => Ok(Command::Help),
        't' | 'T' => parse_value(rest, 0.0)
            .map(Command::SetThreshold)
            .ok_or_else(|| "Invalid threshold format. Example: t75".to_string()),
        'c' | 'C' => parse_value(rest, 0.0)
            .map(Command::SetCooldown)
            .ok_or_else(|| "Invalid cooldown format. Example: c10".to_string()),
        'a' | 'A' => {
            if rest.is_empty() {
                Ok(Command::Calibrate(DEFAULT_CALIBRATION_SECS))
            } else {
                parse_value(rest, f32::MIN_POSITIVE)
                    .map(Command::Calibrate)
                    .ok_or_else(|| "Invalid calibration duration. Example: a10".to_string())
            }
        }
        _ => Err(format!("Unknown command: {}", line)),
    }
}

fn parse_value(text: &str, min: f32) -> Option<f32> {
    let value: f32 = text.parse().ok()?;
    if value.is_finite() && value >= min {
        Some(value)
    } else {
        None
    }
}
