//! Diverging blue-white-red scale for the difference bars.

use plotters::style::RGBColor;

const COLD: RGBColor = RGBColor(59, 76, 192);
const NEUTRAL: RGBColor = RGBColor(221, 221, 221);
const WARM: RGBColor = RGBColor(180, 4, 38);

/// Colour of `value` on a scale centred at zero that saturates at `±range`.
pub fn diverging_color(value: f64, range: f64) -> RGBColor {
    if !value.is_finite() || range <= 0.0 {
        return NEUTRAL;
    }

    let t = (value / range).clamp(-1.0, 1.0);
    if t < 0.0 {
        lerp(NEUTRAL, COLD, -t)
    } else {
        lerp(NEUTRAL, WARM, t)
    }
}

fn lerp(from: RGBColor, to: RGBColor, t: f64) -> RGBColor {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

// -- Tests -------------------------------------------------------------------
