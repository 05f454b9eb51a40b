//! Hex color arithmetic for bars, swimlanes and text contrast.

const BLACK: &str = "#000000";
const WHITE: &str = "#ffffff";

/// Threshold of the YIQ brightness above which dark text is used.
const YIQ_THRESHOLD: u32 = 128;

/// Parses `#rgb` or `#rrggbb` (the hash is optional).
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |index: usize| u8::from_str_radix(expanded.get(index..index + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

pub fn to_hex((red, green, blue): (u8, u8, u8)) -> String {
    format!("#{red:02x}{green:02x}{blue:02x}")
}

/// Moves a color towards white by `percent` (0.0 to 1.0).
///
/// Unparsable input is returned unchanged.
pub fn shade_color(color: &str, percent: f64) -> String {
    let Some((red, green, blue)) = parse_hex(color) else {
        return color.to_string();
    };
    let percent = percent.clamp(0.0, 1.0);
    let shade = |channel: u8| {
        let channel = f64::from(channel);
        (channel + (255.0 - channel) * percent).round() as u8
    };
    to_hex((shade(red), shade(green), shade(blue)))
}

/// Picks black or white text for a background color.
pub fn contrast_color(background: &str) -> String {
    let Some((red, green, blue)) = parse_hex(background) else {
        return BLACK.to_string();
    };
    let yiq = (u32::from(red) * 299 + u32::from(green) * 587 + u32::from(blue) * 114) / 1000;
    if yiq >= YIQ_THRESHOLD {
        BLACK.to_string()
    } else {
        WHITE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{contrast_color, parse_hex, shade_color};

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(parse_hex("#fff"), Some((255, 255, 255)));
        assert_eq!(parse_hex("253746"), Some((0x25, 0x37, 0x46)));
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn shading_moves_towards_white() {
        assert_eq!(shade_color("#000000", 0.5), "#808080");
        assert_eq!(shade_color("#ff0000", 0.0), "#ff0000");
        assert_eq!(shade_color("#ff0000", 1.0), "#ffffff");
        assert_eq!(shade_color("not a color", 0.5), "not a color");
    }

    #[test]
    fn contrast_depends_on_brightness() {
        assert_eq!(contrast_color("#ffffff"), "#000000");
        assert_eq!(contrast_color("#253746"), "#ffffff");
        assert_eq!(contrast_color(""), "#000000");
    }
}
