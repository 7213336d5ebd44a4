//! CSS color parsing and hex formatting for the color literals of the
//! expression language.

use std::fmt;

/// An RGBA color with every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

pub const WHITE: Rgba = Rgba {
    r: 1.0,
    g: 1.0,
    b: 1.0,
    a: 1.0,
};

impl Rgba {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
            a: clamp_unit(a),
        }
    }

    /// Builds a color from 0-255 channel values and a 0-1 alpha.
    pub fn from_bytes(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self::new(r / 255.0, g / 255.0, b / 255.0, a)
    }

    /// Builds a color from hue, saturation and lightness, each in `[0, 1]`.
    pub fn from_hsl(h: f64, s: f64, l: f64, a: f64) -> Self {
        let h = h.rem_euclid(1.0);
        let s = clamp_unit(s);
        let l = clamp_unit(l);
        if s == 0.0 {
            return Self::new(l, l, l, a);
        }
        let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let m1 = 2.0 * l - m2;
        Self::new(
            hue_to_rgb(m1, m2, h + 1.0 / 3.0),
            hue_to_rgb(m1, m2, h),
            hue_to_rgb(m1, m2, h - 1.0 / 3.0),
            a,
        )
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: clamp_unit(a),
            ..self
        }
    }

    /// Formats as `#RRGGBB`, or `#RRGGBBAA` when the color is not opaque.
    pub fn to_css_hex(&self) -> String {
        let alpha = to_byte(self.a);
        if alpha == 255 {
            format!(
                "#{:02X}{:02X}{:02X}",
                to_byte(self.r),
                to_byte(self.g),
                to_byte(self.b)
            )
        } else {
            format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                to_byte(self.r),
                to_byte(self.g),
                to_byte(self.b),
                alpha
            )
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_hex())
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn to_byte(v: f64) -> u8 {
    (clamp_unit(v) * 255.0).round() as u8
}

fn hue_to_rgb(m1: f64, m2: f64, h: f64) -> f64 {
    let h = h.rem_euclid(1.0);
    if h * 6.0 < 1.0 {
        m1 + (m2 - m1) * 6.0 * h
    } else if h * 2.0 < 1.0 {
        m2
    } else if h * 3.0 < 2.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
    } else {
        m1
    }
}

/// Parses any CSS color string: named colors, `#rgb`, `#rgba`, `#rrggbb`,
/// `#rrggbbaa`, `rgb()`/`rgba()` with numeric or percentage channels, and
/// `hsl()`/`hsla()`. Both the comma and the space/slash syntaxes are
/// accepted. Returns `None` when the string is not a color.
pub fn parse_css_color(input: &str) -> Option<Rgba> {
    let s = input.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(open) = s.find('(') {
        let name = s[..open].trim();
        let inner = s[open + 1..].strip_suffix(')')?;
        let args = split_args(inner)?;
        return match name {
            "rgb" | "rgba" => parse_rgb_args(&args),
            "hsl" | "hsla" => parse_hsl_args(&args),
            _ => None,
        };
    }
    named_color(&s)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => (digit(0)?, digit(1)?, digit(2)?, 255),
        4 => (digit(0)?, digit(1)?, digit(2)?, digit(3)?),
        6 => (pair(0)?, pair(2)?, pair(4)?, 255),
        8 => (pair(0)?, pair(2)?, pair(4)?, pair(6)?),
        _ => return None,
    };
    Some(Rgba::from_bytes(
        r as f64,
        g as f64,
        b as f64,
        a as f64 / 255.0,
    ))
}

/// Splits `"255, 0, 0, 0.5"` or `"255 0 0 / 50%"` into channel strings.
fn split_args(inner: &str) -> Option<Vec<&str>> {
    let args: Vec<&str> = if inner.contains(',') {
        inner.split(',').map(str::trim).collect()
    } else {
        inner
            .split(|c: char| c.is_whitespace() || c == '/')
            .filter(|p| !p.is_empty())
            .collect()
    };
    if args.len() == 3 || args.len() == 4 {
        Some(args)
    } else {
        None
    }
}

/// A number, or a percentage scaled so `100%` equals `full`.
fn parse_channel(arg: &str, full: f64) -> Option<f64> {
    match arg.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok().map(|p| p / 100.0 * full),
        None => arg.parse::<f64>().ok(),
    }
}

fn parse_alpha(args: &[&str]) -> Option<f64> {
    match args.get(3) {
        Some(a) => parse_channel(a, 1.0),
        None => Some(1.0),
    }
}

fn parse_rgb_args(args: &[&str]) -> Option<Rgba> {
    let r = parse_channel(args[0], 255.0)?;
    let g = parse_channel(args[1], 255.0)?;
    let b = parse_channel(args[2], 255.0)?;
    Some(Rgba::from_bytes(r, g, b, parse_alpha(args)?))
}

fn parse_hsl_args(args: &[&str]) -> Option<Rgba> {
    let h = args[0].trim_end_matches("deg").parse::<f64>().ok()? / 360.0;
    let s = parse_channel(args[1], 1.0)?;
    let l = parse_channel(args[2], 1.0)?;
    Some(Rgba::from_hsl(h, s, l, parse_alpha(args)?))
}

fn named_color(name: &str) -> Option<Rgba> {
    if name == "transparent" {
        return Some(Rgba::new(0.0, 0.0, 0.0, 0.0));
    }
    NAMED_COLORS
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|i| {
            let rgb = NAMED_COLORS[i].1;
            Rgba::from_bytes(
                ((rgb >> 16) & 0xFF) as f64,
                ((rgb >> 8) & 0xFF) as f64,
                (rgb & 0xFF) as f64,
                1.0,
            )
        })
}

/// CSS named colors, sorted by name for binary search.
static NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xF0F8FF),
    ("antiquewhite", 0xFAEBD7),
    ("aqua", 0x00FFFF),
    ("aquamarine", 0x7FFFD4),
    ("azure", 0xF0FFFF),
    ("beige", 0xF5F5DC),
    ("bisque", 0xFFE4C4),
    ("black", 0x000000),
    ("blanchedalmond", 0xFFEBCD),
    ("blue", 0x0000FF),
    ("blueviolet", 0x8A2BE2),
    ("brown", 0xA52A2A),
    ("burlywood", 0xDEB887),
    ("cadetblue", 0x5F9EA0),
    ("chartreuse", 0x7FFF00),
    ("chocolate", 0xD2691E),
    ("coral", 0xFF7F50),
    ("cornflowerblue", 0x6495ED),
    ("cornsilk", 0xFFF8DC),
    ("crimson", 0xDC143C),
    ("cyan", 0x00FFFF),
    ("darkblue", 0x00008B),
    ("darkcyan", 0x008B8B),
    ("darkgoldenrod", 0xB8860B),
    ("darkgray", 0xA9A9A9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xA9A9A9),
    ("darkkhaki", 0xBDB76B),
    ("darkmagenta", 0x8B008B),
    ("darkolivegreen", 0x556B2F),
    ("darkorange", 0xFF8C00),
    ("darkorchid", 0x9932CC),
    ("darkred", 0x8B0000),
    ("darksalmon", 0xE9967A),
    ("darkseagreen", 0x8FBC8F),
    ("darkslateblue", 0x483D8B),
    ("darkslategray", 0x2F4F4F),
    ("darkslategrey", 0x2F4F4F),
    ("darkturquoise", 0x00CED1),
    ("darkviolet", 0x9400D3),
    ("deeppink", 0xFF1493),
    ("deepskyblue", 0x00BFFF),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1E90FF),
    ("firebrick", 0xB22222),
    ("floralwhite", 0xFFFAF0),
    ("forestgreen", 0x228B22),
    ("fuchsia", 0xFF00FF),
    ("gainsboro", 0xDCDCDC),
    ("ghostwhite", 0xF8F8FF),
    ("gold", 0xFFD700),
    ("goldenrod", 0xDAA520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xADFF2F),
    ("grey", 0x808080),
    ("honeydew", 0xF0FFF0),
    ("hotpink", 0xFF69B4),
    ("indianred", 0xCD5C5C),
    ("indigo", 0x4B0082),
    ("ivory", 0xFFFFF0),
    ("khaki", 0xF0E68C),
    ("lavender", 0xE6E6FA),
    ("lavenderblush", 0xFFF0F5),
    ("lawngreen", 0x7CFC00),
    ("lemonchiffon", 0xFFFACD),
    ("lightblue", 0xADD8E6),
    ("lightcoral", 0xF08080),
    ("lightcyan", 0xE0FFFF),
    ("lightgoldenrodyellow", 0xFAFAD2),
    ("lightgray", 0xD3D3D3),
    ("lightgreen", 0x90EE90),
    ("lightgrey", 0xD3D3D3),
    ("lightpink", 0xFFB6C1),
    ("lightsalmon", 0xFFA07A),
    ("lightseagreen", 0x20B2AA),
    ("lightskyblue", 0x87CEFA),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xB0C4DE),
    ("lightyellow", 0xFFFFE0),
    ("lime", 0x00FF00),
    ("limegreen", 0x32CD32),
    ("linen", 0xFAF0E6),
    ("magenta", 0xFF00FF),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66CDAA),
    ("mediumblue", 0x0000CD),
    ("mediumorchid", 0xBA55D3),
    ("mediumpurple", 0x9370DB),
    ("mediumseagreen", 0x3CB371),
    ("mediumslateblue", 0x7B68EE),
    ("mediumspringgreen", 0x00FA9A),
    ("mediumturquoise", 0x48D1CC),
    ("mediumvioletred", 0xC71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xF5FFFA),
    ("mistyrose", 0xFFE4E1),
    ("moccasin", 0xFFE4B5),
    ("navajowhite", 0xFFDEAD),
    ("navy", 0x000080),
    ("oldlace", 0xFDF5E6),
    ("olive", 0x808000),
    ("olivedrab", 0x6B8E23),
    ("orange", 0xFFA500),
    ("orangered", 0xFF4500),
    ("orchid", 0xDA70D6),
    ("palegoldenrod", 0xEEE8AA),
    ("palegreen", 0x98FB98),
    ("paleturquoise", 0xAFEEEE),
    ("palevioletred", 0xDB7093),
    ("papayawhip", 0xFFEFD5),
    ("peachpuff", 0xFFDAB9),
    ("peru", 0xCD853F),
    ("pink", 0xFFC0CB),
    ("plum", 0xDDA0DD),
    ("powderblue", 0xB0E0E6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xFF0000),
    ("rosybrown", 0xBC8F8F),
    ("royalblue", 0x4169E1),
    ("saddlebrown", 0x8B4513),
    ("salmon", 0xFA8072),
    ("sandybrown", 0xF4A460),
    ("seagreen", 0x2E8B57),
    ("seashell", 0xFFF5EE),
    ("sienna", 0xA0522D),
    ("silver", 0xC0C0C0),
    ("skyblue", 0x87CEEB),
    ("slateblue", 0x6A5ACD),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xFFFAFA),
    ("springgreen", 0x00FF7F),
    ("steelblue", 0x4682B4),
    ("tan", 0xD2B48C),
    ("teal", 0x008080),
    ("thistle", 0xD8BFD8),
    ("tomato", 0xFF6347),
    ("turquoise", 0x40E0D0),
    ("violet", 0xEE82EE),
    ("wheat", 0xF5DEB3),
    ("white", 0xFFFFFF),
    ("whitesmoke", 0xF5F5F5),
    ("yellow", 0xFFFF00),
    ("yellowgreen", 0x9ACD32),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(css: &str) -> Option<String> {
        parse_css_color(css).map(|c| c.to_css_hex())
    }

    #[test]
    fn test_named_colors_are_sorted() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_named() {
        assert_eq!(hex("red").as_deref(), Some("#FF0000"));
        assert_eq!(hex("RebeccaPurple").as_deref(), Some("#663399"));
        assert_eq!(hex("transparent").as_deref(), Some("#00000000"));
        assert_eq!(hex("notacolor"), None);
    }

    #[test]
    fn test_hex_forms() {
        assert_eq!(hex("#f00").as_deref(), Some("#FF0000"));
        assert_eq!(hex("#f008").as_deref(), Some("#FF000088"));
        assert_eq!(hex("#00ff00").as_deref(), Some("#00FF00"));
        assert_eq!(hex("#0000ff80").as_deref(), Some("#0000FF80"));
        assert_eq!(hex("#12345"), None);
        assert_eq!(hex("#ggg"), None);
    }

    #[test]
    fn test_functional_forms() {
        assert_eq!(hex("rgb(255, 0, 0)").as_deref(), Some("#FF0000"));
        assert_eq!(hex("rgba(0, 0, 255, 0.5)").as_deref(), Some("#0000FF80"));
        assert_eq!(hex("rgb(100%, 0%, 0%)").as_deref(), Some("#FF0000"));
        assert_eq!(hex("rgb(0 255 0 / 50%)").as_deref(), Some("#00FF0080"));
        assert_eq!(hex("hsl(120, 100%, 50%)").as_deref(), Some("#00FF00"));
        assert_eq!(hex("hsla(240, 100%, 50%, 1)").as_deref(), Some("#0000FF"));
        assert_eq!(hex("rgb(1, 2)"), None);
        assert_eq!(hex("cmyk(0, 0, 0, 0)"), None);
    }

    #[test]
    fn test_hsl_grey() {
        assert_eq!(Rgba::from_hsl(0.0, 0.0, 0.5, 1.0).to_css_hex(), "#808080");
    }

    #[test]
    fn test_channels_are_clamped() {
        assert_eq!(Rgba::from_bytes(300.0, -5.0, 0.0, 2.0).to_css_hex(), "#FF0000");
    }
}
