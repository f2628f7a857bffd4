//! CSS color values.

use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag_no_case, take_while_m_n},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map_opt, opt},
    multi::separated_list1,
    sequence::{delimited, preceded, terminated},
};

use crate::css::number;

/// An sRGB color with alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `0.0..=1.0`.
    pub a: f64,
}

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("red", (255, 0, 0)),
    ("green", (0, 128, 0)),
    ("blue", (0, 0, 255)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("silver", (192, 192, 192)),
    ("maroon", (128, 0, 0)),
    ("purple", (128, 0, 128)),
    ("fuchsia", (255, 0, 255)),
    ("magenta", (255, 0, 255)),
    ("lime", (0, 255, 0)),
    ("olive", (128, 128, 0)),
    ("yellow", (255, 255, 0)),
    ("navy", (0, 0, 128)),
    ("teal", (0, 128, 128)),
    ("aqua", (0, 255, 255)),
    ("cyan", (0, 255, 255)),
    ("orange", (255, 165, 0)),
    ("darkgray", (169, 169, 169)),
    ("lightgray", (211, 211, 211)),
    ("whitesmoke", (245, 245, 245)),
];

impl Rgba {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse a color value. `currentcolor` is left to the caller.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("transparent") {
            return Some(Self::TRANSPARENT);
        }
        if let Some(&(_, (r, g, b))) = NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(input))
        {
            return Some(Self::rgb(r, g, b));
        }
        all_consuming(alt((hex_color, rgb_function)))
            .parse(input)
            .ok()
            .map(|(_, color)| color)
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Composite this color over an opaque backdrop.
    pub fn over(&self, backdrop: Self) -> Self {
        let blend = |top: u8, bottom: u8| {
            to_channel(f64::from(top) * self.a + f64::from(bottom) * (1.0 - self.a))
        };
        Self::rgb(
            blend(self.r, backdrop.r),
            blend(self.g, backdrop.g),
            blend(self.b, backdrop.b),
        )
    }

    /// Channels scaled to `0.0..=1.0`.
    pub fn unit_channels(&self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }
}

/// Serialized the way browsers report computed colors.
impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            let alpha = (self.a * 1000.0).round() / 1000.0;
            write!(f, "rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn hex_digits(input: &str) -> IResult<&str, &str> {
    take_while_m_n(3, 8, |c: char| c.is_ascii_hexdigit()).parse(input)
}

fn hex_color(input: &str) -> IResult<&str, Rgba> {
    map_opt(preceded(char('#'), hex_digits), expand_hex).parse(input)
}

fn expand_hex(digits: &str) -> Option<Rgba> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let short = |i: usize| channel(&digits[i..=i].repeat(2));
    let long = |i: usize| channel(&digits[i * 2..i * 2 + 2]);
    match digits.len() {
        3 => Some(Rgba::rgb(short(0)?, short(1)?, short(2)?)),
        4 => Some(Rgba {
            a: f64::from(short(3)?) / 255.0,
            ..Rgba::rgb(short(0)?, short(1)?, short(2)?)
        }),
        6 => Some(Rgba::rgb(long(0)?, long(1)?, long(2)?)),
        8 => Some(Rgba {
            a: f64::from(long(3)?) / 255.0,
            ..Rgba::rgb(long(0)?, long(1)?, long(2)?)
        }),
        _ => None,
    }
}

/// A number optionally followed by `%`.
fn component(input: &str) -> IResult<&str, (f64, bool)> {
    let (input, amount) = number(input)?;
    let (input, percent) = opt(char('%')).parse(input)?;
    Ok((input, (amount, percent.is_some())))
}

fn rgb_function(input: &str) -> IResult<&str, Rgba> {
    let (input, _) = terminated(alt((tag_no_case("rgba"), tag_no_case("rgb"))), char('(')).parse(input)?;
    let separator = alt((
        delimited(multispace0, char(','), multispace0),
        delimited(multispace0, char('/'), multispace0),
        terminated(char(' '), multispace0),
    ));
    let (input, parts) = delimited(
        multispace0,
        separated_list1(separator, component),
        (multispace0, char(')')),
    )
    .parse(input)?;

    if !(3..=4).contains(&parts.len()) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Count)));
    }
    let channel = |(value, percent): (f64, bool)| to_channel(if percent { value * 2.55 } else { value });
    let alpha = parts.get(3).map_or(1.0, |&(value, percent)| {
        let alpha = if percent { value / 100.0 } else { value };
        alpha.clamp(0.0, 1.0)
    });
    Ok((
        input,
        Rgba {
            r: channel(parts[0]),
            g: channel(parts[1]),
            b: channel(parts[2]),
            a: alpha,
        },
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(Rgba::parse("#1a1b26"), Some(Rgba::rgb(0x1a, 0x1b, 0x26)));
        assert_eq!(Rgba::parse("#fff"), Some(Rgba::WHITE));
        assert_eq!(
            Rgba::parse("#7aa2f720").map(|c| c.to_string()).as_deref(),
            Some("rgba(122, 162, 247, 0.125)")
        );
        assert_eq!(Rgba::parse("#12345"), None);
        assert_eq!(Rgba::parse("#ggg"), None);
    }

    #[test]
    fn test_functions_and_names() {
        assert_eq!(Rgba::parse("rgb(1, 2, 3)"), Some(Rgba::rgb(1, 2, 3)));
        assert_eq!(Rgba::parse("rgb(1 2 3)"), Some(Rgba::rgb(1, 2, 3)));
        assert_eq!(
            Rgba::parse("rgba(0, 0, 0, 0.5)").map(|c| c.to_string()).as_deref(),
            Some("rgba(0, 0, 0, 0.5)")
        );
        assert_eq!(Rgba::parse("RED"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(Rgba::parse("transparent").map(|c| c.is_transparent()), Some(true));
        assert_eq!(Rgba::parse("currentColor"), None);
    }

    #[test]
    fn test_over() {
        let half_white = Rgba { a: 0.5, ..Rgba::WHITE };
        assert_eq!(half_white.over(Rgba::BLACK), Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn test_display_opaque() {
        assert_eq!(Rgba::rgb(192, 202, 245).to_string(), "rgb(192, 202, 245)");
    }
}
