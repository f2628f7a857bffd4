//! Style sheet parser.
//!
//! Parsing never fails: rules whose selectors cannot be parsed are dropped,
//! unknown at-rules are skipped and blocks left open at the end of input
//! are closed implicitly.

use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_until, take_while1},
    character::complete::{char, digit0, digit1, multispace1, one_of},
    combinator::{map_res, opt, recognize, rest, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, preceded},
};

use crate::selector::SelectorList;

/// Media a style sheet is evaluated for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Media {
    #[default]
    Screen,
    Print,
}

/// A parsed style sheet.
#[derive(Clone, Debug, Default)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug)]
pub enum Rule {
    Style(StyleRule),
    Media(MediaRule),
    /// `@page` declarations.
    Page(Vec<Declaration>),
}

#[derive(Clone, Debug)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug)]
pub struct MediaRule {
    pub query: String,
    pub rules: Vec<Rule>,
}

impl MediaRule {
    /// Evaluate the media query list for `media`.
    ///
    /// Only media types are evaluated; feature conditions are assumed true.
    pub fn applies_to(&self, media: Media) -> bool {
        self.query.split(',').any(|query| query_matches(query, media))
    }
}

fn query_matches(query: &str, media: Media) -> bool {
    let query = query.trim().to_ascii_lowercase();
    let (negated, query) = match query.strip_prefix("not ") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, query.strip_prefix("only ").unwrap_or(&query).trim_start()),
    };
    let media_type = query.split_whitespace().next().unwrap_or("all");
    let matched = match media_type {
        "all" => true,
        "print" => media == Media::Print,
        "screen" => media == Media::Screen,
        // A bare feature condition such as `(min-width: 600px)`.
        t if t.starts_with('(') => true,
        _ => false,
    };
    matched != negated
}

/// A `name: value` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercased property name.
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            value: value.trim().to_owned(),
            important: false,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.important {
            write!(f, "{}: {} !important;", self.name, self.value)
        } else {
            write!(f, "{}: {};", self.name, self.value)
        }
    }
}

impl Stylesheet {
    /// Parse a style sheet.
    pub fn parse(css: &str) -> Self {
        let (_, rules) = rule_list(css);
        Self { rules }
    }

    /// Append the rules of another sheet.
    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
    }

    /// Style rules that apply to `media`, in source order.
    pub fn style_rules(&self, media: Media) -> Vec<&StyleRule> {
        let mut result = Vec::new();
        collect_style_rules(&self.rules, media, &mut result);
        result
    }

    /// `@page` declarations, later ones last.
    pub fn page_declarations(&self, media: Media) -> Vec<&Declaration> {
        let mut result = Vec::new();
        collect_page_declarations(&self.rules, media, &mut result);
        result
    }
}

fn collect_style_rules<'a>(rules: &'a [Rule], media: Media, out: &mut Vec<&'a StyleRule>) {
    for rule in rules {
        match rule {
            Rule::Style(style) => out.push(style),
            Rule::Media(media_rule) if media_rule.applies_to(media) => {
                collect_style_rules(&media_rule.rules, media, out);
            }
            Rule::Media(_) | Rule::Page(_) => {}
        }
    }
}

fn collect_page_declarations<'a>(rules: &'a [Rule], media: Media, out: &mut Vec<&'a Declaration>) {
    for rule in rules {
        match rule {
            Rule::Page(declarations) => out.extend(declarations),
            Rule::Media(media_rule) if media_rule.applies_to(media) => {
                collect_page_declarations(&media_rule.rules, media, out);
            }
            Rule::Media(_) | Rule::Style(_) => {}
        }
    }
}

fn comment(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(tag("/*"), take_until("*/"), tag("*/")),
        // Unterminated comments run to the end of input.
        preceded(tag("/*"), rest),
    ))
    .parse(input)
}

/// A decimal number without exponent, so `1em` parses as `1` and `em`.
pub(crate) fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize((
            opt(one_of("+-")),
            alt((
                recognize((digit1, opt((char('.'), digit0)))),
                recognize((char('.'), digit1)),
            )),
        )),
        str::parse::<f64>,
    )
    .parse(input)
}

/// Whitespace, comments and stray `<!--`/`-->` tokens.
fn junk(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, comment, tag("<!--"), tag("-->"), tag(";")))),
    )
    .parse(input)
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn prelude(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == '{' || c == '}' || c == ';').parse(input)
}

/// A `{ ... }` block; returns its inner text.
///
/// Nested blocks, strings and comments are skipped over. A block still open
/// at the end of input takes the rest of it.
fn block(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('{').parse(input)?;
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Ok((&body[i + 1..], &body[..i])),
            b'}' => depth -= 1,
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = body[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 1);
            }
            _ => {}
        }
        i += 1;
    }
    Ok(("", body))
}

fn rule_list(mut input: &str) -> (&str, Vec<Rule>) {
    let mut rules = Vec::new();
    loop {
        if let Ok((remaining, ())) = junk(input) {
            input = remaining;
        }
        if input.is_empty() {
            return (input, rules);
        }
        let parsed = if input.starts_with('@') {
            at_rule(input)
        } else {
            style_rule(input)
        };
        match parsed {
            Ok((remaining, rule)) => {
                rules.extend(rule);
                input = remaining;
            }
            // Stray closing brace or garbage: skip one character.
            Err(_) => {
                let skip = input.chars().next().map_or(1, char::len_utf8);
                input = &input[skip..];
            }
        }
    }
}

fn at_rule(input: &str) -> IResult<&str, Option<Rule>> {
    let (input, name) = preceded(char('@'), ident).parse(input)?;
    let (input, prelude_text) = prelude(input)?;
    if let Ok((input, _)) = char::<&str, Error<&str>>(';').parse(input) {
        return Ok((input, None));
    }
    let (input, body) = block(input)?;

    let rule = match name.to_ascii_lowercase().as_str() {
        "media" => Some(Rule::Media(MediaRule {
            query: strip_comments(prelude_text).trim().to_owned(),
            rules: rule_list(body).1,
        })),
        "page" => Some(Rule::Page(parse_declarations(body))),
        other => {
            tracing::debug!(rule = other, "Skipping unsupported at-rule");
            None
        }
    };
    Ok((input, rule))
}

fn style_rule(input: &str) -> IResult<&str, Option<Rule>> {
    let (input, selector_text) = prelude(input)?;
    if !input.starts_with('{') {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }
    let (input, body) = block(input)?;

    let selector_text = strip_comments(selector_text);
    match SelectorList::parse(selector_text.trim()) {
        Ok(selectors) => Ok((
            input,
            Some(Rule::Style(StyleRule {
                selectors,
                declarations: parse_declarations(body),
            })),
        )),
        Err(err) => {
            tracing::debug!(selector = %selector_text.trim(), %err, "Dropping rule with invalid selector");
            Ok((input, None))
        }
    }
}

fn strip_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;
    while let Some(start) = remaining.find("/*") {
        result.push_str(&remaining[..start]);
        remaining = match remaining[start + 2..].find("*/") {
            Some(end) => &remaining[start + 2 + end + 2..],
            None => "",
        };
    }
    result.push_str(remaining);
    result
}

/// Parse a declaration block body (also used for `style` attributes).
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    split_top_level(&strip_comments(body), ';')
        .into_iter()
        .filter_map(parse_declaration)
        .collect()
}

fn parse_declaration(text: &str) -> Option<Declaration> {
    let (name, value) = text.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return None;
    }

    let mut value = value.trim();
    let mut important = false;
    if let Some(bang) = value.rfind('!')
        && value[bang + 1..].trim().eq_ignore_ascii_case("important")
    {
        important = true;
        value = value[..bang].trim_end();
    }
    if value.is_empty() {
        return None;
    }

    Some(Declaration {
        name: name.to_ascii_lowercase(),
        value: value.to_owned(),
        important,
    })
}

/// Split on `separator` outside parentheses and quotes.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split a value into whitespace-separated components, keeping
/// parenthesized groups such as `rgb(1, 2, 3)` together.
pub(crate) fn split_components(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(begin) = start.take() {
                    parts.push(&value[begin..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(begin) = start {
        parts.push(&value[begin..]);
    }
    parts
}
