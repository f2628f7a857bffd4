//! CSS selectors.
//!
//! Supports type, universal, class, id and attribute selectors, the
//! structural pseudo-classes (`:first-child`, `:last-child`,
//! `:nth-child()`, `:not()`) and all four combinators. Dynamic
//! pseudo-classes like `:hover` parse but never match, and selectors ending
//! in a pseudo-element never match an element.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace0, multispace1, one_of},
    combinator::{all_consuming, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded},
};

use crate::tree::{NodeId, Surface};

/// Selector specificity as (ids, classes, types).
pub type Specificity = (u32, u32, u32);

/// A comma-separated selector list.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectorList(pub Vec<Selector>);

#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    /// Compounds from left to right.
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
    pseudo_element: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    simple: Vec<Simple>,
}

#[derive(Clone, Debug, PartialEq)]
enum Simple {
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<(AttrOp, String)>,
    },
    FirstChild,
    LastChild,
    NthChild { a: i64, b: i64 },
    Not(Box<Compound>),
    /// Dynamic or unsupported pseudo-class.
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

/// Pseudo-elements accepted with the legacy single colon.
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter", "marker"];

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, String> {
        match all_consuming(delimited(multispace0, selector_list, multispace0)).parse(input) {
            Ok((_, list)) => Ok(list),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Highest specificity among selectors matching `id`.
    pub fn match_specificity(&self, surface: &Surface, id: NodeId) -> Option<Specificity> {
        self.0
            .iter()
            .filter(|selector| selector.matches(surface, id))
            .map(Selector::specificity)
            .max()
    }
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        let mut total = self
            .compounds
            .iter()
            .fold((0, 0, 0), |acc, compound| add(acc, compound.specificity()));
        if self.pseudo_element.is_some() {
            total.2 += 1;
        }
        total
    }

    pub fn pseudo_element(&self) -> Option<&str> {
        self.pseudo_element.as_deref()
    }

    pub fn matches(&self, surface: &Surface, id: NodeId) -> bool {
        self.pseudo_element.is_none()
            && !self.compounds.is_empty()
            && self.match_at(surface, id, self.compounds.len() - 1)
    }

    fn match_at(&self, surface: &Surface, id: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(surface, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => surface
                .parent_element(id)
                .is_some_and(|parent| self.match_at(surface, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = surface.parent_element(id);
                while let Some(ancestor) = current {
                    if self.match_at(surface, ancestor, index - 1) {
                        return true;
                    }
                    current = surface.parent_element(ancestor);
                }
                false
            }
            Combinator::NextSibling => surface
                .previous_element_siblings(id)
                .next()
                .is_some_and(|sibling| self.match_at(surface, sibling, index - 1)),
            Combinator::SubsequentSibling => surface
                .previous_element_siblings(id)
                .any(|sibling| self.match_at(surface, sibling, index - 1)),
        }
    }
}

/// Whether any selector of the list matches.
pub fn matches_any(surface: &Surface, id: NodeId, selectors: &SelectorList) -> bool {
    selectors.0.iter().any(|selector| selector.matches(surface, id))
}

fn add(a: Specificity, b: Specificity) -> Specificity {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

impl Compound {
    fn specificity(&self) -> Specificity {
        let own = (0, 0, u32::from(self.tag.is_some()));
        self.simple.iter().fold(own, |acc, simple| {
            let part = match simple {
                Simple::Id(_) => (1, 0, 0),
                Simple::Not(inner) => inner.specificity(),
                _ => (0, 1, 0),
            };
            add(acc, part)
        })
    }

    fn matches(&self, surface: &Surface, id: NodeId) -> bool {
        let Some(tag) = surface.tag(id) else {
            return false;
        };
        if let Some(expected) = &self.tag
            && !expected.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        self.simple.iter().all(|simple| simple.matches(surface, id))
    }
}

impl Simple {
    fn matches(&self, surface: &Surface, id: NodeId) -> bool {
        match self {
            Self::Id(expected) => surface.attr(id, "id") == Some(expected.as_str()),
            Self::Class(class) => surface.has_class(id, class),
            Self::Attribute { name, matcher } => {
                let Some(actual) = surface.attr(id, name) else {
                    return false;
                };
                let Some((op, expected)) = matcher else {
                    return true;
                };
                let expected = expected.as_str();
                match op {
                    AttrOp::Equals => actual == expected,
                    AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
                    AttrOp::DashMatch => {
                        actual == expected
                            || actual
                                .strip_prefix(expected)
                                .is_some_and(|rest| rest.starts_with('-'))
                    }
                    AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
                    AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
                    AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
                }
            }
            Self::FirstChild => surface.element_position(id).0 == 1,
            Self::LastChild => {
                let (index, count) = surface.element_position(id);
                index == count
            }
            Self::NthChild { a, b } => {
                let Ok(index) = i64::try_from(surface.element_position(id).0) else {
                    return false;
                };
                nth_matches(*a, *b, index)
            }
            Self::Not(inner) => !inner.matches(surface, id),
            Self::Never => false,
        }
    }
}

/// Whether `index = a*n + b` for some `n >= 0`.
fn nth_matches(a: i64, b: i64, index: i64) -> bool {
    if a == 0 {
        return index == b;
    }
    let diff = index - b;
    diff % a == 0 && diff / a >= 0
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn selector_list(input: &str) -> IResult<&str, SelectorList> {
    map(
        separated_list1(delimited(multispace0, char(','), multispace0), selector),
        SelectorList,
    )
    .parse(input)
}

fn combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        delimited(
            multispace0,
            alt((
                value(Combinator::Child, char('>')),
                value(Combinator::NextSibling, char('+')),
                value(Combinator::SubsequentSibling, char('~')),
            )),
            multispace0,
        ),
        value(Combinator::Descendant, multispace1),
    ))
    .parse(input)
}

fn selector(input: &str) -> IResult<&str, Selector> {
    let (mut input, first) = compound(input)?;
    let mut compounds = vec![first];
    let mut combinators = Vec::new();

    // A trailing space before `,` or the end is not a combinator, so each
    // step must parse a combinator and a compound together.
    while let Ok((remaining, (joiner, next))) = pair(combinator, compound).parse(input) {
        combinators.push(joiner);
        compounds.push(next);
        input = remaining;
    }

    let (input, pseudo_element) = opt(pseudo_element).parse(input)?;
    Ok((
        input,
        Selector {
            compounds,
            combinators,
            pseudo_element: pseudo_element.map(str::to_ascii_lowercase),
        },
    ))
}

fn pseudo_element(input: &str) -> IResult<&str, &str> {
    alt((
        preceded(tag("::"), ident),
        preceded(char(':'), legacy_pseudo_element),
    ))
    .parse(input)
}

fn legacy_pseudo_element(input: &str) -> IResult<&str, &str> {
    let (rest, name) = ident(input)?;
    if LEGACY_PSEUDO_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
        Ok((rest, name))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))
    }
}

fn compound(input: &str) -> IResult<&str, Compound> {
    let (input, tag_name) = opt(alt((map(tag("*"), |_| None), map(ident, Some)))).parse(input)?;
    let (input, simple) = many0(simple).parse(input)?;
    if tag_name.is_none() && simple.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Many1)));
    }
    Ok((
        input,
        Compound {
            tag: tag_name.flatten().map(str::to_ascii_lowercase),
            simple,
        },
    ))
}

fn simple(input: &str) -> IResult<&str, Simple> {
    alt((
        map(preceded(char('#'), ident), |id: &str| Simple::Id(id.to_owned())),
        map(preceded(char('.'), ident), |class: &str| Simple::Class(class.to_owned())),
        attribute,
        pseudo_class,
    ))
    .parse(input)
}

fn attr_op(input: &str) -> IResult<&str, AttrOp> {
    alt((
        value(AttrOp::Includes, tag("~=")),
        value(AttrOp::DashMatch, tag("|=")),
        value(AttrOp::Prefix, tag("^=")),
        value(AttrOp::Suffix, tag("$=")),
        value(AttrOp::Substring, tag("*=")),
        value(AttrOp::Equals, tag("=")),
    ))
    .parse(input)
}

fn attr_value(input: &str) -> IResult<&str, String> {
    alt((
        map(delimited(char('"'), opt(is_not("\"")), char('"')), |v: Option<&str>| {
            v.unwrap_or_default().to_owned()
        }),
        map(delimited(char('\''), opt(is_not("'")), char('\'')), |v: Option<&str>| {
            v.unwrap_or_default().to_owned()
        }),
        map(ident, str::to_owned),
    ))
    .parse(input)
}

fn attribute(input: &str) -> IResult<&str, Simple> {
    map(
        delimited(
            pair(char('['), multispace0),
            pair(
                ident,
                opt(pair(
                    delimited(multispace0, attr_op, multispace0),
                    attr_value,
                )),
            ),
            pair(multispace0, char(']')),
        ),
        |(name, matcher)| Simple::Attribute {
            name: name.to_ascii_lowercase(),
            matcher,
        },
    )
    .parse(input)
}

fn pseudo_class(input: &str) -> IResult<&str, Simple> {
    let (rest, _) = char(':').parse(input)?;
    if rest.starts_with(':') {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)));
    }
    let (rest, name) = ident(rest)?;
    let name = name.to_ascii_lowercase();
    if LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    match name.as_str() {
        "first-child" => Ok((rest, Simple::FirstChild)),
        "last-child" => Ok((rest, Simple::LastChild)),
        "nth-child" => map(
            delimited(
                pair(char('('), multispace0),
                nth_expression,
                pair(multispace0, char(')')),
            ),
            |(a, b)| Simple::NthChild { a, b },
        )
        .parse(rest),
        "not" => map(
            delimited(
                pair(char('('), multispace0),
                compound,
                pair(multispace0, char(')')),
            ),
            |inner| Simple::Not(Box::new(inner)),
        )
        .parse(rest),
        _ => {
            // Skip arguments of other functional pseudo-classes.
            let (rest, _) = opt(delimited(char('('), opt(is_not(")")), char(')'))).parse(rest)?;
            Ok((rest, Simple::Never))
        }
    }
}

/// `odd`, `even`, `b`, `an`, `an+b`.
fn nth_expression(input: &str) -> IResult<&str, (i64, i64)> {
    let (rest, text) = is_not(")").parse(input)?;
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let parsed = match compact.as_str() {
        "odd" => Some((2, 1)),
        "even" => Some((2, 0)),
        expression => parse_an_plus_b(expression),
    };
    match parsed {
        Some(pair) => Ok((rest, pair)),
        None => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))),
    }
}

fn parse_an_plus_b(expression: &str) -> Option<(i64, i64)> {
    let Some(n_pos) = expression.find('n') else {
        return expression.parse().ok().map(|b| (0, b));
    };
    let a = match &expression[..n_pos] {
        "" | "+" => 1,
        "-" => -1,
        coefficient => coefficient.parse().ok()?,
    };
    let b = match &expression[n_pos + 1..] {
        "" => 0,
        offset => {
            let (sign, digits) = one_of::<&str, _, nom::error::Error<&str>>("+-")
                .parse(offset)
                .ok()
                .map(|(digits, sign)| (sign, digits))?;
            let magnitude: i64 = digits.parse().ok()?;
            if sign == '-' { -magnitude } else { magnitude }
        }
    };
    Some((a, b))
}
