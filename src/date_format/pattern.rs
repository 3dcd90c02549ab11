//! Store date patterns (`yyyy-MM-dd['T'HH:mm:ss.SSSZ]`) → chrono format items.
//!
//! Optional `[...]` sections expand into every combination; each combination
//! becomes one [`Layout`]. Layouts carry a canonical strftime-like rendering
//! that is used for deduplication and for matching a preferred format.
use chrono::format::{Fixed, Item, StrftimeItems};

use crate::error::SchemaError;

/// One fully expanded pattern.
#[derive(Debug, Clone)]
pub struct Layout {
    canonical: String,
    items: Vec<Item<'static>>,
}

impl Layout {
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn items(&self) -> &[Item<'static>] {
        &self.items
    }
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

/// More optional sections than this is almost certainly a mistake.
const MAX_OPTIONAL_SECTIONS: usize = 12;

// ————————————————————————————————————————————————————————————————————————————
// LEXING
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Char(char),
    Quoted(String),
}

#[derive(Debug, Clone)]
enum Node {
    Atom(Atom),
    Optional(Vec<Node>),
}

fn bad(pattern: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::BadDatePattern { pattern: pattern.to_string(), reason: reason.into() }
}

fn parse_nodes(pattern: &str) -> Result<Vec<Node>, SchemaError> {
    let mut stack: Vec<Vec<Node>> = vec![Vec::new()];
    let mut chars = pattern.chars().peekable();
    let mut sections = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                sections += 1;
                stack.push(Vec::new());
            }
            ']' => {
                if stack.len() < 2 {
                    return Err(bad(pattern, "unbalanced `]`"));
                }
                let inner = stack.pop().unwrap_or_default();
                if let Some(top) = stack.last_mut() {
                    top.push(Node::Optional(inner));
                }
            }
            '\'' => {
                let mut lit = String::new();
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    lit.push('\'');
                } else {
                    loop {
                        match chars.next() {
                            Some('\'') if chars.peek() == Some(&'\'') => {
                                chars.next();
                                lit.push('\'');
                            }
                            Some('\'') => break,
                            Some(c) => lit.push(c),
                            None => return Err(bad(pattern, "unterminated quoted literal")),
                        }
                    }
                }
                if let Some(top) = stack.last_mut() {
                    top.push(Node::Atom(Atom::Quoted(lit)));
                }
            }
            c => {
                if let Some(top) = stack.last_mut() {
                    top.push(Node::Atom(Atom::Char(c)));
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(bad(pattern, "unclosed `[`"));
    }
    if sections > MAX_OPTIONAL_SECTIONS {
        return Err(bad(pattern, format!("more than {MAX_OPTIONAL_SECTIONS} optional sections")));
    }
    Ok(stack.pop().unwrap_or_default())
}

/// Every combination of present/absent optional sections, present first.
fn expand_nodes(nodes: &[Node]) -> Vec<Vec<Atom>> {
    let mut out: Vec<Vec<Atom>> = vec![Vec::new()];
    for node in nodes {
        match node {
            Node::Atom(atom) => out.iter_mut().for_each(|prefix| prefix.push(atom.clone())),
            Node::Optional(inner) => {
                let mut choices = expand_nodes(inner);
                choices.push(Vec::new());
                out = out
                    .iter()
                    .flat_map(|prefix| {
                        choices.iter().map(move |choice| {
                            let mut next = prefix.clone();
                            next.extend(choice.iter().cloned());
                            next
                        })
                    })
                    .collect();
            }
        }
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILATION
// ————————————————————————————————————————————————————————————————————————————

struct Builder<'p> {
    pattern: &'p str,
    canonical: String,
    items: Vec<Item<'static>>,
}

impl<'p> Builder<'p> {
    fn strftime(&mut self, spec: &str) -> Result<(), SchemaError> {
        let items = StrftimeItems::new(spec)
            .parse_to_owned()
            .map_err(|e| bad(self.pattern, format!("{spec}: {e}")))?;
        self.items.extend(items);
        self.canonical.push_str(spec);
        Ok(())
    }

    fn literal(&mut self, text: &str) -> Result<(), SchemaError> {
        if text.is_empty() {
            return Ok(());
        }
        self.strftime(&text.replace('%', "%%"))
    }

    /// Accepts `Z` as well as `+hh:mm` and `+hhmm`.
    fn offset(&mut self) {
        self.items.push(Item::Fixed(Fixed::TimezoneOffsetColonZ));
        self.canonical.push_str("%:z");
    }

    fn letter(&mut self, letter: char, run: usize) -> Result<(), SchemaError> {
        let spec = match (letter, run) {
            ('y' | 'u', 2) => "%y",
            ('y' | 'u', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', 2) => "%d",
            ('D', 1 | 2) => "%-j",
            ('D', 3) => "%j",
            ('H', 1) => "%-H",
            ('H', 2) => "%H",
            ('h', 1) => "%-I",
            ('h', 2) => "%I",
            ('m', 1) => "%-M",
            ('m', 2) => "%M",
            ('s', 1) => "%-S",
            ('s', 2) => "%S",
            ('S', 3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('a', 1) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('Z' | 'X', _) => {
                self.offset();
                return Ok(());
            }
            ('Y' | 'x' | 'w' | 'W' | 'e', _) => {
                return Err(bad(self.pattern, format!("week-based field `{letter}` is not supported")));
            }
            (c, n) if c.is_ascii_alphabetic() => {
                return Err(bad(self.pattern, format!("unsupported pattern letter `{}`", c.to_string().repeat(n))));
            }
            (c, _) => return self.literal(&c.to_string()),
        };
        self.strftime(spec)
    }

    /// `.SSS`, `.SSSSSS`, `.SSSSSSSSS` print a fixed number of digits;
    /// any other run (`.999999999`) prints as many as needed.
    fn fraction(&mut self, digit: char, run: usize) -> Result<(), SchemaError> {
        let spec = match (digit, run) {
            ('S', 3) => "%.3f",
            ('S', 6) => "%.6f",
            ('S', 9) => "%.9f",
            _ if run <= 9 => "%.f",
            _ => return Err(bad(self.pattern, "more than nine fraction digits")),
        };
        self.strftime(spec)
    }

    fn build(mut self, atoms: &[Atom]) -> Result<Layout, SchemaError> {
        let mut i = 0;
        while i < atoms.len() {
            match &atoms[i] {
                Atom::Quoted(text) => {
                    self.literal(text)?;
                    i += 1;
                }
                Atom::Char('.') => {
                    let digit = match atoms.get(i + 1) {
                        Some(Atom::Char(d @ ('S' | '9'))) => Some(*d),
                        _ => None,
                    };
                    match digit {
                        Some(d) => {
                            let run = run_len(&atoms[i + 1..], d);
                            self.fraction(d, run)?;
                            i += 1 + run;
                        }
                        None => {
                            self.literal(".")?;
                            i += 1;
                        }
                    }
                }
                Atom::Char(c) if c.is_ascii_alphabetic() => {
                    let run = run_len(&atoms[i..], *c);
                    self.letter(*c, run)?;
                    i += run;
                }
                Atom::Char(c) => {
                    self.literal(&c.to_string())?;
                    i += 1;
                }
            }
        }
        Ok(Layout { canonical: self.canonical, items: self.items })
    }
}

fn run_len(atoms: &[Atom], c: char) -> usize {
    atoms.iter().take_while(|a| **a == Atom::Char(c)).count()
}

/// All layouts of `pattern`, longest first, deduplicated by canonical form.
pub fn expand(pattern: &str) -> Result<Vec<Layout>, SchemaError> {
    let nodes = parse_nodes(pattern)?;
    let mut combos = expand_nodes(&nodes);
    combos.retain(|atoms| !atoms.is_empty());
    // stable, so ties keep present-before-absent order
    combos.sort_by_key(|atoms| std::cmp::Reverse(atoms.len()));

    let mut out: Vec<Layout> = Vec::with_capacity(combos.len());
    for atoms in &combos {
        let layout = Builder { pattern, canonical: String::new(), items: Vec::new() }.build(atoms)?;
        if !out.contains(&layout) {
            out.push(layout);
        }
    }
    if out.is_empty() {
        return Err(bad(pattern, "pattern is empty"));
    }

    tracing::trace!(
        pattern,
        layouts = ?out.iter().map(Layout::canonical).collect::<Vec<_>>(),
        "expanded date pattern"
    );
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(pattern: &str) -> Vec<String> {
        expand(pattern).unwrap().iter().map(|l| l.canonical().to_string()).collect()
    }

    #[test]
    fn optional_section_expands_longest_first() {
        assert_eq!(
            canon("yyyy-MM-dd['T'HH:mm:ss.999999999Z]"),
            vec!["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d"]
        );
    }

    #[test]
    fn leading_optional_year_digits() {
        assert_eq!(canon("[yy]yy-M-d"), vec!["%Y-%-m-%-d", "%y-%-m-%-d"]);
    }

    #[test]
    fn nested_sections() {
        assert_eq!(canon("HH[:mm[:ss]]"), vec!["%H:%M:%S", "%H:%M", "%H"]);
    }

    #[test]
    fn quoted_literals_and_escapes() {
        assert_eq!(canon("yyyy'T''%'"), vec!["%YT'%%"]);
        assert_eq!(canon("'['yyyy']'"), vec!["[%Y]"]);
        assert_eq!(canon("HH''mm"), vec!["%H'%M"]);
    }

    #[test]
    fn fixed_fraction_widths() {
        assert_eq!(canon("ss.SSS"), vec!["%S%.3f"]);
        assert_eq!(canon("ssSSS"), vec!["%S%3f"]);
    }

    #[test]
    fn rejects_bad_patterns() {
        for p in ["yyyy[", "yyyy]", "'abc", "xxxx-'W'ww", "yyyy-QQ", "ss.SSSSSSSSSS", "[]"] {
            assert!(
                matches!(expand(p), Err(SchemaError::BadDatePattern { .. })),
                "{p} should be rejected"
            );
        }
    }
}
