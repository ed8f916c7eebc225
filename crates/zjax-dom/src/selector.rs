//! Element Query
//!
//! A CSS selector subset for querySelector, querySelectorAll, matches and
//! closest: type, universal, `#id`, `.class` and attribute selectors,
//! combined with descendant, `>`, `+` and `~` combinators and `,` lists.
//! Pseudo-classes are rejected as syntax errors.

use crate::{DomError, DomResult, DomTree, ElementData, NodeId};

/// Comma-separated list of selectors
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<Selector>);

/// One complex selector, left to right
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    pub combinators: Vec<Combinator>,
}

/// Compound selector, e.g. `a.active[href]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    /// Tag name; `None` for universal or omitted
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    Exists(String),
    Equals(String, String),
    Includes(String, String),
    Prefix(String, String),
    Suffix(String, String),
    Substring(String, String),
}

impl AttrMatch {
    fn matches(&self, elem: &ElementData) -> bool {
        match self {
            AttrMatch::Exists(name) => elem.has_attr(name),
            AttrMatch::Equals(name, v) => elem.get_attr(name) == Some(v.as_str()),
            AttrMatch::Includes(name, v) => elem
                .get_attr(name)
                .is_some_and(|a| a.split_whitespace().any(|w| w == v)),
            AttrMatch::Prefix(name, v) => elem.get_attr(name).is_some_and(|a| !v.is_empty() && a.starts_with(v.as_str())),
            AttrMatch::Suffix(name, v) => elem.get_attr(name).is_some_and(|a| !v.is_empty() && a.ends_with(v.as_str())),
            AttrMatch::Substring(name, v) => elem.get_attr(name).is_some_and(|a| !v.is_empty() && a.contains(v.as_str())),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    /// Check a single element against this compound
    pub fn matches(&self, elem: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(&elem.name) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if elem.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| elem.has_class(c)) && self.attrs.iter().all(|a| a.matches(elem))
    }
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> DomResult<Self> {
        Parser { input, pos: 0 }.parse_list()
    }

    /// Whether `node` matches any selector in the list
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(tree, node))
    }
}

impl Selector {
    /// Right-to-left match of the whole complex selector
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.matches_at(tree, n - 1, node),
        }
    }

    fn matches_at(&self, tree: &DomTree, index: usize, node: NodeId) -> bool {
        let Some(elem) = tree.element(node) else {
            return false;
        };
        if !self.compounds[index].matches(elem) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let prev = index - 1;
        match self.combinators[prev] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|p| self.matches_at(tree, prev, p)),
            Combinator::Descendant => tree
                .ancestors(node)
                .any(|a| self.matches_at(tree, prev, a)),
            Combinator::NextSibling => {
                let sibling = std::iter::successors(tree.prev_sibling(node), |&s| tree.prev_sibling(s))
                    .find(|&s| tree.is_element(s));
                sibling.is_some_and(|s| self.matches_at(tree, prev, s))
            }
            Combinator::SubsequentSibling => {
                std::iter::successors(tree.prev_sibling(node), |&s| tree.prev_sibling(s))
                    .any(|s| self.matches_at(tree, prev, s))
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> DomError {
        DomError::InvalidSelector {
            selector: self.input.to_string(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn parse_list(mut self) -> DomResult<SelectorList> {
        let mut selectors = vec![self.parse_selector()?];
        while self.peek() == Some(',') {
            self.bump();
            selectors.push(self.parse_selector()?);
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(SelectorList(selectors))
    }

    fn parse_selector(&mut self) -> DomResult<Selector> {
        self.skip_ws();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.error(&format!("unexpected '{}'", c))),
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_ws();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(Selector { compounds, combinators })
    }

    fn parse_compound(&mut self) -> DomResult<Compound> {
        let mut compound = Compound::default();
        let mut universal = false;

        if self.peek() == Some('*') {
            self.bump();
            universal = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    let class = self.parse_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.bump();
                    let attr = self.parse_attr()?;
                    compound.attrs.push(attr);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> DomResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_attr(&mut self) -> DomResult<AttrMatch> {
        self.skip_ws();
        let name = self.parse_ident()?;
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok(AttrMatch::Exists(name));
            }
            Some('=') => "=",
            Some(c @ ('~' | '^' | '$' | '*')) => {
                self.bump();
                if self.peek() != Some('=') {
                    return Err(self.error(&format!("expected '=' after '{}'", c)));
                }
                match c {
                    '~' => "~=",
                    '^' => "^=",
                    '$' => "$=",
                    _ => "*=",
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        self.bump();
        self.skip_ws();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.bump();
                }
                if self.peek().is_none() {
                    return Err(self.error("unterminated string"));
                }
                let value = self.input[start..self.pos].to_string();
                self.bump();
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_ws();
        if self.bump() != Some(']') {
            return Err(self.error("expected ']'"));
        }

        Ok(match op {
            "=" => AttrMatch::Equals(name, value),
            "~=" => AttrMatch::Includes(name, value),
            "^=" => AttrMatch::Prefix(name, value),
            "$=" => AttrMatch::Suffix(name, value),
            _ => AttrMatch::Substring(name, value),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

impl DomTree {
    /// First descendant of `root` matching `selector`
    pub fn query_selector(&self, root: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.descendants(root).find(|&n| list.matches(self, n)))
    }

    /// All descendants of `root` matching `selector`, in document order
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.descendants(root).filter(|&n| list.matches(self, n)).collect())
    }

    /// Check if element matches selector
    pub fn matches(&self, node: NodeId, selector: &str) -> DomResult<bool> {
        Ok(SelectorList::parse(selector)?.matches(self, node))
    }

    /// Nearest inclusive ancestor matching selector
    pub fn closest(&self, node: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| list.matches(self, n)))
    }

    /// Like `query_selector_all`, but `root` itself is included when it matches
    pub fn query_selector_all_inclusive(&self, root: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|&n| list.matches(self, n))
            .collect())
    }

    /// First element with the given `id` at or beneath `root`
    pub fn find_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|&n| self.element(n).and_then(ElementData::id) == Some(id))
    }
}
