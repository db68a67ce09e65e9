//! Minimal stylesheet model for inlining SVG `<style>` rules.
//!
//! Only rules whose selectors are class selectors (optionally qualified by an
//! element name, e.g. `.cls-1` or `rect.cls-1`) can be inlined; every other
//! selector in a rule is ignored. Declarations are kept as raw
//! `name`/`value` text since they are copied verbatim into `style`.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

/// A single `name: value` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

impl Declaration {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
        }
    }
}

/// `[element].class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSelector {
    pub element: Option<String>,
    pub class: String,
}

impl ClassSelector {
    /// Parse a single compound selector. Anything other than an optional
    /// element name followed by exactly one class yields `None`.
    pub fn parse(selector: &str) -> Option<Self> {
        let (element, class) = selector.trim().split_once('.')?;
        if !class.chars().all(is_ident_char) || class.is_empty() {
            return None;
        }
        if !element.chars().all(is_ident_char) {
            return None;
        }
        Some(Self {
            element: (!element.is_empty()).then(|| element.to_string()),
            class: class.to_string(),
        })
    }

    /// Whether an element with this local name and class list matches.
    pub fn matches(&self, element: &str, classes: &[&str]) -> bool {
        self.element.as_deref().is_none_or(|e| e == element) && classes.contains(&self.class.as_str())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// A rule with at least one inlinable class selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRule {
    pub selectors: Vec<ClassSelector>,
    pub declarations: Vec<Declaration>,
}

impl ClassRule {
    pub fn matches(&self, element: &str, classes: &[&str]) -> bool {
        self.selectors.iter().any(|s| s.matches(element, classes))
    }
}

/// The inlinable rules of a stylesheet, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    pub rules: Vec<ClassRule>,
}

impl Stylesheet {
    /// Parse CSS text leniently: invalid rules and at-rules are skipped.
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();

        let mut rule_parser = TopLevelRuleParser { rules: &mut rules };
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            if let Err((_, slice)) = result {
                tracing::debug!(rule = slice, "skipping CSS rule");
            }
        }

        Self { rules }
    }

    /// Append the rules of another stylesheet (later `<style>` blocks win).
    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
    }

    /// Cascaded declarations for an element, later rules overriding earlier
    /// ones property by property. Property order follows first appearance.
    pub fn declarations_for(&self, element: &str, classes: &[&str]) -> Vec<Declaration> {
        let mut resolved: Vec<Declaration> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.matches(element, classes)) {
            for decl in &rule.declarations {
                merge_declaration(&mut resolved, decl.clone());
            }
        }
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Insert or replace a declaration by property name.
pub fn merge_declaration(target: &mut Vec<Declaration>, decl: Declaration) {
    match target.iter_mut().find(|d| d.name == decl.name) {
        Some(existing) => existing.value = decl.value,
        None => target.push(decl),
    }
}

/// Parse an inline `style` attribute value into declarations.
pub fn parse_inline_style(style: &str) -> Vec<Declaration> {
    let mut decls = Vec::new();
    for part in style.split(';') {
        if let Some((name, value)) = part.split_once(':') {
            if !name.trim().is_empty() {
                merge_declaration(&mut decls, Declaration::new(name, value));
            }
        }
    }
    decls
}

/// Serialize declarations as `name:value;` pairs.
pub fn to_inline_style(decls: &[Declaration]) -> String {
    decls
        .iter()
        .map(|d| format!("{}:{};", d.name, d.value))
        .collect()
}

/// Consume the remaining tokens of `input` and return their source text.
fn remaining_source<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next().is_ok() {}
    input.slice_from(start)
}

struct TopLevelRuleParser<'a> {
    rules: &'a mut Vec<ClassRule>,
}

impl<'i> AtRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        // @media and friends cannot be expressed as inline styles.
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = Vec<ClassSelector>;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let selectors: Vec<ClassSelector> = remaining_source(input)
            .split(',')
            .filter_map(ClassSelector::parse)
            .collect();
        if selectors.is_empty() {
            Err(input.new_custom_error(()))
        } else {
            Ok(selectors)
        }
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut declarations = Vec::new();
        let mut decl_parser = DeclarationListParser {
            declarations: &mut declarations,
        };
        for result in RuleBodyParser::new(input, &mut decl_parser) {
            // Lenient: a bad declaration does not invalidate the rule.
            let _ = result;
        }

        self.rules.push(ClassRule {
            selectors: prelude,
            declarations,
        });
        Ok(())
    }
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<Declaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let raw = remaining_source(input).trim();
        let value = raw.strip_suffix("!important").unwrap_or(raw).trim_end();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        merge_declaration(self.declarations, Declaration::new(&name, value));
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
