//! grammar.rs – the production map every algorithm in the crate works on
//!
//! A [`Grammar`] keeps its alternatives keyed by left‑hand nonterminal in
//! **insertion order**: rendering, fresh‑name generation and the order in
//! which conflicts are found all depend on it.
//!
//! ```rust
//! use llgram::Grammar;
//!
//! let g: Grammar = "S -> a S | b".parse().unwrap();
//! assert_eq!(g.to_string(), "S -> a S | b");
//! ```

use crate::error::{ParseError, SymbolError};
use crate::symbol::{Symbol, symbol_from_string};
use core::fmt;
use core::str::FromStr;
use indexmap::{IndexMap, IndexSet};

/// One right‑hand side. Never empty: an empty derivation is `[Epsilon]`.
pub type Alternative = Vec<Symbol>;
pub type ProdId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: Symbol,
    pub rhs: Alternative,
}

impl Production {
    pub fn new(lhs: Symbol, rhs: Alternative) -> Self {
        Self { lhs, rhs }
    }
}

/// holds the rules of a grammar and its start symbol
///
/// Values handed out by the public API are never changed afterwards; every
/// transform builds a fresh grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    rules: IndexMap<Symbol, Vec<Alternative>>,
    start: Symbol,
}

#[inline(always)]
pub(crate) fn is_unit(rhs: &[Symbol]) -> bool {
    matches!(rhs, [Symbol::NonTerminal(_)])
}

impl Grammar {
    /// An empty grammar; `start` must be a nonterminal.
    pub(crate) fn new(start: Symbol) -> Self {
        debug_assert!(start.is_non_terminal(), "start symbol {start} is not a nonterminal");
        Self {
            rules: IndexMap::new(),
            start,
        }
    }

    /// Builds a grammar from hand‑made productions.
    ///
    /// Every symbol is validated as [`Symbol::validate`] does, and `start`
    /// and each left‑hand side must be nonterminals, so the result renders to
    /// text that parses back into the same grammar.  An empty right‑hand side
    /// is stored as `[Epsilon]`.
    pub fn from_rules(
        start: Symbol,
        iter: impl IntoIterator<Item = Production>,
    ) -> Result<Self, SymbolError> {
        let expect_non_terminal = |sym: &Symbol| match sym {
            Symbol::NonTerminal(_) => sym.validate(),
            _ => Err(SymbolError::Expected {
                token: sym.to_string(),
                kind: "nonterminal",
            }),
        };

        expect_non_terminal(&start)?;
        let mut ans = Self::new(start);
        for Production { lhs, rhs } in iter {
            expect_non_terminal(&lhs)?;
            rhs.iter().try_for_each(Symbol::validate)?;
            ans.add_rule(lhs, rhs);
        }
        Ok(ans)
    }

    pub(crate) fn add_rule(&mut self, lhs: Symbol, mut rhs: Alternative) {
        if rhs.is_empty() {
            rhs.push(Symbol::Epsilon);
        }
        self.rules.entry(lhs).or_default().push(rhs);
    }

    /// Same as [`Grammar::add_rule`] but skips an alternative `lhs` already has.
    pub(crate) fn add_unique_rule(&mut self, lhs: Symbol, mut rhs: Alternative) {
        if rhs.is_empty() {
            rhs.push(Symbol::Epsilon);
        }
        let alts = self.rules.entry(lhs).or_default();
        if !alts.contains(&rhs) {
            alts.push(rhs);
        }
    }

    pub fn start_symbol(&self) -> &Symbol {
        &self.start
    }

    /// Every nonterminal that owns at least one alternative, in insertion order.
    pub fn non_terminals(&self) -> impl Iterator<Item = &Symbol> {
        self.rules.keys()
    }

    /// Every terminal occurring in some alternative, in order of appearance.
    pub fn terminals(&self) -> IndexSet<Symbol> {
        self.productions()
            .flat_map(|(_, rhs)| rhs.iter())
            .filter(|s| s.is_terminal())
            .cloned()
            .collect()
    }

    pub fn contains(&self, nt: &Symbol) -> bool {
        self.rules.contains_key(nt)
    }

    /// Alternatives of `nt`; empty for a symbol without rules.
    pub fn alternatives(&self, nt: &Symbol) -> &[Alternative] {
        self.rules.get(nt).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&Symbol, &[Alternative])> {
        self.rules.iter().map(|(k, v)| (k, v.as_slice()))
    }

    #[inline(always)]
    pub fn productions(&self) -> impl Iterator<Item = (&Symbol, &Alternative)> {
        self.rules.iter().flat_map(|(k, v)| v.iter().map(move |x| (k, x)))
    }

    /// Rules with both the nonterminals and their alternatives sorted, for
    /// comparing grammars regardless of the order rules were written in.
    pub fn sorted_rules(&self) -> Vec<(&Symbol, Vec<&Alternative>)> {
        let mut ans: Vec<_> = self
            .rules
            .iter()
            .map(|(lhs, alts)| {
                let mut alts: Vec<_> = alts.iter().collect();
                alts.sort();
                (lhs, alts)
            })
            .collect();
        ans.sort();
        ans
    }

    /// A nonterminal named `base` followed by the smallest positive integer
    /// that gives a name not already used anywhere in the grammar.
    pub fn next_nonterminal_name(&self, base: &Symbol) -> Symbol {
        let used: IndexSet<&Symbol> = self
            .productions()
            .flat_map(|(lhs, rhs)| core::iter::once(lhs).chain(rhs.iter()))
            .chain(core::iter::once(&self.start))
            .collect();

        let base = base.as_str();
        (1usize..)
            .map(|n| Symbol::NonTerminal(format!("{base}{n}")))
            .find(|nt| !used.contains(nt))
            .unwrap_or_else(|| unreachable!("the grammar only uses finitely many names"))
    }
}

impl FromStr for Grammar {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ans: Option<Grammar> = None;

        for (i, line) in s.lines().enumerate() {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }

            let Some((lhs, rhs)) = line.split_once("->") else {
                return Err(ParseError::MissingArrow { line: line_no });
            };
            if rhs.contains("->") {
                return Err(ParseError::MultipleArrows { line: line_no });
            }

            let lhs = Symbol::non_terminal(lhs.trim()).map_err(|source| {
                ParseError::LeftHandSide {
                    line: line_no,
                    source,
                }
            })?;

            let grammar = ans.get_or_insert_with(|| Grammar::new(lhs.clone()));
            for alt in rhs.split('|') {
                let rhs = alt
                    .split_whitespace()
                    .map(symbol_from_string)
                    .collect::<Result<Alternative, _>>()
                    .map_err(|source| ParseError::InvalidSymbol {
                        line: line_no,
                        source,
                    })?;

                if rhs.is_empty() {
                    return Err(ParseError::EmptyAlternative { line: line_no });
                }
                grammar.add_rule(lhs.clone(), rhs);
            }
        }

        ans.ok_or(ParseError::Empty)
    }
}

fn write_rule(f: &mut fmt::Formatter, lhs: &Symbol, alts: &[Alternative]) -> fmt::Result {
    write!(f, "{lhs} ->")?;
    for (i, alt) in alts.iter().enumerate() {
        if i > 0 {
            f.write_str(" |")?;
        }
        for sym in alt {
            write!(f, " {sym}")?;
        }
    }
    Ok(())
}

/// One `LHS -> alt | alt` line per nonterminal. The start symbol is always
/// written first so that reading the text back keeps it as the start.
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        let start = self.rules.get_key_value(&self.start);
        let rest = self.rules.iter().filter(|(k, _)| **k != self.start);

        for (lhs, alts) in start.into_iter().chain(rest) {
            if !first {
                f.write_str("\n")?;
            }
            first = false;
            write_rule(f, lhs, alts)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Grammar, Production};
    use crate::error::{ParseError, SymbolError};
    use crate::symbol::Symbol;

    fn nt(s: &str) -> Symbol {
        Symbol::NonTerminal(s.to_owned())
    }

    fn t(s: &str) -> Symbol {
        Symbol::Terminal(s.to_owned())
    }

    #[test]
    fn parses_lines_and_alternatives_in_order() {
        let g: Grammar = "
            E -> E + T | T
            T -> T * F | F
            F -> ( E ) | id
        "
        .parse()
        .unwrap();

        assert_eq!(g.start_symbol(), &nt("E"));
        assert_eq!(
            g.non_terminals().cloned().collect::<Vec<_>>(),
            vec![nt("E"), nt("T"), nt("F")]
        );
        assert_eq!(
            g.alternatives(&nt("E")),
            &[vec![nt("E"), t("+"), nt("T")], vec![nt("T")]]
        );
        assert_eq!(
            g.terminals().into_iter().collect::<Vec<_>>(),
            vec![t("+"), t("*"), t("("), t(")"), t("id")]
        );
    }

    #[test]
    fn undefined_non_terminals_are_tolerated() {
        let g: Grammar = "S -> a X".parse().unwrap();
        assert!(!g.contains(&nt("X")));
        assert!(g.alternatives(&nt("X")).is_empty());
        assert_eq!(g.non_terminals().count(), 1);
    }

    #[test]
    fn rejects_missing_arrow() {
        let err = "S -> a\nA a b".parse::<Grammar>().unwrap_err();
        assert_eq!(err, ParseError::MissingArrow { line: 2 });
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn rejects_two_arrows() {
        let err = "S -> a -> b".parse::<Grammar>().unwrap_err();
        assert_eq!(err, ParseError::MultipleArrows { line: 1 });
    }

    #[test]
    fn rejects_empty_alternative() {
        let err = "S -> a |\nA -> b".parse::<Grammar>().unwrap_err();
        assert_eq!(err, ParseError::EmptyAlternative { line: 1 });

        let err = "S -> a\n\nA -> | b".parse::<Grammar>().unwrap_err();
        assert_eq!(err, ParseError::EmptyAlternative { line: 3 });
    }

    #[test]
    fn rejects_bad_symbols() {
        let err = "S -> a Bb".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidSymbol { line: 1, .. }));

        let err = "S -> a $".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidSymbol { line: 1, .. }));

        let err = "s -> a".parse::<Grammar>().unwrap_err();
        assert!(matches!(err, ParseError::LeftHandSide { line: 1, .. }));
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!("  \n\n".parse::<Grammar>().unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn render_round_trip() {
        let text = "
            S -> A B C | &
            A -> a A | &
            B -> b B | A C d
            C -> c C | &
        ";
        let g: Grammar = text.parse().unwrap();
        let again: Grammar = g.to_string().parse().unwrap();

        assert_eq!(again.start_symbol(), g.start_symbol());
        assert_eq!(again.sorted_rules(), g.sorted_rules());
        assert_eq!(again, g);
    }

    #[test]
    fn start_symbol_rendered_first() {
        let g = Grammar::from_rules(
            nt("S1"),
            [
                Production::new(nt("S"), vec![t("a")]),
                Production::new(nt("S1"), vec![nt("S")]),
                Production::new(nt("S1"), vec![Symbol::Epsilon]),
            ],
        )
        .unwrap();
        assert_eq!(g.to_string(), "S1 -> S | &\nS -> a");
        let again: Grammar = g.to_string().parse().unwrap();
        assert_eq!(again.start_symbol(), &nt("S1"));
    }

    #[test]
    fn fresh_names() {
        let g: Grammar = "S -> a S1 | b\nS1 -> c S2".parse().unwrap();
        assert_eq!(g.next_nonterminal_name(&nt("S")), nt("S3"));
        assert_eq!(g.next_nonterminal_name(&nt("A")), nt("A1"));
    }

    #[test]
    fn empty_rhs_becomes_epsilon() {
        let g = Grammar::from_rules(nt("S"), [Production::new(nt("S"), vec![])]).unwrap();
        assert_eq!(g.alternatives(&nt("S")), &[vec![Symbol::Epsilon]]);
    }

    #[test]
    fn from_rules_rejects_malformed_symbols() {
        let err = Grammar::from_rules(nt("S"), [Production::new(nt("S"), vec![t("A b")])]);
        assert_eq!(
            err,
            Err(SymbolError::Expected {
                token: "A b".to_owned(),
                kind: "terminal",
            })
        );

        let rules = |rhs: Vec<Symbol>| [Production::new(nt("S"), rhs)];
        assert!(Grammar::from_rules(nt("S"), rules(vec![Symbol::EndOfInput])).is_err());
        assert!(Grammar::from_rules(nt("S"), rules(vec![nt("ab")])).is_err());
        assert!(Grammar::from_rules(t("s"), rules(vec![t("a")])).is_err());
        assert!(
            Grammar::from_rules(nt("S"), [Production::new(t("a"), vec![t("a")])]).is_err()
        );

        let ok = Grammar::from_rules(nt("S"), rules(vec![t("a"), nt("S")])).unwrap();
        let again: Grammar = ok.to_string().parse().unwrap();
        assert_eq!(again, ok);
    }
}
