//! symbol.rs – the alphabet shared by every grammar
//!
//! Text is classified by [`symbol_from_string`].  The variants of [`Symbol`]
//! can also be built directly; such values are unchecked until
//! [`Symbol::validate`] (or [`crate::Grammar::from_rules`]) looks at them.

use crate::error::SymbolError;
use core::fmt;
use core::str::FromStr;

/// Textual form of [`Symbol::Epsilon`].
pub const EPSILON: &str = "&";
/// Textual form of [`Symbol::EndOfInput`].
pub const END_OF_INPUT: &str = "$";

/// Alphabet element of a grammar.
///
/// The four classes are disjoint in their textual form, so a token read from
/// a grammar description maps to at most one of them.  Building a variant by
/// hand skips that check, see [`Symbol::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// placeholder expanded by productions, `[A-Z][0-9]*`
    NonTerminal(String),
    /// letter of the generated language
    Terminal(String),
    /// ε  (empty string), written `&`
    Epsilon,
    /// synthetic end‑of‑input symbol ($), only ever found in FOLLOW sets
    EndOfInput,
}

fn is_non_terminal(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some('A'..='Z')) && chars.all(|c| c.is_ascii_digit())
}

fn is_terminal(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| !c.is_uppercase() && !c.is_whitespace() && c != '&' && c != '$')
}

impl Symbol {
    /// Builds a nonterminal, rejecting names outside `[A-Z][0-9]*`.
    pub fn non_terminal(name: &str) -> Result<Symbol, SymbolError> {
        if is_non_terminal(name) {
            Ok(Symbol::NonTerminal(name.to_owned()))
        } else {
            Err(SymbolError::Expected {
                token: name.to_owned(),
                kind: "nonterminal",
            })
        }
    }

    /// Builds a terminal, rejecting uppercase letters, whitespace, `&` and `$`.
    pub fn terminal(value: &str) -> Result<Symbol, SymbolError> {
        if is_terminal(value) {
            Ok(Symbol::Terminal(value.to_owned()))
        } else {
            Err(SymbolError::Expected {
                token: value.to_owned(),
                kind: "terminal",
            })
        }
    }

    pub fn is_non_terminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Symbol::Epsilon)
    }

    /// Checks that the payload is well formed for its variant, i.e. that
    /// rendering the symbol and reading it back gives the same symbol.
    /// [`Symbol::EndOfInput`] never belongs in a production and is rejected.
    pub fn validate(&self) -> Result<(), SymbolError> {
        match self {
            Symbol::NonTerminal(name) => Symbol::non_terminal(name).map(drop),
            Symbol::Terminal(value) => Symbol::terminal(value).map(drop),
            Symbol::Epsilon => Ok(()),
            Symbol::EndOfInput => Err(SymbolError::Invalid(END_OF_INPUT.to_owned())),
        }
    }

    /// Canonical textual form.
    pub fn as_str(&self) -> &str {
        match self {
            Symbol::NonTerminal(s) | Symbol::Terminal(s) => s,
            Symbol::Epsilon => EPSILON,
            Symbol::EndOfInput => END_OF_INPUT,
        }
    }
}

/// Classifies a raw token: nonterminal first, then terminal, then epsilon.
///
/// `$` is reserved for [`Symbol::EndOfInput`] and is never accepted here.
pub fn symbol_from_string(s: &str) -> Result<Symbol, SymbolError> {
    if is_non_terminal(s) {
        Ok(Symbol::NonTerminal(s.to_owned()))
    } else if is_terminal(s) {
        Ok(Symbol::Terminal(s.to_owned()))
    } else if s == EPSILON {
        Ok(Symbol::Epsilon)
    } else {
        Err(SymbolError::Invalid(s.to_owned()))
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        symbol_from_string(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
