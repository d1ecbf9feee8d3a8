//! Analysis and normalization of context‑free grammars for LL parsing.
//!
//! Grammars are read from a small text format, one nonterminal per line:
//!
//! ```text
//! S -> A B C
//! A -> a A | &
//! ```
//!
//! Nonterminals are `[A-Z][0-9]*`, `&` is ε, and any other token without
//! uppercase letters, whitespace, `&` or `$` is a terminal.  The first line
//! names the start symbol.
//!
//! ```rust
//! use llgram::{Grammar, LanguageSize};
//!
//! let g: Grammar = "S -> a S | a B | d S\nB -> b B | b".parse().unwrap();
//! assert!(!g.is_factored());
//!
//! let factoring = g.factor(10);
//! assert!(factoring.factored);
//! assert_eq!(factoring.grammar.language_size(), LanguageSize::Infinite);
//! ```
//!
//! Every operation is a pure function of the grammar it is called on and
//! returns fresh values; nothing is cached or mutated behind the caller.

pub mod error;
pub mod factor;
pub mod grammar;
pub mod language;
pub mod normalize;
pub mod sets;
pub mod symbol;

pub use error::{ParseError, SymbolError};
pub use factor::{Conflict, FactorConfig, Factoring, Nondeterminism};
pub use grammar::{Alternative, Grammar, ProdId, Production};
pub use language::{Analysis, LanguageSize};
pub use normalize::ProperSteps;
pub use sets::{SetMap, SymbolSet};
pub use symbol::{END_OF_INPUT, EPSILON, Symbol, symbol_from_string};
