//! sets.rs – FIRST / FOLLOW / FIRST‑NT and the closure sets used by the
//! normalizations
//!
//! Every computation here is a monotone fixed‑point iteration: a pass only
//! ever adds symbols to a set and the universe of symbols is finite, so the
//! loops stop once a full pass changes nothing.
//!
//! Nothing is cached on the [`Grammar`]. Each function returns fresh maps
//! computed from the grammar it was handed, so results can never go stale and
//! a grammar can be analysed from several threads at once.  Callers that want
//! to reuse results keep them around themselves (see [`crate::Analysis`]).
//!
//! ## Dependency graph
//!
//! ```text
//!     compute_first ──────────┐
//!        │                    │
//!        ▼                    ▼
//!     first_of (sequences)   compute_follow  (needs FIRST)
//!
//!     compute_first_nt   fertile   reachable   nullable   (standalone)
//! ```
//!
//! ```rust
//! use llgram::{Grammar, Symbol};
//!
//! let g: Grammar = "S -> a S | &".parse().unwrap();
//! let first = g.first();
//! let s = Symbol::NonTerminal("S".into());
//! assert!(first[&s].contains(&Symbol::Epsilon));
//! assert!(g.follow()[&s].contains(&Symbol::EndOfInput));
//! ```

use crate::grammar::Grammar;
use crate::symbol::Symbol;
use hashbrown::HashSet;
use indexmap::IndexMap;

pub type SymbolSet = HashSet<Symbol>;

/// One set per nonterminal, in the grammar's insertion order.
pub type SetMap = IndexMap<Symbol, SymbolSet>;

/// Runs `pass` until it reports that nothing changed.
fn saturate(what: &str, mut pass: impl FnMut() -> bool) {
    let mut passes = 1;
    while pass() {
        passes += 1;
    }
    log::trace!("{what}: fixed point after {passes} passes");
}

fn empty_sets(grammar: &Grammar) -> SetMap {
    grammar
        .non_terminals()
        .map(|nt| (nt.clone(), SymbolSet::new()))
        .collect()
}

fn union_into(dest: &mut SymbolSet, src: impl IntoIterator<Item = Symbol>) -> bool {
    let mut grew = false;
    for sym in src {
        grew |= dest.insert(sym);
    }
    grew
}

/// FIRST of an arbitrary sequence of symbols.
///
/// Scans left to right, stopping at the first symbol that cannot derive ε;
/// ε is in the result iff every symbol of `tokens` is nullable (which holds
/// for the empty sequence).  A nonterminal without rules derives nothing and
/// ends the scan.
/// **Dependencies:** FIRST of every nonterminal, see [`compute_first`]
pub fn first_of(tokens: &[Symbol], first: &SetMap) -> SymbolSet {
    let mut ans = SymbolSet::new();
    for sym in tokens {
        match sym {
            Symbol::Terminal(_) | Symbol::EndOfInput => {
                ans.insert(sym.clone());
                return ans;
            }
            Symbol::Epsilon => {}
            Symbol::NonTerminal(_) => {
                let Some(f) = first.get(sym) else {
                    return ans;
                };
                ans.extend(f.iter().filter(|x| !x.is_epsilon()).cloned());
                if !f.contains(&Symbol::Epsilon) {
                    return ans;
                }
            }
        }
    }
    ans.insert(Symbol::Epsilon);
    ans
}

/// FIRST(A) for every nonterminal A (includes ε iff A is nullable).
pub fn compute_first(grammar: &Grammar) -> SetMap {
    let mut first = empty_sets(grammar);

    for (target, tokens) in grammar.productions() {
        let Some(set) = first.get_mut(target) else {
            continue;
        };
        match tokens.as_slice() {
            [Symbol::Epsilon] => {
                set.insert(Symbol::Epsilon);
            }
            [t @ Symbol::Terminal(_), ..] => {
                set.insert(t.clone());
            }
            _ => {}
        }
    }

    saturate("FIRST", || {
        let mut changed = false;
        for (target, tokens) in grammar.productions() {
            let found = first_of(tokens, &first);
            if let Some(set) = first.get_mut(target) {
                changed |= union_into(set, found);
            }
        }
        changed
    });

    first
}

/// FOLLOW(A) for every nonterminal A; FOLLOW(start) always holds `$`.
/// **Dependencies:** depends on a valid FIRST from [`compute_first`]
pub fn compute_follow(grammar: &Grammar, first: &SetMap) -> SetMap {
    let mut follow = empty_sets(grammar);

    // FOLLOW(A) ⊇ { t | B -> x A t y }
    for (_, tokens) in grammar.productions() {
        for pair in tokens.windows(2) {
            if let [x @ Symbol::NonTerminal(_), y @ Symbol::Terminal(_)] = pair {
                if let Some(set) = follow.get_mut(x) {
                    set.insert(y.clone());
                }
            }
        }
    }
    follow
        .entry(grammar.start_symbol().clone())
        .or_default()
        .insert(Symbol::EndOfInput);

    saturate("FOLLOW", || {
        let mut changed = false;
        for (target, tokens) in grammar.productions() {
            for (i, sym) in tokens.iter().enumerate() {
                if !sym.is_non_terminal() || !follow.contains_key(sym) {
                    continue;
                }

                // B -> x A y : FIRST(y) - {ε}, plus FOLLOW(B) when y is nullable
                let rest = first_of(&tokens[i + 1..], first);
                let inherit = rest.contains(&Symbol::Epsilon);
                let mut found: Vec<Symbol> = rest.into_iter().filter(|x| !x.is_epsilon()).collect();
                if inherit {
                    if let Some(outer) = follow.get(target) {
                        found.extend(outer.iter().cloned());
                    }
                }

                if let Some(set) = follow.get_mut(sym) {
                    changed |= union_into(set, found);
                }
            }
        }
        changed
    });

    follow
}

/// FIRST‑NT(A): the nonterminals that can head a leftmost derivation from A,
/// plus ε when A is nullable.
pub fn compute_first_nt(grammar: &Grammar) -> SetMap {
    let mut first_nt = empty_sets(grammar);

    for (target, tokens) in grammar.productions() {
        if let (Some(set), Some(head @ (Symbol::NonTerminal(_) | Symbol::Epsilon))) =
            (first_nt.get_mut(target), tokens.first())
        {
            set.insert(head.clone());
        }
    }

    saturate("FIRST-NT", || {
        let mut changed = false;
        for (target, tokens) in grammar.productions() {
            let mut found = Vec::new();
            let mut nullable = true;
            for sym in tokens {
                match sym {
                    Symbol::Terminal(_) | Symbol::EndOfInput => {
                        nullable = false;
                        break;
                    }
                    Symbol::Epsilon => {}
                    Symbol::NonTerminal(_) => {
                        found.push(sym.clone());
                        let Some(heads) = first_nt.get(sym) else {
                            nullable = false;
                            break;
                        };
                        found.extend(heads.iter().filter(|x| !x.is_epsilon()).cloned());
                        if !heads.contains(&Symbol::Epsilon) {
                            nullable = false;
                            break;
                        }
                    }
                }
            }
            if nullable {
                found.push(Symbol::Epsilon);
            }

            if let Some(set) = first_nt.get_mut(target) {
                changed |= union_into(set, found);
            }
        }
        changed
    });

    first_nt
}

/// Nonterminals that derive at least one string of terminals.
pub fn fertile(grammar: &Grammar) -> SymbolSet {
    let mut fertile = SymbolSet::new();

    saturate("fertile", || {
        let mut changed = false;
        for (target, tokens) in grammar.productions() {
            if fertile.contains(target) {
                continue;
            }
            let productive = tokens.iter().all(|sym| match sym {
                Symbol::NonTerminal(_) => fertile.contains(sym),
                Symbol::Terminal(_) | Symbol::Epsilon | Symbol::EndOfInput => true,
            });
            if productive {
                changed |= fertile.insert(target.clone());
            }
        }
        changed
    });

    log::debug!("{} fertile nonterminals", fertile.len());
    fertile
}

/// Every symbol (of any class) occurring in some derivation from the start.
pub fn reachable(grammar: &Grammar) -> SymbolSet {
    let mut reachable = SymbolSet::new();
    reachable.insert(grammar.start_symbol().clone());

    saturate("reachable", || {
        let mut changed = false;
        for (target, alts) in grammar.rules() {
            if !reachable.contains(target) {
                continue;
            }
            for sym in alts.iter().flatten() {
                if !reachable.contains(sym) {
                    changed |= reachable.insert(sym.clone());
                }
            }
        }
        changed
    });

    log::debug!("{} reachable symbols", reachable.len());
    reachable
}

/// Nonterminals that derive ε (the set usually called Ne).
pub fn nullable(grammar: &Grammar) -> SymbolSet {
    let mut nullable: SymbolSet = grammar
        .productions()
        .filter(|(_, tokens)| tokens.as_slice() == [Symbol::Epsilon])
        .map(|(target, _)| target.clone())
        .collect();

    saturate("nullable", || {
        let mut changed = false;
        for (target, tokens) in grammar.productions() {
            if nullable.contains(target) {
                continue;
            }
            if tokens.iter().all(|sym| sym.is_epsilon() || nullable.contains(sym)) {
                changed |= nullable.insert(target.clone());
            }
        }
        changed
    });

    log::debug!("{} nullable nonterminals", nullable.len());
    nullable
}

impl Grammar {
    /// See [`compute_first`].
    pub fn first(&self) -> SetMap {
        compute_first(self)
    }

    /// See [`compute_follow`]; FIRST is computed along the way.
    pub fn follow(&self) -> SetMap {
        compute_follow(self, &compute_first(self))
    }

    /// See [`compute_first_nt`].
    pub fn first_nt(&self) -> SetMap {
        compute_first_nt(self)
    }

    /// FIRST of a sequence against this grammar's FIRST sets.
    pub fn first_of_string(&self, tokens: &[Symbol]) -> SymbolSet {
        first_of(tokens, &compute_first(self))
    }

    pub fn fertile(&self) -> SymbolSet {
        fertile(self)
    }

    pub fn reachable(&self) -> SymbolSet {
        reachable(self)
    }

    pub fn nullable(&self) -> SymbolSet {
        nullable(self)
    }
}
