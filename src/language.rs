//! language.rs – properties of the language a grammar generates

use crate::factor::{Nondeterminism, find_nondeterminisms};
use crate::grammar::Grammar;
use crate::sets::{SetMap, compute_first, compute_first_nt, compute_follow, fertile};
use crate::symbol::Symbol;
use hashbrown::HashSet;
use indexmap::IndexMap;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSize {
    /// the start symbol derives no terminal string
    Empty,
    Finite,
    Infinite,
}

/// Everything the analyses compute for one grammar, computed once.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub first: SetMap,
    pub follow: SetMap,
    pub first_nt: SetMap,
    pub size: LanguageSize,
    pub nondeterminisms: Vec<Nondeterminism>,
}

impl Analysis {
    pub fn is_factored(&self) -> bool {
        self.nondeterminisms.is_empty()
    }
}

/// Edge A → B whenever B occurs in an alternative of A.
fn dependency_graph(grammar: &Grammar) -> DiGraph<Symbol, ()> {
    let mut graph = DiGraph::new();
    let nodes: IndexMap<&Symbol, NodeIndex> = grammar
        .non_terminals()
        .map(|nt| (nt, graph.add_node(nt.clone())))
        .collect();

    for (lhs, rhs) in grammar.productions() {
        for sym in rhs {
            if let Some(&to) = nodes.get(sym) {
                graph.update_edge(nodes[lhs], to, ());
            }
        }
    }
    graph
}

impl Grammar {
    /// The start symbol derives no terminal string.
    pub fn is_empty(&self) -> bool {
        !fertile(self).contains(self.start_symbol())
    }

    /// Empty when the start symbol is infertile. Otherwise the grammar is made
    /// proper, where every nonterminal is useful and every derivation step
    /// that is part of a cycle adds symbols, so the language is infinite
    /// exactly when the dependency graph has a cycle.
    pub fn language_size(&self) -> LanguageSize {
        if self.is_empty() {
            return LanguageSize::Empty;
        }

        let proper = self.to_proper().proper;
        if is_cyclic_directed(&dependency_graph(&proper)) {
            LanguageSize::Infinite
        } else {
            LanguageSize::Finite
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.language_size() == LanguageSize::Infinite
    }

    /// Every sentential form reachable from `form` by rewriting one
    /// nonterminal with one of its alternatives.  ε symbols are dropped; a
    /// form rewritten to nothing is `[Epsilon]`.
    pub fn derivations<'a>(&'a self, form: &'a [Symbol]) -> impl Iterator<Item = Vec<Symbol>> + 'a {
        form.iter()
            .enumerate()
            .filter(|(_, sym)| sym.is_non_terminal())
            .flat_map(move |(i, sym)| {
                self.alternatives(sym).iter().map(move |alt| {
                    let mut next: Vec<Symbol> = form[..i]
                        .iter()
                        .chain(alt)
                        .chain(&form[i + 1..])
                        .filter(|s| !s.is_epsilon())
                        .cloned()
                        .collect();
                    if next.is_empty() {
                        next.push(Symbol::Epsilon);
                    }
                    next
                })
            })
    }

    /// Every terminal string of at most `max_len` symbols the grammar
    /// derives.  The search runs on the proper form, where sentential forms
    /// never shrink, so it always terminates.
    pub fn sentences(&self, max_len: usize) -> BTreeSet<Vec<Symbol>> {
        let proper = self.to_proper().proper;
        let start = vec![proper.start_symbol().clone()];

        let mut ans = BTreeSet::new();
        let mut seen: HashSet<Vec<Symbol>> = HashSet::new();
        seen.insert(start.clone());
        let mut queue = VecDeque::from([start]);

        while let Some(form) = queue.pop_front() {
            if !form.iter().any(Symbol::is_non_terminal) {
                ans.insert(form.into_iter().filter(|s| !s.is_epsilon()).collect());
                continue;
            }
            for next in proper.derivations(&form) {
                let len = next.iter().filter(|s| !s.is_epsilon()).count();
                if len <= max_len && seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }

        log::debug!("{} sentences of length <= {max_len}", ans.len());
        ans
    }

    /// FIRST, FOLLOW, FIRST‑NT, language size and conflicts in one go.
    pub fn analyze(&self) -> Analysis {
        let first = compute_first(self);
        let follow = compute_follow(self, &first);
        let nondeterminisms = find_nondeterminisms(self, &first);

        Analysis {
            follow,
            first_nt: compute_first_nt(self),
            size: self.language_size(),
            nondeterminisms,
            first,
        }
    }
}
