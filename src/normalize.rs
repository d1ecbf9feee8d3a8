//! normalize.rs – transforms that prepare a grammar for predictive parsing
//!
//! Each transform leaves `self` untouched and returns the new grammar together
//! with the set it had to discover to build it.

use crate::grammar::{Alternative, Grammar, is_unit};
use crate::sets::{SetMap, SymbolSet, fertile, nullable, reachable};
use crate::symbol::Symbol;

/// Every grammar produced while making a grammar proper, in order, with the
/// set each step discovered.
#[derive(Debug, Clone)]
pub struct ProperSteps {
    pub epsilon_free: Grammar,
    /// Ne
    pub nullable: SymbolSet,
    pub unit_free: Grammar,
    pub unit_closures: SetMap,
    pub fertile_only: Grammar,
    pub fertile: SymbolSet,
    pub proper: Grammar,
    pub reachable: SymbolSet,
}

/// All ways of deleting nullable positions from `rhs`, the original first.
///
/// Epsilon symbols are dropped outright and an alternative left with no
/// symbols is not produced.
fn without_nullables(rhs: &[Symbol], ne: &SymbolSet) -> Vec<Alternative> {
    let mut partial: Vec<Alternative> = vec![Vec::new()];
    for sym in rhs {
        if sym.is_epsilon() {
            continue;
        }
        if ne.contains(sym) {
            let skipped = partial.clone();
            partial.iter_mut().for_each(|p| p.push(sym.clone()));
            partial.extend(skipped);
        } else {
            partial.iter_mut().for_each(|p| p.push(sym.clone()));
        }
    }
    partial.retain(|p| !p.is_empty());
    partial
}

impl Grammar {
    /// Removes ε‑alternatives, returning the new grammar and Ne.
    ///
    /// When the start symbol is nullable a fresh start `S'` with
    /// `S' -> S | &` is put in front so the empty string stays in the
    /// language; no other nonterminal derives ε afterwards.
    pub fn to_epsilon_free(&self) -> (Grammar, SymbolSet) {
        let ne = nullable(self);
        let start = self.start_symbol();

        let mut ans = if ne.contains(start) {
            let new_start = self.next_nonterminal_name(start);
            log::debug!("start symbol {start} is nullable, introducing {new_start}");
            let mut g = Grammar::new(new_start.clone());
            g.add_rule(new_start.clone(), vec![start.clone()]);
            g.add_rule(new_start, vec![Symbol::Epsilon]);
            g
        } else {
            Grammar::new(start.clone())
        };

        for (lhs, rhs) in self.productions() {
            for alt in without_nullables(rhs, &ne) {
                ans.add_unique_rule(lhs.clone(), alt);
            }
        }

        log::debug!("Ne = {ne:?}");
        (ans, ne)
    }

    /// Ns(A) for every nonterminal A: A itself and everything reachable from
    /// it through alternatives made of a single nonterminal.
    pub fn simple_production_sets(&self) -> SetMap {
        let mut ns: SetMap = self
            .non_terminals()
            .map(|nt| (nt.clone(), core::iter::once(nt.clone()).collect()))
            .collect();

        let mut passes = 1;
        loop {
            let mut changed = false;
            for (lhs, rhs) in self.productions() {
                if !is_unit(rhs) {
                    continue;
                }
                // an undefined target derives nothing, so the chain is dead
                let Some(reached) = ns.get(&rhs[0]) else {
                    continue;
                };
                let reached: Vec<Symbol> = reached.iter().cloned().collect();

                // everything that reaches lhs reaches what lhs reaches
                for set in ns.values_mut().filter(|set| set.contains(lhs)) {
                    for sym in &reached {
                        changed |= set.insert(sym.clone());
                    }
                }
            }
            if !changed {
                break;
            }
            passes += 1;
        }

        log::trace!("unit closures: fixed point after {passes} passes");
        ns
    }

    /// Removes unit productions, returning the new grammar and every Ns(A).
    pub fn without_simple_productions(&self) -> (Grammar, SetMap) {
        let ns = self.simple_production_sets();
        let mut ans = Grammar::new(self.start_symbol().clone());

        for (lhs, reached) in &ns {
            // walk in grammar order so the output does not depend on hashing
            for other in self.non_terminals().filter(|nt| reached.contains(*nt)) {
                for rhs in self.alternatives(other) {
                    if !is_unit(rhs) {
                        ans.add_unique_rule(lhs.clone(), rhs.clone());
                    }
                }
            }
        }

        (ans, ns)
    }

    /// Drops every alternative mentioning an infertile nonterminal.
    ///
    /// An empty language has no useful alternatives at all; the result is
    /// then the canonical empty grammar `S -> S` over the same start symbol.
    pub fn remove_infertile(&self) -> (Grammar, SymbolSet) {
        let fertile = fertile(self);
        let start = self.start_symbol();

        if !fertile.contains(start) {
            log::debug!("language of {start} is empty");
            let mut g = Grammar::new(start.clone());
            g.add_rule(start.clone(), vec![start.clone()]);
            return (g, fertile);
        }

        let mut ans = Grammar::new(start.clone());
        for (lhs, rhs) in self.productions() {
            let useful = rhs.iter().all(|sym| match sym {
                Symbol::NonTerminal(_) => fertile.contains(sym),
                Symbol::Terminal(_) | Symbol::Epsilon | Symbol::EndOfInput => true,
            });
            if useful {
                ans.add_rule(lhs.clone(), rhs.clone());
            }
        }

        (ans, fertile)
    }

    /// Drops the rules of every nonterminal the start symbol cannot reach.
    pub fn remove_unreachable(&self) -> (Grammar, SymbolSet) {
        let reachable = reachable(self);
        let mut ans = Grammar::new(self.start_symbol().clone());

        for (lhs, rhs) in self.productions() {
            if reachable.contains(lhs) {
                ans.add_rule(lhs.clone(), rhs.clone());
            }
        }

        (ans, reachable)
    }

    /// Infertile removal followed by unreachable removal.
    ///
    /// The order matters: pruning infertile alternatives can leave symbols
    /// that are no longer reachable.
    pub fn remove_useless(&self) -> Grammar {
        self.remove_infertile().0.remove_unreachable().0
    }

    /// ε‑free, then unit‑free, then without useless symbols.
    pub fn to_proper(&self) -> ProperSteps {
        let (epsilon_free, nullable) = self.to_epsilon_free();
        let (unit_free, unit_closures) = epsilon_free.without_simple_productions();
        let (fertile_only, fertile) = unit_free.remove_infertile();
        let (proper, reachable) = fertile_only.remove_unreachable();

        ProperSteps {
            epsilon_free,
            nullable,
            unit_free,
            unit_closures,
            fertile_only,
            fertile,
            proper,
            reachable,
        }
    }
}
