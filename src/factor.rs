//! factor.rs – FIRST/FIRST conflicts and left‑factoring
//!
//! Two alternatives of the same nonterminal *conflict* when their FIRST sets
//! intersect: a predictive parser looking at one symbol cannot choose
//! between them.  Conflicts come in three shapes, see [`Conflict`].
//!
//! [`Grammar::factor_with`] removes conflicts one at a time, each step
//! building a new grammar from the previous one.  Duplicates and direct
//! conflicts are rewritten before indirect ones.  An indirect conflict is
//! rewritten by expanding a leading nonterminal, but never one that is left
//! recursive (`X ∈ FIRST‑NT(X)`): substituting such a nonterminal into itself
//! only grows the grammar.  Those conflicts stay in place.

use crate::grammar::{Alternative, Grammar, ProdId};
use crate::sets::{SetMap, SymbolSet, compute_first, compute_first_nt, first_of};
use crate::symbol::Symbol;
use either::Either;
use indexmap::IndexSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// both alternatives are the same sequence
    Duplicate,
    /// both alternatives start with this symbol
    Direct(Symbol),
    /// the lookaheads only meet after expanding a leading nonterminal
    Indirect,
}

/// A pair of alternatives of `non_terminal` with overlapping FIRST sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nondeterminism {
    pub non_terminal: Symbol,
    /// indices into the alternatives of `non_terminal`, first < second
    pub alternatives: (ProdId, ProdId),
    /// FIRST(first) ∩ FIRST(second)
    pub lookahead: SymbolSet,
    pub conflict: Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorConfig {
    /// upper bound on rewriting steps
    pub max_steps: usize,
    /// expand leading nonterminals to expose indirect common prefixes; when
    /// off, indirect conflicts are reported and left in place
    pub resolve_indirect: bool,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            max_steps: 32,
            resolve_indirect: true,
        }
    }
}

/// Outcome of [`Grammar::factor_with`].
#[derive(Debug, Clone)]
pub struct Factoring {
    pub grammar: Grammar,
    pub factored: bool,
    /// rewriting steps actually applied
    pub steps: usize,
}

fn classify(a: &[Symbol], b: &[Symbol]) -> Conflict {
    if a == b {
        return Conflict::Duplicate;
    }
    match (a.first(), b.first()) {
        (Some(x), Some(y)) if x == y && !x.is_epsilon() => Conflict::Direct(x.clone()),
        _ => Conflict::Indirect,
    }
}

/// Every conflicting pair of alternatives, per nonterminal in grammar order.
/// **Dependencies:** depends on a valid FIRST of `grammar`
pub fn find_nondeterminisms(grammar: &Grammar, first: &SetMap) -> Vec<Nondeterminism> {
    let mut ans = Vec::new();
    for (nt, alts) in grammar.rules() {
        let firsts: Vec<SymbolSet> = alts.iter().map(|alt| first_of(alt, first)).collect();

        for i in 0..alts.len() {
            for j in i + 1..alts.len() {
                let lookahead: SymbolSet = firsts[i].intersection(&firsts[j]).cloned().collect();
                if lookahead.is_empty() {
                    continue;
                }
                ans.push(Nondeterminism {
                    non_terminal: nt.clone(),
                    alternatives: (i, j),
                    lookahead,
                    conflict: classify(&alts[i], &alts[j]),
                });
            }
        }
    }
    ans
}

/// Copy of `grammar` where `nt` has the alternatives `alts` instead.
fn with_alternatives(grammar: &Grammar, nt: &Symbol, alts: Vec<Alternative>) -> Grammar {
    let mut ans = Grammar::new(grammar.start_symbol().clone());
    let mut alts = Some(alts);
    for (lhs, old) in grammar.rules() {
        if lhs == nt {
            for rhs in alts.take().into_iter().flatten() {
                ans.add_rule(lhs.clone(), rhs);
            }
        } else {
            for rhs in old {
                ans.add_rule(lhs.clone(), rhs.clone());
            }
        }
    }
    ans
}

/// `body` followed by `tail`, without ε symbols.
fn splice(body: &[Symbol], tail: &[Symbol]) -> Alternative {
    let ans: Alternative = body
        .iter()
        .chain(tail)
        .filter(|s| !s.is_epsilon())
        .cloned()
        .collect();
    if ans.is_empty() {
        vec![Symbol::Epsilon]
    } else {
        ans
    }
}

/// The leading symbol of `alt` can be rewritten without feeding a
/// left‑recursive nonterminal back into itself.
fn expandable(alt: &[Symbol], first_nt: &SetMap) -> bool {
    match alt {
        [head @ Symbol::NonTerminal(_), ..] => {
            first_nt.get(head).is_none_or(|heads| !heads.contains(head))
        }
        [Symbol::Epsilon, _, ..] => true,
        _ => false,
    }
}

/// Alternatives obtained by rewriting the leading symbol of `alt` once.
fn expand_leading<'a>(grammar: &'a Grammar, alt: &'a [Symbol]) -> impl Iterator<Item = Alternative> + 'a {
    match alt.split_first() {
        Some((head @ Symbol::NonTerminal(_), tail)) => Either::Left(
            grammar
                .alternatives(head)
                .iter()
                .map(move |body| splice(body, tail)),
        ),
        _ => Either::Right(core::iter::once(splice(&[], alt))),
    }
}

fn merge_duplicate(grammar: &Grammar, c: &Nondeterminism) -> Grammar {
    let (_, j) = c.alternatives;
    let alts = grammar
        .alternatives(&c.non_terminal)
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != j)
        .map(|(_, alt)| alt.clone())
        .collect();
    with_alternatives(grammar, &c.non_terminal, alts)
}

/// `A -> x α | x β` becomes `A -> x A'` and `A' -> α | β`.
fn factor_direct(grammar: &Grammar, c: &Nondeterminism, common: &Symbol) -> Grammar {
    let nt = &c.non_terminal;
    let (i, j) = c.alternatives;
    let old = grammar.alternatives(nt);
    let fresh = grammar.next_nonterminal_name(nt);

    let mut alts = Vec::with_capacity(old.len() - 1);
    for (k, alt) in old.iter().enumerate() {
        if k == i {
            alts.push(vec![common.clone(), fresh.clone()]);
        } else if k != j {
            alts.push(alt.clone());
        }
    }

    let mut ans = with_alternatives(grammar, nt, alts);
    ans.add_rule(fresh.clone(), splice(&old[i][1..], &[]));
    ans.add_rule(fresh, splice(&old[j][1..], &[]));
    ans
}

/// Rewrites the leading symbol of one side of the pair so that a common
/// prefix can surface; `None` when neither side can be rewritten.
///
/// **Dependencies:** depends on a valid FIRST‑NT of `grammar`
fn expand_indirect(grammar: &Grammar, c: &Nondeterminism, first_nt: &SetMap) -> Option<Grammar> {
    let nt = &c.non_terminal;
    let (i, j) = c.alternatives;
    let old = grammar.alternatives(nt);
    let k = [i, j].into_iter().find(|&k| expandable(&old[k], first_nt))?;

    let alts: IndexSet<Alternative> = old
        .iter()
        .enumerate()
        .flat_map(|(idx, alt)| {
            if idx == k {
                Either::Left(expand_leading(grammar, alt))
            } else {
                Either::Right(core::iter::once(alt.clone()))
            }
        })
        .collect();

    Some(with_alternatives(grammar, nt, alts.into_iter().collect()))
}

/// One rewriting step for `c`, if the configuration allows one.
fn resolve(
    grammar: &Grammar,
    c: &Nondeterminism,
    first_nt: &SetMap,
    config: &FactorConfig,
) -> Option<Grammar> {
    match &c.conflict {
        Conflict::Duplicate => Some(merge_duplicate(grammar, c)),
        Conflict::Direct(common) => Some(factor_direct(grammar, c, common)),
        Conflict::Indirect if config.resolve_indirect => expand_indirect(grammar, c, first_nt),
        Conflict::Indirect => {
            log::debug!(
                "leaving indirect conflict in {} between alternatives {:?}",
                c.non_terminal,
                c.alternatives
            );
            None
        }
    }
}

impl Grammar {
    /// See [`find_nondeterminisms`].
    pub fn find_nondeterminisms(&self) -> Vec<Nondeterminism> {
        find_nondeterminisms(self, &compute_first(self))
    }

    /// No two alternatives of any nonterminal have intersecting FIRST sets.
    pub fn is_factored(&self) -> bool {
        self.find_nondeterminisms().is_empty()
    }

    /// [`Grammar::factor_with`] using at most `max_steps` steps.
    pub fn factor(&self, max_steps: usize) -> Factoring {
        self.factor_with(FactorConfig {
            max_steps,
            ..FactorConfig::default()
        })
    }

    /// Left‑factors a copy of `self`, one conflict per step.
    ///
    /// Stops as soon as the grammar is factored, when `config.max_steps` is
    /// reached, or when none of the remaining conflicts can be rewritten.
    pub fn factor_with(&self, config: FactorConfig) -> Factoring {
        let mut current = self.clone();
        let mut steps = 0;

        while steps < config.max_steps {
            let mut conflicts = current.find_nondeterminisms();
            if conflicts.is_empty() {
                log::debug!("factored after {steps} steps");
                return Factoring {
                    grammar: current,
                    factored: true,
                    steps,
                };
            }

            conflicts.sort_by_key(|c| c.conflict == Conflict::Indirect);
            let first_nt = compute_first_nt(&current);
            let Some(next) = conflicts
                .iter()
                .find_map(|c| resolve(&current, c, &first_nt, &config))
            else {
                log::warn!(
                    "{} conflicts left that cannot be factored",
                    conflicts.len()
                );
                break;
            };

            log::trace!("factoring step {steps}:\n{next}");
            current = next;
            steps += 1;
        }

        let factored = current.is_factored();
        if !factored && steps == config.max_steps {
            log::warn!("gave up factoring after {steps} steps");
        }
        Factoring {
            grammar: current,
            factored,
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Conflict, FactorConfig};
    use crate::grammar::Grammar;
    use crate::sets::SymbolSet;
    use crate::symbol::Symbol;

    fn t(s: &str) -> Symbol {
        Symbol::Terminal(s.to_owned())
    }

    fn nt(s: &str) -> Symbol {
        Symbol::NonTerminal(s.to_owned())
    }

    fn grammar(text: &str) -> Grammar {
        text.parse().unwrap()
    }

    /// total number of right‑hand side symbols
    fn size(g: &Grammar) -> usize {
        g.productions().map(|(_, rhs)| rhs.len()).sum()
    }

    const DIRECT: &str = "
        S -> a S | a B | d S
        B -> b B | b
    ";

    const INDIRECT: &str = "
        S -> A B | B C
        A -> a A | &
        B -> b B | d
        C -> c C | c
    ";

    #[test]
    fn detects_factored_grammars() {
        assert!(!grammar(DIRECT).is_factored());
        assert!(!grammar(INDIRECT).is_factored());
        assert!(
            grammar(
                "
                S  -> a S1 | d S
                S1 -> S | B
                B  -> b B1
                B1 -> B | &
                "
            )
            .is_factored()
        );
        assert!(
            grammar(
                "
                S -> a A B | B C1
                A -> a A | &
                B -> b B | d
                C -> c C1
                C1 -> C | &
                "
            )
            .is_factored()
        );
    }

    #[test]
    fn lists_every_pair_once() {
        let found = grammar("S -> a | a b | a c").find_nondeterminisms();
        let pairs: Vec<_> = found.iter().map(|c| c.alternatives).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
        assert!(found.iter().all(|c| c.conflict == Conflict::Direct(t("a"))));
    }

    #[test]
    fn classifies_conflicts() {
        let found = grammar(INDIRECT).find_nondeterminisms();
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].non_terminal, nt("S"));
        assert_eq!(found[0].conflict, Conflict::Indirect);
        assert_eq!(
            found[0].lookahead,
            [t("b"), t("d")].into_iter().collect::<SymbolSet>()
        );

        assert_eq!(found[1].non_terminal, nt("C"));
        assert_eq!(found[1].conflict, Conflict::Direct(t("c")));

        let dup = grammar("S -> a b | a b").find_nondeterminisms();
        assert_eq!(dup[0].conflict, Conflict::Duplicate);
    }

    #[test]
    fn direct_factoring() {
        let g = grammar(DIRECT);
        let f = g.factor(10);

        assert!(f.factored);
        assert_eq!(f.steps, 2);
        assert_eq!(
            f.grammar.to_string(),
            "S -> a S1 | d S\nB -> b B1\nS1 -> S | B\nB1 -> B | &"
        );
        // the input is left alone
        assert!(!g.is_factored());
    }

    #[test]
    fn indirect_factoring_expands_leading_non_terminals() {
        let f = grammar(INDIRECT).factor(10);

        assert!(f.factored);
        assert_eq!(f.steps, 3);
        assert_eq!(
            f.grammar.to_string(),
            "S -> a A B | B S1\nA -> a A | &\nB -> b B | d\nC -> c C1\nC1 -> C | &\nS1 -> & | C"
        );
    }

    #[test]
    fn indirect_conflicts_can_be_left_alone() {
        let f = grammar(INDIRECT).factor_with(FactorConfig {
            max_steps: 10,
            resolve_indirect: false,
        });

        assert!(!f.factored);
        assert_eq!(f.steps, 1);
        let left = f.grammar.find_nondeterminisms();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].conflict, Conflict::Indirect);
        assert_eq!(f.grammar.alternatives(&nt("S")), grammar(INDIRECT).alternatives(&nt("S")));
    }

    #[test]
    fn duplicates_are_merged() {
        let f = grammar("S -> a b | c | a b").factor(3);
        assert!(f.factored);
        assert_eq!(f.grammar.to_string(), "S -> a b | c");
    }

    #[test]
    fn expansion_removes_duplicates() {
        let f = grammar("S -> A | a\nA -> a").factor(5);
        assert!(f.factored);
        assert_eq!(f.steps, 1);
        assert_eq!(f.grammar.to_string(), "S -> a\nA -> a");
    }

    #[test]
    fn direct_conflicts_go_before_indirect_ones() {
        let f = grammar(INDIRECT).factor(1);
        assert_eq!(f.steps, 1);
        assert_eq!(f.grammar.alternatives(&nt("C")), &[vec![t("c"), nt("C1")]]);
        assert_eq!(f.grammar.alternatives(&nt("S")), grammar(INDIRECT).alternatives(&nt("S")));
    }

    #[test]
    fn left_recursion_is_not_expanded() {
        for text in ["S -> S a | b", "S -> S a | b | c"] {
            let g = grammar(text);
            let f = g.factor_with(FactorConfig::default());

            assert!(!f.factored, "{text}");
            assert_eq!(f.steps, 0, "{text}");
            assert_eq!(f.grammar, g);
            assert!(
                f.grammar
                    .find_nondeterminisms()
                    .iter()
                    .all(|c| c.conflict == Conflict::Indirect)
            );
        }
    }

    #[test]
    fn expression_grammar_stays_small() {
        let g = grammar("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id");
        let f = g.factor_with(FactorConfig::default());

        // only F, which is not left recursive, gets expanded into T
        assert!(!f.factored);
        assert_eq!(f.steps, 1);
        assert_eq!(
            f.grammar.to_string(),
            "E -> E + T | T\nT -> T * F | ( E ) | id\nF -> ( E ) | id"
        );
        assert_eq!(size(&f.grammar), 15);
        assert_eq!(f.grammar.factor(100).grammar, f.grammar);
    }

    #[test]
    fn unit_cycles_are_left_alone() {
        let g = grammar("S -> A\nA -> B\nB -> S | a");
        let f = g.factor(30);

        assert!(!f.factored);
        assert_eq!(f.steps, 0);
        assert_eq!(f.grammar, g);
        assert_eq!(size(&f.grammar), size(&g));
    }

    #[test]
    fn already_factored_takes_no_steps() {
        let g = grammar("S -> a S | b");
        let f = g.factor(0);
        assert!(f.factored);
        assert_eq!(f.steps, 0);
        assert_eq!(f.grammar, g);
    }
}
