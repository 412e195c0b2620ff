// # Diff Engine
//
// Compares the previous keyed snapshot of a domain with the current one and
// produces typed transitions.
//
// ## Rules
//
// - No previous snapshot (first poll after start) → no transitions. The first
//   observation only establishes the baseline.
// - Key only in current → `Appeared`
// - Key only in previous → `Disappeared`
// - Key in both and the domain predicate fires → `Changed`
//
// Keys present in both snapshots are otherwise inert, so cosmetic field churn
// (uptime counters, remaining lease time ticking down) never surfaces.
//
// ## Ordering
//
// `Appeared`/`Changed` come first, in key order of the current snapshot,
// followed by `Disappeared` in key order of the previous snapshot.

use crate::snapshot::KeyedSnapshot;

/// A classified difference between two consecutive snapshots for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<K, S> {
    /// Present now, absent before
    Appeared { key: K, state: S },
    /// Present before, absent now
    Disappeared { key: K, last: S },
    /// Present in both and notably different
    Changed { key: K, before: S, after: S },
}

impl<K, S> Transition<K, S> {
    pub fn key(&self) -> &K {
        match self {
            Transition::Appeared { key, .. }
            | Transition::Disappeared { key, .. }
            | Transition::Changed { key, .. } => key,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Appeared { .. } => "appeared",
            Transition::Disappeared { .. } => "disappeared",
            Transition::Changed { .. } => "changed",
        }
    }
}

/// Diff two snapshots under a domain's change predicate
///
/// Pure function: no I/O, no logging.
pub fn diff<K, S, F>(
    previous: Option<&KeyedSnapshot<K, S>>,
    current: &KeyedSnapshot<K, S>,
    changed: F,
) -> Vec<Transition<K, S>>
where
    K: Ord + Clone,
    S: Clone,
    F: Fn(&S, &S) -> bool,
{
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut transitions = Vec::new();

    for (key, state) in current.iter() {
        match previous.get(key) {
            None => transitions.push(Transition::Appeared {
                key: key.clone(),
                state: state.clone(),
            }),
            Some(before) if changed(before, state) => transitions.push(Transition::Changed {
                key: key.clone(),
                before: before.clone(),
                after: state.clone(),
            }),
            Some(_) => {}
        }
    }

    for (key, last) in previous.iter() {
        if !current.contains_key(key) {
            transitions.push(Transition::Disappeared {
                key: key.clone(),
                last: last.clone(),
            });
        }
    }

    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    type Snap = KeyedSnapshot<&'static str, u32>;

    fn snap(entries: &[(&'static str, u32)]) -> Snap {
        entries.iter().copied().collect()
    }

    fn ne(a: &u32, b: &u32) -> bool {
        a != b
    }

    #[test]
    fn test_no_baseline_is_quiet() {
        for current in [snap(&[]), snap(&[("a", 1)]), snap(&[("a", 1), ("b", 2), ("c", 3)])] {
            assert!(diff(None, &current, ne).is_empty());
        }
    }

    #[test]
    fn test_identical_snapshots_produce_nothing() {
        let previous = snap(&[("a", 1), ("b", 2)]);
        let current = snap(&[("a", 3), ("c", 4)]);

        let first = diff(Some(&previous), &current, ne);
        assert!(!first.is_empty());

        let again = diff(Some(&current), &current, ne);
        assert!(again.is_empty());
    }

    #[test]
    fn test_appeared_disappeared_changed() {
        let previous = snap(&[("a", 1), ("b", 2), ("c", 3)]);
        let current = snap(&[("b", 2), ("c", 9), ("d", 4)]);

        let transitions = diff(Some(&previous), &current, ne);
        assert_eq!(
            transitions,
            vec![
                Transition::Changed { key: "c", before: 3, after: 9 },
                Transition::Appeared { key: "d", state: 4 },
                Transition::Disappeared { key: "a", last: 1 },
            ]
        );
    }

    #[test]
    fn test_predicate_gates_changes() {
        let previous = snap(&[("a", 1)]);
        let current = snap(&[("a", 2)]);

        assert!(diff(Some(&previous), &current, |_, _| false).is_empty());
        assert_eq!(diff(Some(&previous), &current, |b, a| a > b).len(), 1);
        assert!(diff(Some(&current), &previous, |b, a| a > b).is_empty());
    }

    #[test]
    fn test_key_partition() {
        let cases = [
            (snap(&[]), snap(&[("a", 1)])),
            (snap(&[("a", 1)]), snap(&[])),
            (snap(&[("a", 1), ("b", 1)]), snap(&[("b", 1), ("c", 1)])),
            (snap(&[("x", 1), ("y", 2), ("z", 3)]), snap(&[("x", 1), ("y", 5), ("z", 3)])),
        ];

        for (previous, current) in cases {
            let transitions = diff(Some(&previous), &current, ne);

            let appeared: BTreeSet<_> = transitions
                .iter()
                .filter(|t| matches!(t, Transition::Appeared { .. }))
                .map(|t| *t.key())
                .collect();
            let disappeared: BTreeSet<_> = transitions
                .iter()
                .filter(|t| matches!(t, Transition::Disappeared { .. }))
                .map(|t| *t.key())
                .collect();
            let common: BTreeSet<_> = current
                .keys()
                .filter(|k| previous.contains_key(*k))
                .copied()
                .collect();

            assert!(appeared.is_disjoint(&disappeared));
            assert!(appeared.is_disjoint(&common));
            assert!(disappeared.is_disjoint(&common));

            let union: BTreeSet<_> = appeared
                .iter()
                .chain(disappeared.iter())
                .chain(common.iter())
                .copied()
                .collect();
            let all_keys: BTreeSet<_> = previous.keys().chain(current.keys()).copied().collect();
            assert_eq!(union, all_keys);
        }
    }
}
