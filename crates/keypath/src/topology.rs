//! Locality matching between key paths.
//!
//! Two paths are *local* when their wildcard positions can be resolved
//! together, i.e. they vary over the same repeated-array iteration. The
//! paths are walked segment by segment over their shared prefix:
//!
//! - equal names, equal concrete indices, or a wildcard paired with any index
//!   keep the prefix going;
//! - unequal concrete indices, or a name paired with an index, are a conflict
//!   and the paths are not local;
//! - unequal names end the shared prefix. Past that point the two tails live in
//!   parallel structures and are correlated by wildcard ordinal, so they must
//!   carry the same number of wildcards.
//!
//! A [`LocalMatcher`] resolves a wildcard target path against one concrete
//! location found while searching a document with a local search path.

use crate::keypath::{KeyPath, Segment};

enum Step {
    Shared,
    Diverged,
    Conflict,
}

fn compare(a: &Segment, b: &Segment) -> Step {
    match (a, b) {
        (Segment::Name(x), Segment::Name(y)) => {
            if x == y {
                Step::Shared
            } else {
                Step::Diverged
            }
        }
        (Segment::Wildcard, Segment::Wildcard)
        | (Segment::Wildcard, Segment::Index(_))
        | (Segment::Index(_), Segment::Wildcard) => Step::Shared,
        (Segment::Index(x), Segment::Index(y)) => {
            if x == y {
                Step::Shared
            } else {
                Step::Conflict
            }
        }
        _ => Step::Conflict,
    }
}

/// Length of the shared prefix of `a` and `b`, or `None` on a conflict
fn split_point(a: &KeyPath, b: &KeyPath) -> Option<usize> {
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        match compare(x, y) {
            Step::Shared => continue,
            Step::Diverged => return Some(i),
            Step::Conflict => return None,
        }
    }
    Some(a.len().min(b.len()))
}

fn tail_wildcards(path: &KeyPath, from: usize) -> Vec<usize> {
    path.iter()
        .enumerate()
        .skip(from)
        .filter(|(_, s)| s.is_wildcard())
        .map(|(i, _)| i)
        .collect()
}

/// True iff `a` and `b` can vary together across the same array iteration
pub fn are_local(a: &KeyPath, b: &KeyPath) -> bool {
    match split_point(a, b) {
        Some(d) => tail_wildcards(a, d).len() == tail_wildcards(b, d).len(),
        None => false,
    }
}

/// Number of wildcards the two paths vary over *independently*, i.e. past the
/// end of their shared prefix. `None` when the paths are not local.
pub fn divergent_wildcards(a: &KeyPath, b: &KeyPath) -> Option<usize> {
    let d = split_point(a, b)?;
    let left = tail_wildcards(a, d).len();
    if left == tail_wildcards(b, d).len() {
        Some(left)
    } else {
        None
    }
}

/// Precomputed substitution plan from a search path to a local target path.
///
/// Building the plan is the expensive part and happens once; `resolve` is
/// then evaluated per concrete match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatcher {
    search: KeyPath,
    target: KeyPath,
    /// For each target position, the search position whose concrete index
    /// replaces the target's wildcard there.
    sources: Vec<Option<usize>>,
}

impl LocalMatcher {
    /// `None` if `target` is not local to `search`
    pub fn new(search: &KeyPath, target: &KeyPath) -> Option<Self> {
        let d = split_point(search, target)?;
        let search_tail = tail_wildcards(search, d);
        let target_tail = tail_wildcards(target, d);
        if search_tail.len() != target_tail.len() {
            return None;
        }

        let mut sources = vec![None; target.len()];
        for (i, segment) in target.iter().enumerate().take(d) {
            if segment.is_wildcard() {
                sources[i] = Some(i);
            }
        }
        for (target_pos, search_pos) in target_tail.into_iter().zip(search_tail) {
            sources[target_pos] = Some(search_pos);
        }

        Some(Self {
            search: search.clone(),
            target: target.clone(),
            sources,
        })
    }

    pub fn search(&self) -> &KeyPath {
        &self.search
    }

    pub fn target(&self) -> &KeyPath {
        &self.target
    }

    /// Concrete target location for one concrete match of the search path.
    ///
    /// Returns `None` when `concrete` was not produced by the search path
    /// (different length, different names, or no index where the search
    /// path has a wildcard).
    pub fn resolve(&self, concrete: &KeyPath) -> Option<KeyPath> {
        if !matches_search(&self.search, concrete) {
            return None;
        }
        let mut segments = Vec::with_capacity(self.target.len());
        for (segment, source) in self.target.iter().zip(self.sources.iter()) {
            match source {
                Some(pos) => match concrete.get(*pos) {
                    Segment::Index(index) => segments.push(Segment::Index(*index)),
                    _ => return None,
                },
                None => segments.push(segment.clone()),
            }
        }
        Some(KeyPath::new(segments))
    }
}

/// True if `concrete` is one of the locations the search path can match
pub fn matches_search(search: &KeyPath, concrete: &KeyPath) -> bool {
    search.len() == concrete.len()
        && search.iter().zip(concrete.iter()).all(|(s, c)| match (s, c) {
            (Segment::Name(a), Segment::Name(b)) => a == b,
            (Segment::Index(a), Segment::Index(b)) => a == b,
            (Segment::Wildcard, Segment::Index(_)) => true,
            _ => false,
        })
}

/// Matcher anchored at one concrete location of `search`: maps any path
/// local to `search` onto the sibling location sharing its array indices.
pub fn create_local_matcher(
    search: &KeyPath,
    concrete: &KeyPath,
) -> impl Fn(&KeyPath) -> Option<KeyPath> {
    let search = search.clone();
    let concrete = concrete.clone();
    move |target: &KeyPath| LocalMatcher::new(&search, target)?.resolve(&concrete)
}

/// Fork-side matcher: one input location to one location per declared field.
///
/// The per-field plans are built once and reused for every match.
#[derive(Debug, Clone)]
pub struct OneToOneMatcher {
    plans: Vec<Option<LocalMatcher>>,
}

impl OneToOneMatcher {
    pub fn new(search: &KeyPath, targets: &[KeyPath]) -> Self {
        Self {
            plans: targets
                .iter()
                .map(|target| LocalMatcher::new(search, target))
                .collect(),
        }
    }

    /// Location of declared field `index` for one concrete input match
    pub fn resolve(&self, index: usize, concrete: &KeyPath) -> Option<KeyPath> {
        self.plans.get(index)?.as_ref()?.resolve(concrete)
    }
}

/// Where a matched input value lands, and the key of its logical row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub key: String,
    pub destination: KeyPath,
}

/// Combine-side matcher: many input locations collapsing onto one
/// destination location per logical row.
#[derive(Debug, Clone)]
pub struct BasePathMatcher {
    destination: KeyPath,
    plans: Vec<LocalMatcher>,
}

impl BasePathMatcher {
    /// `None` unless the destination is local to every input path
    pub fn new(inputs: &[KeyPath], destination: &KeyPath) -> Option<Self> {
        let plans = inputs
            .iter()
            .map(|input| LocalMatcher::new(input, destination))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            destination: destination.clone(),
            plans,
        })
    }

    pub fn destination(&self) -> &KeyPath {
        &self.destination
    }

    /// Correlate one concrete match of input `input`
    pub fn correlate(&self, input: usize, concrete: &KeyPath) -> Option<Correlation> {
        let destination = self.plans.get(input)?.resolve(concrete)?;
        Some(Correlation {
            key: hash_match_to_locale(&self.destination, &destination),
            destination,
        })
    }
}

/// Correlation key of a concrete match relative to its wildcard search path.
///
/// Empty when the search path has no wildcard (a single logical row),
/// otherwise `"{position}:{index}"` for every wildcard position, joined by
/// commas.
pub fn hash_match_to_locale(search: &KeyPath, matched: &KeyPath) -> String {
    search
        .wildcard_positions()
        .into_iter()
        .map(|pos| match matched.segments().get(pos) {
            Some(Segment::Index(index)) => format!("{}:{}", pos, index),
            _ => format!("{}:*", pos),
        })
        .collect::<Vec<_>>()
        .join(",")
}
