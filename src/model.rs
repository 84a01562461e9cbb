//! In-memory statistics model.
//!
//! One [`CharacterNode`] per start character, stored in a contiguous table and
//! addressed through a character index. Load order is kept as explicit
//! sibling chains:
//!
//! - a top-level chain over all characters (`head` → `next_sibling` → ...),
//! - for every character, a chain over its transitions (`first_child` →
//!   `TransitionEdge::next_sibling` → ... → `last_child`).
//!
//! The model is immutable once [`ModelBuilder::finish`] returns, so it can be
//! shared by reference across any number of enumeration sessions.
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Weight added to the level when a character starts a guess or a transition
/// is taken. Lower is more likely.
pub type Probability = u32;

/// Cumulative weight of a guess.
pub type Level = u64;

/// Transition from a character to a following one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionEdge {
    /// Level contribution when this edge is taken
    pub probability: Probability,
    /// Next following character inserted under the same parent
    pub next_sibling: Option<char>,
}

/// Statistics for a single start character.
#[derive(Clone, Debug)]
pub struct CharacterNode {
    start_probability: Probability,
    transitions: HashMap<char, TransitionEdge>,
    first_child: Option<char>,
    last_child: Option<char>,
    next_sibling: Option<char>,
}

impl CharacterNode {
    fn new(start_probability: Probability) -> Self {
        Self {
            start_probability,
            transitions: HashMap::new(),
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }

    /// Level contribution when this character starts a guess.
    pub fn start_probability(&self) -> Probability {
        self.start_probability
    }

    /// Edge toward `next`, if one was loaded.
    pub fn transition(&self, next: char) -> Option<&TransitionEdge> {
        self.transitions.get(&next)
    }

    /// First following character in load order.
    pub fn first_child(&self) -> Option<char> {
        self.first_child
    }

    /// Last following character in load order.
    pub fn last_child(&self) -> Option<char> {
        self.last_child
    }

    /// Character loaded right after this one at the top level.
    pub fn next_sibling(&self) -> Option<char> {
        self.next_sibling
    }

    /// Number of outgoing transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Following characters with their edge probability, in load order.
    pub fn children(&self) -> impl Iterator<Item = (char, Probability)> + '_ {
        std::iter::successors(self.first_child, |c| {
            self.transitions.get(c).and_then(|edge| edge.next_sibling)
        })
        .filter_map(|c| self.transitions.get(&c).map(|edge| (c, edge.probability)))
    }

    /// Inserts or overwrites the edge toward `next`, appending new edges to
    /// the end of the child chain.
    ///
    /// Returns `true` if the edge already existed.
    fn upsert_transition(&mut self, next: char, probability: Probability) -> bool {
        if let Some(edge) = self.transitions.get_mut(&next) {
            edge.probability = probability;
            return true;
        }

        self.transitions.insert(
            next,
            TransitionEdge {
                probability,
                next_sibling: None,
            },
        );
        if let Some(last) = self.last_child {
            if let Some(edge) = self.transitions.get_mut(&last) {
                edge.next_sibling = Some(next);
            }
        }
        if self.first_child.is_none() {
            self.first_child = Some(next);
        }
        self.last_child = Some(next);
        false
    }

    /// Unlinks every edge whose target satisfies `dangling`, keeping the
    /// chain order of the remaining ones.
    ///
    /// Returns the number of edges removed.
    fn unlink_where(&mut self, dangling: impl Fn(char) -> bool) -> usize {
        let order: Vec<char> = self.children().map(|(c, _)| c).collect();
        let (kept, dropped): (Vec<char>, Vec<char>) =
            order.into_iter().partition(|&c| !dangling(c));
        if dropped.is_empty() {
            return 0;
        }

        for c in &dropped {
            self.transitions.remove(c);
        }
        for pair in kept.windows(2) {
            if let Some(edge) = self.transitions.get_mut(&pair[0]) {
                edge.next_sibling = Some(pair[1]);
            }
        }
        if let Some(&last) = kept.last() {
            if let Some(edge) = self.transitions.get_mut(&last) {
                edge.next_sibling = None;
            }
        }
        self.first_child = kept.first().copied();
        self.last_child = kept.last().copied();
        dropped.len()
    }
}

/// Overview of a loaded model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    /// Number of start characters
    pub characters: usize,
    /// Number of transitions kept in the model
    pub transitions: usize,
    /// Transitions toward characters that never got a start record
    pub dropped_transitions: usize,
    /// First character of the top-level chain
    pub head: Option<char>,
    /// Lowest level from which guesses can grow forever at no cost
    pub endless_from: Option<Level>,
}

/// Read-only character statistics.
#[derive(Clone, Debug)]
pub struct Model {
    nodes: Vec<CharacterNode>,
    index: HashMap<char, usize>,
    head: Option<char>,
    dropped_transitions: usize,
    endless_from: Option<Level>,
}

impl Model {
    /// Returns the node for `c`, if `c` has a start record.
    pub fn node(&self, c: char) -> Option<&CharacterNode> {
        self.index.get(&c).map(|&i| &self.nodes[i])
    }

    /// First character loaded.
    pub fn head(&self) -> Option<char> {
        self.head
    }

    /// Number of start characters.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the model has no characters at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Start weight of `c`, if `c` has a start record.
    pub fn start_probability(&self, c: char) -> Option<Probability> {
        self.node(c).map(CharacterNode::start_probability)
    }

    /// Probability of `next` following `prev`.
    pub fn transition(&self, prev: char, next: char) -> Option<Probability> {
        self.node(prev)?.transition(next).map(|edge| edge.probability)
    }

    /// First following character of `c` in load order.
    pub fn first_child(&self, c: char) -> Option<char> {
        self.node(c)?.first_child()
    }

    /// Last following character of `c` in load order.
    pub fn last_child(&self, c: char) -> Option<char> {
        self.node(c)?.last_child()
    }

    /// Next start character after `c` in load order.
    pub fn top_sibling_after(&self, c: char) -> Option<char> {
        self.node(c)?.next_sibling()
    }

    /// Next following character after `child` under `parent` in load order.
    pub fn child_sibling_after(&self, parent: char, child: char) -> Option<char> {
        self.node(parent)?.transition(child)?.next_sibling
    }

    /// Start characters in load order.
    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        std::iter::successors(self.head, |&c| self.top_sibling_after(c))
    }

    /// Lowest level at which some guess can be extended forever through
    /// zero-weight transitions.
    ///
    /// A band whose max level reaches this value has infinitely many guesses
    /// unless a length limit is set. `None` when no such extension exists.
    pub fn endless_from(&self) -> Option<Level> {
        self.endless_from
    }

    /// Counts and head of the model.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            characters: self.nodes.len(),
            transitions: self.nodes.iter().map(CharacterNode::transition_count).sum(),
            dropped_transitions: self.dropped_transitions,
            head: self.head,
            endless_from: self.endless_from,
        }
    }
}

/// Incremental construction of a [`Model`] from unigram and bigram records.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    nodes: Vec<CharacterNode>,
    index: HashMap<char, usize>,
    head: Option<char>,
    tail: Option<char>,
}

impl ModelBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `c` as a start character.
    ///
    /// A new character is appended to the top-level chain. Declaring an
    /// existing character again only overwrites its start probability.
    pub fn add_unigram(&mut self, c: char, probability: Probability) -> &mut Self {
        if let Some(&i) = self.index.get(&c) {
            warn!(
                "Start record for {:?} repeated, overwriting probability {} with {}",
                c, self.nodes[i].start_probability, probability
            );
            self.nodes[i].start_probability = probability;
            return self;
        }

        self.index.insert(c, self.nodes.len());
        self.nodes.push(CharacterNode::new(probability));
        if let Some(&tail) = self.tail.as_ref().and_then(|t| self.index.get(t)) {
            self.nodes[tail].next_sibling = Some(c);
        }
        if self.head.is_none() {
            self.head = Some(c);
        }
        self.tail = Some(c);
        self
    }

    /// Records the probability of `next` following `prev`.
    ///
    /// # Errors
    /// Returns `Error::MalformedStatistics` if `prev` has no start record yet.
    pub fn add_bigram(&mut self, prev: char, next: char, probability: Probability) -> Result<&mut Self> {
        let i = *self.index.get(&prev).ok_or_else(|| {
            Error::MalformedStatistics(format!(
                "transition from {:?} (U+{:04X}) before its start record",
                prev, prev as u32
            ))
        })?;

        if self.nodes[i].upsert_transition(next, probability) {
            warn!(
                "Transition {:?} -> {:?} repeated, keeping the last probability {}",
                prev, next, probability
            );
        }
        Ok(self)
    }

    /// Freezes the model.
    ///
    /// Transitions toward characters that never received a start record are
    /// unlinked, so such characters can never be part of a guess. The level
    /// from which zero-weight cycles make the guess space infinite is
    /// computed here once.
    pub fn finish(mut self) -> Model {
        let index = &self.index;
        let dropped_transitions: usize = self
            .nodes
            .iter_mut()
            .map(|node| node.unlink_where(|c| !index.contains_key(&c)))
            .sum();
        if dropped_transitions > 0 {
            warn!(
                "Dropped {} transitions toward characters without a start record",
                dropped_transitions
            );
        }
        let endless_from = endless_from(&self.nodes, &self.index);
        if let Some(level) = endless_from {
            warn!(
                "Zero-weight cycle reachable at level {}, bands reaching it need a length limit",
                level
            );
        }
        debug!(
            "Model finished with {} characters, head {:?}",
            self.nodes.len(),
            self.head
        );

        Model {
            nodes: self.nodes,
            index: self.index,
            head: self.head,
            dropped_transitions,
            endless_from,
        }
    }
}

/// Lowest level of a guess that can be extended forever at no cost.
///
/// Nodes with no zero-weight edge are peeled off repeatedly; what remains has
/// an endless zero-weight walk. The answer is the smallest level at which any
/// remaining node can be reached, found with a shortest-path search seeded by
/// the start weights.
fn endless_from(nodes: &[CharacterNode], index: &HashMap<char, usize>) -> Option<Level> {
    let mut zero_out = vec![0usize; nodes.len()];
    let mut zero_in: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for (c, probability) in node.children() {
            if let (0, Some(&j)) = (probability, index.get(&c)) {
                zero_out[i] += 1;
                zero_in[j].push(i);
            }
        }
    }

    let mut endless = vec![true; nodes.len()];
    let mut stuck: Vec<usize> = (0..nodes.len()).filter(|&i| zero_out[i] == 0).collect();
    while let Some(i) = stuck.pop() {
        endless[i] = false;
        for &p in &zero_in[i] {
            zero_out[p] -= 1;
            if zero_out[p] == 0 {
                stuck.push(p);
            }
        }
    }
    if !endless.contains(&true) {
        return None;
    }

    let mut settled = vec![false; nodes.len()];
    let mut heap: BinaryHeap<Reverse<(Level, usize)>> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| Reverse((Level::from(node.start_probability), i)))
        .collect();
    while let Some(Reverse((level, i))) = heap.pop() {
        if settled[i] {
            continue;
        }
        settled[i] = true;
        if endless[i] {
            return Some(level);
        }
        for (c, probability) in nodes[i].children() {
            if let Some(&j) = index.get(&c).filter(|&&j| !settled[j]) {
                heap.push(Reverse((level + Level::from(probability), j)));
            }
        }
    }
    None
}
