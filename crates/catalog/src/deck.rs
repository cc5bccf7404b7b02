use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{CatalogError, Location, LocationCatalog};

/// Shuffled, non-repeating sampler over a [`LocationCatalog`].
///
/// One deck cycle deals every catalog index exactly once; when the deck is
/// exhausted it refills with a fresh unbiased permutation. The deck is the
/// one intentionally process-lifetime piece of game state: it is shared
/// across sessions so repeated plays avoid recently shown locations, and
/// it can be persisted and restored through [`DeckSnapshot`].
///
/// Ordering contract: when structurally avoidable, two consecutive picks
/// never share a *name*, neither across a refill boundary nor mid-cycle
/// when the catalog contains duplicate names; the first pick after a
/// refill also never repeats the previous *index*.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDeck {
    /// Remaining indices of the current cycle; picks pop from the back.
    order: Vec<u32>,
    last_index: Option<u32>,
    last_name: Option<String>,
}

/// Serializable deck state, versioned by the catalog it was dealt from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSnapshot {
    pub catalog_len: usize,
    pub catalog_digest: String,
    pub order: Vec<u32>,
    pub last_index: Option<u32>,
    pub last_name: Option<String>,
}

impl LocationDeck {
    /// Creates an empty deck. Fails with `EmptyCatalog` for a zero-entry
    /// catalog; this is fatal to session creation, not retryable.
    pub fn new(catalog: &LocationCatalog) -> Result<Self, CatalogError> {
        if catalog.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        Ok(Self {
            order: Vec::new(),
            last_index: None,
            last_name: None,
        })
    }

    /// Picks remaining in the current cycle.
    pub fn remaining(&self) -> usize {
        self.order.len()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Deals the next location, refilling with a fresh permutation when the
    /// cycle is exhausted.
    pub fn pick_next(
        &mut self,
        catalog: &LocationCatalog,
        rng: &mut impl Rng,
    ) -> Result<Location, CatalogError> {
        if catalog.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let index = loop {
            match self.order.pop() {
                // Stale indices (deck restored against a since-shrunk
                // catalog) are discarded rather than dealt.
                Some(i) if (i as usize) < catalog.len() => break i,
                Some(_) => continue,
                None => self.refill(catalog, rng),
            }
        };

        // Index deals are infallible here: the loop only breaks in range.
        let location = match catalog.get(index as usize) {
            Some(l) => l.clone(),
            None => return Err(CatalogError::EmptyCatalog),
        };

        self.last_index = Some(index);
        self.last_name = Some(location.name.clone());
        Ok(location)
    }

    /// Builds a fresh Fisher–Yates permutation of all catalog indices,
    /// then repairs it in deal order so no two consecutive deals share a
    /// name, and the first deal repeats neither the previous pick's index
    /// nor its name. Repair is best-effort: when no swap can break a
    /// repeat (single entry, or every remaining entry shares the name)
    /// the repeat is accepted.
    fn refill(&mut self, catalog: &LocationCatalog, rng: &mut impl Rng) {
        let mut seq: Vec<u32> = (0..catalog.len() as u32).collect();
        seq.shuffle(rng);

        // `order` pops from the back; repair in deal order.
        seq.reverse();
        self.separate_repeats(catalog, &mut seq);
        seq.reverse();
        self.order = seq;
    }

    /// Breaks same-name adjacencies in `seq` (deal order) by swapping.
    ///
    /// On a conflict at `i`, a later element is pulled into the slot when
    /// one fits; any conflict that swap creates further right is healed
    /// when the scan reaches it. Near the tail, where no later element
    /// remains, the conflicting element (or its left-hand partner) is
    /// pushed back into an earlier slot instead, checked against both of
    /// that slot's neighbors so the already-repaired prefix stays clean.
    fn separate_repeats(&self, catalog: &LocationCatalog, seq: &mut [u32]) {
        for i in 0..seq.len() {
            if !self.clashes_with_prev(catalog, seq, i, seq[i]) {
                continue;
            }

            let forward = (i + 1..seq.len()).find(|&j| {
                !self.clashes_with_prev(catalog, seq, i, seq[j])
                    && (j == i + 1 || !names_match(catalog, seq[i], seq[j - 1]))
            });
            if let Some(j) = forward {
                seq.swap(i, j);
                continue;
            }

            let backward = (0..i).rev().find(|&j| {
                !names_match(catalog, seq[i], seq[j])
                    && !self.clashes_with_prev(catalog, seq, j, seq[i])
                    && (j + 1 == i || !names_match(catalog, seq[i], seq[j + 1]))
                    && (j + 1 == i || !names_match(catalog, seq[j], seq[i - 1]))
            });
            if let Some(j) = backward {
                seq.swap(i, j);
                continue;
            }
            if i < 2 {
                continue;
            }

            // Relocate the left half of the pair instead.
            let relocate = (0..i - 1).rev().find(|&j| {
                !names_match(catalog, seq[i - 1], seq[j])
                    && !self.clashes_with_prev(catalog, seq, j, seq[i - 1])
                    && (j + 1 == i - 1 || !names_match(catalog, seq[i - 1], seq[j + 1]))
                    && (j == i - 2 || !names_match(catalog, seq[j], seq[i - 2]))
            });
            if let Some(j) = relocate {
                seq.swap(i - 1, j);
            }
        }
    }

    /// Would dealing `candidate` at position `pos` repeat what comes right
    /// before it? Position 0 checks against the previous pick, by index
    /// and by name; later positions check names only (indices within one
    /// cycle are unique by construction).
    fn clashes_with_prev(
        &self,
        catalog: &LocationCatalog,
        seq: &[u32],
        pos: usize,
        candidate: u32,
    ) -> bool {
        if pos == 0 {
            if self.last_index == Some(candidate) {
                return true;
            }
            match (&self.last_name, catalog.get(candidate as usize)) {
                (Some(last), Some(loc)) => *last == loc.name,
                _ => false,
            }
        } else {
            names_match(catalog, seq[pos - 1], candidate)
        }
    }

    pub fn snapshot(&self, catalog: &LocationCatalog) -> DeckSnapshot {
        DeckSnapshot {
            catalog_len: catalog.len(),
            catalog_digest: catalog.digest(),
            order: self.order.clone(),
            last_index: self.last_index,
            last_name: self.last_name.clone(),
        }
    }

    /// Restores a persisted deck against the live catalog.
    ///
    /// Returns `None` (discard and reshuffle, not an error) when the
    /// snapshot was dealt from a different catalog — length or digest
    /// mismatch — or when its order is structurally invalid (out-of-range
    /// or duplicate indices).
    pub fn restore(snapshot: &DeckSnapshot, catalog: &LocationCatalog) -> Option<Self> {
        if catalog.is_empty()
            || snapshot.catalog_len != catalog.len()
            || snapshot.catalog_digest != catalog.digest()
        {
            return None;
        }

        let mut seen = vec![false; catalog.len()];
        for &i in &snapshot.order {
            match seen.get_mut(i as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => return None,
            }
        }

        Some(Self {
            order: snapshot.order.clone(),
            last_index: snapshot.last_index,
            last_name: snapshot.last_name.clone(),
        })
    }
}

fn names_match(catalog: &LocationCatalog, a: u32, b: u32) -> bool {
    match (catalog.get(a as usize), catalog.get(b as usize)) {
        (Some(a), Some(b)) => a.name == b.name,
        _ => false,
    }
}
