//! Splitting decks into output pages.
//!
//! | Batch size | Policy | Page names |
//! |------------|--------|------------|
//! | none, or ≥ deck size | all | `{deck}` |
//! | 1 | single | `{deck} {title}` |
//! | 2 ≤ n < deck size | chunked | `{deck} 0`, `{deck} 1`, … |
//!
//! Page names become file names, so they pass through
//! [`sanitize_file_name`]. Single-card pages whose names collide get the
//! first free `_2`, `_3` suffix.

use std::num::NonZeroUsize;

use crate::deck::{Card, Deck, TitleCounter};
use crate::error::ConfigError;

/// A validated batch size (≥ 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    /// Validates a user-supplied batch size.
    pub fn new(n: i64) -> Result<Self, ConfigError> {
        usize::try_from(n)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or(ConfigError::InvalidBatchSize(n))
    }

    /// One card per page.
    pub fn single() -> Self {
        Self(NonZeroUsize::MIN)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// How a deck is paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    All,
    Single,
    Chunked(usize),
}

impl BatchPolicy {
    /// Chooses the policy for a deck of `len` cards.
    pub fn for_deck(size: Option<BatchSize>, len: usize) -> Self {
        match size.map(BatchSize::get) {
            Some(1) => Self::Single,
            Some(n) if n < len => Self::Chunked(n),
            _ => Self::All,
        }
    }
}

/// One output page: a borrowed run of cards from a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    pub deck_name: &'a str,
    pub name: String,
    pub index: usize,
    pub cards: &'a [Card],
}

/// Plans the pages for `deck`. An empty deck yields no pages.
pub fn plan(deck: &Deck, size: Option<BatchSize>) -> Vec<Batch<'_>> {
    if deck.cards.is_empty() {
        return Vec::new();
    }
    let prefix = sanitize_file_name(&deck.name);

    match BatchPolicy::for_deck(size, deck.cards.len()) {
        BatchPolicy::All => vec![Batch {
            deck_name: &deck.name,
            name: prefix,
            index: 0,
            cards: &deck.cards,
        }],
        BatchPolicy::Single => {
            let mut names = TitleCounter::new();
            deck.cards
                .chunks(1)
                .enumerate()
                .map(|(index, cards)| {
                    let base = format!("{prefix} {}", sanitize_file_name(&cards[0].title));
                    Batch {
                        deck_name: &deck.name,
                        name: names.next(&base),
                        index,
                        cards,
                    }
                })
                .collect()
        }
        BatchPolicy::Chunked(n) => deck
            .cards
            .chunks(n)
            .enumerate()
            .map(|(index, cards)| Batch {
                deck_name: &deck.name,
                name: format!("{prefix} {index}"),
                index,
                cards,
            })
            .collect(),
    }
}

/// Replaces characters that are invalid in file names on common platforms.
///
/// `< > : " / \ | ? *` and control characters become `_`; an empty result
/// becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn deck(titles: &[&str]) -> Deck {
        let mut deck = Deck::new("deck");
        deck.cards = titles
            .iter()
            .map(|t| Card {
                title: t.to_string(),
                fragment: Arc::from(*t),
            })
            .collect();
        deck
    }

    fn shape(batches: &[Batch<'_>]) -> Vec<(String, usize)> {
        batches.iter().map(|b| (b.name.clone(), b.cards.len())).collect()
    }

    #[test]
    fn rejects_batch_size_below_one() {
        assert!(matches!(BatchSize::new(0), Err(ConfigError::InvalidBatchSize(0))));
        assert!(matches!(BatchSize::new(-2), Err(ConfigError::InvalidBatchSize(-2))));
        assert_eq!(BatchSize::new(1).unwrap(), BatchSize::single());
    }

    #[test]
    fn chunks_of_two() {
        let d = deck(&["a", "b", "c", "d", "e"]);
        let batches = plan(&d, Some(BatchSize::new(2).unwrap()));
        assert_eq!(
            shape(&batches),
            vec![
                ("deck 0".to_string(), 2),
                ("deck 1".to_string(), 2),
                ("deck 2".to_string(), 1)
            ]
        );
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn single_uses_titles() {
        let d = deck(&["a", "b", "c", "d", "e"]);
        let names: Vec<_> = plan(&d, Some(BatchSize::single()))
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["deck a", "deck b", "deck c", "deck d", "deck e"]);
    }

    #[test]
    fn single_dedupes_names() {
        let d = deck(&["x", "x", "a/b", "a_b"]);
        let names: Vec<_> = plan(&d, Some(BatchSize::single()))
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["deck x", "deck x_2", "deck a_b", "deck a_b_2"]);
    }

    #[test]
    fn single_names_never_collide_with_real_titles() {
        let d = deck(&["x", "x", "x_2"]);
        let names: Vec<_> = plan(&d, Some(BatchSize::single()))
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["deck x", "deck x_2", "deck x_2_2"]);
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn no_size_or_large_size_is_one_page() {
        let d = deck(&["a", "b", "c", "d", "e"]);
        assert_eq!(shape(&plan(&d, None)), vec![("deck".to_string(), 5)]);
        assert_eq!(
            shape(&plan(&d, Some(BatchSize::new(5).unwrap()))),
            vec![("deck".to_string(), 5)]
        );
        assert_eq!(
            shape(&plan(&d, Some(BatchSize::new(50).unwrap()))),
            vec![("deck".to_string(), 5)]
        );
    }

    #[test]
    fn empty_deck_has_no_pages() {
        assert!(plan(&deck(&[]), None).is_empty());
        assert!(plan(&deck(&[]), Some(BatchSize::single())).is_empty());
    }

    #[test]
    fn batches_borrow_the_deck() {
        let d = deck(&["a", "b", "c"]);
        let batches = plan(&d, Some(BatchSize::new(2).unwrap()));
        assert!(std::ptr::eq(batches[0].cards.as_ptr(), d.cards.as_ptr()));
    }

    #[test]
    fn sanitizes_invalid_characters() {
        assert_eq!(sanitize_file_name("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
        assert_eq!(sanitize_file_name(""), "_");
        assert_eq!(sanitize_file_name("Don’t do it"), "Don’t do it");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(s in ".*") {
            let once = sanitize_file_name(&s);
            prop_assert_eq!(sanitize_file_name(&once), once.clone());
            prop_assert!(!once.is_empty());
        }

        #[test]
        fn chunked_pages_cover_the_deck(len in 1usize..40, size in 1i64..10) {
            let titles: Vec<String> = (0..len).map(|i| format!("c{i}")).collect();
            let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
            let d = deck(&refs);
            let batches = plan(&d, Some(BatchSize::new(size).unwrap()));
            let total: usize = batches.iter().map(|b| b.cards.len()).sum();
            prop_assert_eq!(total, len);
        }
    }
}
