//! Grouping rendered cards into decks.
//!
//! Two optional columns steer assembly:
//!
//! - `Deck`: the deck a row belongs to. Empty or absent means the card type
//!   name.
//! - `Copies`: how many identical cards the row produces. Anything that is
//!   not a positive integer means 1.
//!
//! Decks keep the order in which they were first seen, and cards keep row
//! order within each deck.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cardpress_table::Record;

/// Column naming the deck of a row.
pub const DECK_FIELD: &str = "Deck";

/// Column giving the number of copies of a row.
pub const COPIES_FIELD: &str = "Copies";

/// One rendered card. Copies share the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub fragment: Arc<str>,
}

/// An ordered, named collection of cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub name: String,
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cards: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Makes repeated names unique: `a`, `a_2`, `a_3`, …
///
/// A generated name never equals one handed out earlier, even when a later
/// title is literally `a_2`.
#[derive(Debug, Default)]
pub struct TitleCounter {
    used: HashSet<String>,
    suffixes: HashMap<String, usize>,
}

impl TitleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `title` if unused, otherwise the first free `title_n`.
    pub fn next(&mut self, title: &str) -> String {
        if self.used.insert(title.to_string()) {
            return title.to_string();
        }
        let n = self.suffixes.entry(title.to_string()).or_insert(1);
        loop {
            *n += 1;
            let candidate = format!("{title}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// The deck a record belongs to.
pub fn deck_name(record: &Record, card_type: &str) -> String {
    record
        .get(DECK_FIELD)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(card_type)
        .to_string()
}

/// Number of copies requested by a record (at least 1).
pub fn copies(record: &Record) -> usize {
    record
        .get(COPIES_FIELD)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(1)
}

/// Builds the decks for one card type.
#[derive(Debug)]
pub struct DeckAssembler {
    card_type: String,
    decks: Vec<Deck>,
    positions: HashMap<String, usize>,
    titles: TitleCounter,
}

impl DeckAssembler {
    pub fn new(card_type: impl Into<String>) -> Self {
        Self {
            card_type: card_type.into(),
            decks: Vec::new(),
            positions: HashMap::new(),
            titles: TitleCounter::new(),
        }
    }

    /// Adds the cards for one rendered row.
    pub fn push(&mut self, record: &Record, fragment: Arc<str>) {
        let title = self.titles.next(&record.title);
        let name = deck_name(record, &self.card_type);
        let count = copies(record);

        let index = match self.positions.get(&name) {
            Some(&index) => index,
            None => {
                self.decks.push(Deck::new(name.clone()));
                self.positions.insert(name, self.decks.len() - 1);
                self.decks.len() - 1
            }
        };

        let deck = &mut self.decks[index];
        deck.cards.extend((0..count).map(|_| Card {
            title: title.clone(),
            fragment: Arc::clone(&fragment),
        }));
    }

    /// Total cards across all decks so far.
    pub fn card_count(&self) -> usize {
        self.decks.iter().map(Deck::len).sum()
    }

    pub fn finish(self) -> Vec<Deck> {
        self.decks
    }
}
