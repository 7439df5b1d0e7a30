use crate::model::card::Card;
use crate::model::suit::Suit;
use serde::{Deserialize, Serialize};

/// Cards held by one player, kept sorted by suit then rank.
///
/// Besides storage, `Hand` carries the pure queries shared by the legal-move
/// rules and by agents that reason in terms of "highest", "lowest" or
/// "lowest winning" cards. All queries return `None` (or an empty list) when
/// no card qualifies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self { cards: Vec::new() }
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        let mut hand = Self { cards };
        hand.sort();
        hand
    }

    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
        self.sort();
    }

    pub fn remove(&mut self, card: Card) -> bool {
        if let Some(index) = self.cards.iter().position(|&c| c == card) {
            self.cards.remove(index);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn of_suit(&self, suit: Suit) -> Vec<Card> {
        self.cards.iter().copied().filter(|c| c.suit == suit).collect()
    }

    pub fn has_suit(&self, suit: Suit) -> bool {
        self.cards.iter().any(|c| c.suit == suit)
    }

    /// Cards of `suit` together with every spade, without duplicates.
    pub fn of_suit_or_spades(&self, suit: Suit) -> Vec<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| c.suit == suit || c.is_spade())
            .collect()
    }

    pub fn spades(&self) -> Vec<Card> {
        self.of_suit(Suit::Spades)
    }

    pub fn non_spades(&self) -> Vec<Card> {
        self.cards.iter().copied().filter(|c| !c.is_spade()).collect()
    }

    pub fn has_non_spade(&self) -> bool {
        self.cards.iter().any(|c| !c.is_spade())
    }

    pub fn highest_of_suit(&self, suit: Suit) -> Option<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| c.suit == suit)
            .max_by_key(|c| c.rank)
    }

    pub fn lowest_of_suit(&self, suit: Suit) -> Option<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| c.suit == suit)
            .min_by_key(|c| c.rank)
    }

    /// Lowest card of `target`'s suit that ranks strictly above it.
    pub fn lowest_that_beats(&self, target: Card) -> Option<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| c.outranks(target))
            .min_by_key(|c| c.rank)
    }

    /// Lowest spade that takes `target`: any spade beats a plain card, a
    /// spade target needs a higher spade.
    pub fn lowest_spade_that_wins(&self, target: Card) -> Option<Card> {
        if target.is_spade() {
            self.lowest_that_beats(target)
        } else {
            self.lowest_of_suit(Suit::Spades)
        }
    }

    pub fn highest_non_spade(&self) -> Option<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| !c.is_spade())
            .max_by_key(|c| c.rank)
    }

    pub fn lowest_non_spade(&self) -> Option<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| !c.is_spade())
            .min_by_key(|c| c.rank)
    }

    /// Plain cards that neither follow `lead` nor trump it.
    pub fn off_suit_non_spades(&self, lead: Suit) -> Vec<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| !c.is_spade() && c.suit != lead)
            .collect()
    }

    fn sort(&mut self) {
        self.cards
            .sort_by(|a, b| a.suit.cmp(&b.suit).then(a.rank.cmp(&b.rank)));
    }
}

impl FromIterator<Card> for Hand {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Hand::with_cards(iter.into_iter().collect())
    }
}
