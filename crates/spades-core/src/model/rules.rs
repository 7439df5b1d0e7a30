//! Suit-following and trick-taking rules.

use crate::model::card::Card;
use crate::model::hand::Hand;
use crate::model::trick::{Play, Trick};

/// Cards `hand` may play into `trick`.
///
/// Leading: spades only when nothing else is held. Following: cards of the
/// lead suit plus any spade, or the whole hand when void in the lead suit.
/// Never empty while the hand is not.
pub fn legal_moves(trick: &Trick, hand: &Hand) -> Vec<Card> {
    match trick.lead_suit() {
        None if hand.has_non_spade() => hand.non_spades(),
        None => hand.cards().to_vec(),
        Some(lead) if hand.has_suit(lead) => hand.of_suit_or_spades(lead),
        Some(_) => hand.cards().to_vec(),
    }
}

pub fn is_legal(trick: &Trick, hand: &Hand, card: Card) -> bool {
    hand.contains(card) && legal_moves(trick, hand).contains(&card)
}

/// Whether `challenger` takes the trick from the card currently winning it.
///
/// A spade beats any plain card. Otherwise the challenger must be of the
/// lead suit, like the best card, and rank strictly higher. On a plain lead
/// the first spade keeps the trick; off-suit plain cards never win.
pub fn beats(challenger: Card, best: Card, lead: Card) -> bool {
    if challenger.is_spade() && !best.is_spade() {
        return true;
    }
    challenger.suit == lead.suit && challenger.outranks(best)
}

/// Board position of the winning card, `None` for an empty board.
pub fn winning_position(plays: &[Play]) -> Option<usize> {
    let lead = plays.first()?.card;
    let mut best = 0;
    for (position, play) in plays.iter().enumerate().skip(1) {
        if beats(play.card, plays[best].card, lead) {
            best = position;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::{legal_moves, winning_position};
    use crate::model::card::Card;
    use crate::model::hand::Hand;
    use crate::model::player::PlayerId;
    use crate::model::trick::{Play, Trick};

    fn card(token: &str) -> Card {
        token.parse().unwrap()
    }

    fn hand(tokens: &[&str]) -> Hand {
        tokens.iter().map(|t| card(t)).collect()
    }

    fn trick_with(lead: &str) -> Trick {
        let mut trick = Trick::new(vec![PlayerId(0), PlayerId(1), PlayerId(2)]);
        trick.play(PlayerId(0), card(lead)).unwrap();
        trick
    }

    fn plays(tokens: &[&str]) -> Vec<Play> {
        tokens
            .iter()
            .enumerate()
            .map(|(idx, t)| Play {
                player: PlayerId(idx as u32),
                card: card(t),
            })
            .collect()
    }

    #[test]
    fn leading_excludes_spades_when_plain_cards_held() {
        let empty = Trick::new(vec![PlayerId(0), PlayerId(1)]);
        let held = hand(&["2C", "9H", "AS", "KS"]);
        assert_eq!(legal_moves(&empty, &held), vec![card("2C"), card("9H")]);
    }

    #[test]
    fn leading_with_only_spades_breaks_them() {
        let empty = Trick::new(vec![PlayerId(0), PlayerId(1)]);
        let held = hand(&["AS", "KS"]);
        assert_eq!(legal_moves(&empty, &held), held.cards().to_vec());
    }

    #[test]
    fn following_allows_lead_suit_and_spades() {
        let trick = trick_with("5H");
        let held = hand(&["2C", "9H", "JH", "AS"]);
        assert_eq!(
            legal_moves(&trick, &held),
            vec![card("9H"), card("JH"), card("AS")]
        );
    }

    #[test]
    fn void_in_lead_suit_allows_everything() {
        let trick = trick_with("5H");
        let held = hand(&["2C", "7D"]);
        assert_eq!(legal_moves(&trick, &held), held.cards().to_vec());
    }

    #[test]
    fn spade_lead_has_no_duplicate_moves() {
        let trick = trick_with("5S");
        let held = hand(&["2C", "3S", "QS"]);
        assert_eq!(legal_moves(&trick, &held), vec![card("3S"), card("QS")]);
    }

    #[test]
    fn empty_hand_has_no_moves() {
        let trick = trick_with("5S");
        assert!(legal_moves(&trick, &Hand::new()).is_empty());
    }

    #[test]
    fn highest_lead_suit_card_wins_without_trump() {
        assert_eq!(winning_position(&plays(&["9D", "KD", "AC", "10D"])), Some(1));
    }

    #[test]
    fn first_spade_beats_plain_cards() {
        assert_eq!(winning_position(&plays(&["AD", "2S", "KD"])), Some(1));
    }

    #[test]
    fn first_spade_holds_a_plain_lead() {
        assert_eq!(winning_position(&plays(&["AD", "4S", "JS", "3S"])), Some(1));
    }

    #[test]
    fn higher_spade_wins_a_spade_lead() {
        assert_eq!(winning_position(&plays(&["4S", "JS", "AD", "QS"])), Some(3));
    }

    #[test]
    fn off_suit_plain_card_never_wins() {
        assert_eq!(winning_position(&plays(&["2H", "AC", "AD"])), Some(0));
    }

    #[test]
    fn empty_board_has_no_winner() {
        assert_eq!(winning_position(&[]), None);
    }
}
