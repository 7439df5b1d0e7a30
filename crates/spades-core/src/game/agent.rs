use crate::game::engine::GameResult;
use crate::model::card::Card;
use crate::model::hand::Hand;
use crate::model::player::PlayerId;
use crate::model::round::RoundState;
use crate::model::rules;
use crate::model::trick::Trick;
use std::collections::BTreeMap;

/// Read-only view of a game from one seat. Agents never get mutable access to
/// the round; the engine applies whatever they return.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    seat: PlayerId,
    hand: &'a Hand,
    round: &'a RoundState,
}

impl<'a> TableView<'a> {
    pub fn for_player(round: &'a RoundState, seat: PlayerId) -> Option<Self> {
        round.hand(seat).map(|hand| Self { seat, hand, round })
    }

    pub fn seat(&self) -> PlayerId {
        self.seat
    }

    pub fn hand(&self) -> &'a Hand {
        self.hand
    }

    pub fn round(&self) -> &'a RoundState {
        self.round
    }

    pub fn trick(&self) -> &'a Trick {
        self.round.current_trick()
    }

    pub fn lead_card(&self) -> Option<Card> {
        self.trick().lead_card()
    }

    pub fn cards_on_board(&self) -> bool {
        self.round.cards_on_board()
    }

    pub fn legal_moves(&self) -> Vec<Card> {
        rules::legal_moves(self.trick(), self.hand)
    }

    pub fn num_players(&self) -> usize {
        self.round.num_players()
    }

    pub fn deck_size(&self) -> usize {
        self.round.deck_size()
    }

    pub fn cards_dealt(&self) -> usize {
        self.round.cards_dealt(self.seat).unwrap_or(0)
    }

    pub fn tricks_resolved(&self) -> usize {
        self.round.tricks_resolved()
    }

    pub fn tricks_won(&self) -> u32 {
        self.round.scores().tricks_won(self.seat)
    }

    pub fn tricks_won_by(&self, player: PlayerId) -> u32 {
        self.round.scores().tricks_won(player)
    }

    pub fn bet(&self) -> Option<u8> {
        self.round.scores().bet(self.seat)
    }

    pub fn bets(&self) -> &'a BTreeMap<PlayerId, u8> {
        self.round.scores().bets()
    }

    pub fn last_trick_winner(&self) -> Option<PlayerId> {
        self.round.last_trick_winner()
    }

    pub fn is_terminal(&self) -> bool {
        self.round.is_terminal()
    }
}

/// Sent to every seated agent after each trick resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrickFeedback {
    pub winner: PlayerId,
    pub reward: f64,
    pub game_over: bool,
}

/// Capabilities every seat must provide.
pub trait Agent {
    fn id(&self) -> PlayerId;

    fn make_bet(&mut self, view: &TableView<'_>) -> u8;

    /// Must return one of `view.legal_moves()`; anything else ends the game
    /// with an error. `None` is only expected once the hand is empty.
    fn decide(&mut self, view: &TableView<'_>) -> Option<Card>;

    fn observe_trick(&mut self, _view: &TableView<'_>, _feedback: &TrickFeedback) {}

    fn observe_game_end(&mut self, _result: &GameResult) {}
}

impl<T: Agent + ?Sized> Agent for Box<T> {
    fn id(&self) -> PlayerId {
        (**self).id()
    }

    fn make_bet(&mut self, view: &TableView<'_>) -> u8 {
        (**self).make_bet(view)
    }

    fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
        (**self).decide(view)
    }

    fn observe_trick(&mut self, view: &TableView<'_>, feedback: &TrickFeedback) {
        (**self).observe_trick(view, feedback)
    }

    fn observe_game_end(&mut self, result: &GameResult) {
        (**self).observe_game_end(result)
    }
}
