use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::hand::Hand;
use crate::model::player::{PlayerId, Seating};
use crate::model::rules;
use crate::model::score::{ScoreSheet, ScoringMode};
use crate::model::trick::{Trick, TrickError};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Shared state of one game: seating, hands, bets, the trick on the board and
/// everything already resolved.
#[derive(Debug, Clone)]
pub struct RoundState {
    seating: Seating,
    hands: Vec<Hand>,
    dealt: Vec<usize>,
    deck_size: usize,
    current_trick: Trick,
    trick_history: Vec<Trick>,
    sheet: ScoreSheet,
    last_winner: Option<PlayerId>,
    phase: RoundPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Dealt,
    Betting,
    TrickInProgress,
    TrickResolved,
    Scored,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoundPhase::Dealt => "dealt",
            RoundPhase::Betting => "betting",
            RoundPhase::TrickInProgress => "trick in progress",
            RoundPhase::TrickResolved => "trick resolved",
            RoundPhase::Scored => "scored",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played,
    TrickCompleted { winner: PlayerId, winning_card: Card },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    NoPlayers,
    DuplicatePlayer(PlayerId),
    DeckTooSmall { players: usize, cards: usize },
    HandCountMismatch { players: usize, hands: usize },
    WrongPhase { action: &'static str, phase: RoundPhase },
    UnknownPlayer(PlayerId),
    BetAlreadyPlaced(PlayerId),
    BetOutOfRange { player: PlayerId, bet: u8, max: u8 },
    CardNotInHand { player: PlayerId, card: Card },
    IllegalCard { player: PlayerId, card: Card },
    NoTrickInProgress,
    HandsNotEmpty,
    Trick(TrickError),
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundError::NoPlayers => write!(f, "a game needs at least one player"),
            RoundError::DuplicatePlayer(id) => {
                write!(f, "all players must have a unique index ({id} appears twice)")
            }
            RoundError::DeckTooSmall { players, cards } => {
                write!(f, "{cards} cards cannot be dealt to {players} players")
            }
            RoundError::HandCountMismatch { players, hands } => {
                write!(f, "{hands} hands supplied for {players} players")
            }
            RoundError::WrongPhase { action, phase } => {
                write!(f, "cannot {action} while the round is {phase}")
            }
            RoundError::UnknownPlayer(id) => write!(f, "{id} is not seated in this game"),
            RoundError::BetAlreadyPlaced(id) => write!(f, "{id} has already placed a bet"),
            RoundError::BetOutOfRange { player, bet, max } => {
                write!(f, "{player} bet {bet} but at most {max} tricks are available")
            }
            RoundError::CardNotInHand { player, card } => {
                write!(f, "{player} does not hold {card}")
            }
            RoundError::IllegalCard { player, card } => {
                write!(f, "{card} is not a legal play for {player}")
            }
            RoundError::NoTrickInProgress => write!(f, "no cards on board"),
            RoundError::HandsNotEmpty => write!(f, "cannot score while cards remain in hand"),
            RoundError::Trick(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RoundError {}

impl From<TrickError> for RoundError {
    fn from(err: TrickError) -> Self {
        RoundError::Trick(err)
    }
}

impl RoundState {
    /// Deals `deck` round-robin in seating order until it is exhausted.
    pub fn deal(players: &[PlayerId], deck: &Deck) -> Result<Self, RoundError> {
        validate_players(players)?;
        if deck.len() < players.len() {
            return Err(RoundError::DeckTooSmall {
                players: players.len(),
                cards: deck.len(),
            });
        }

        let mut hands = vec![Hand::new(); players.len()];
        for (index, card) in deck.cards().iter().enumerate() {
            hands[index % players.len()].add(*card);
        }

        for (player, hand) in players.iter().zip(&hands) {
            trace!(
                target: "spades_core::round",
                player = %player,
                cards = hand.len(),
                "hand dealt"
            );
        }

        Ok(Self::from_parts(players, hands, deck.len()))
    }

    /// Seats players with prearranged hands, aligned with `players`.
    pub fn from_hands(players: &[PlayerId], hands: Vec<Hand>) -> Result<Self, RoundError> {
        validate_players(players)?;
        if hands.len() != players.len() {
            return Err(RoundError::HandCountMismatch {
                players: players.len(),
                hands: hands.len(),
            });
        }
        let deck_size = hands.iter().map(Hand::len).sum();
        Ok(Self::from_parts(players, hands, deck_size))
    }

    fn from_parts(players: &[PlayerId], hands: Vec<Hand>, deck_size: usize) -> Self {
        let dealt = hands.iter().map(Hand::len).collect();
        Self {
            seating: Seating::new_unchecked(players.to_vec()),
            hands,
            dealt,
            deck_size,
            current_trick: Trick::new(Vec::new()),
            trick_history: Vec::new(),
            sheet: ScoreSheet::new(players),
            last_winner: None,
            phase: RoundPhase::Dealt,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn seating(&self) -> &Seating {
        &self.seating
    }

    pub fn players(&self) -> &[PlayerId] {
        self.seating.players()
    }

    pub fn num_players(&self) -> usize {
        self.seating.len()
    }

    /// Number of cards dealt at the start of the game.
    pub fn deck_size(&self) -> usize {
        self.deck_size
    }

    pub fn hand(&self, player: PlayerId) -> Option<&Hand> {
        self.seating
            .position_of(player)
            .map(|seat| &self.hands[seat])
    }

    pub fn cards_dealt(&self, player: PlayerId) -> Option<usize> {
        self.seating.position_of(player).map(|seat| self.dealt[seat])
    }

    /// Tricks in a full game: one per card in the largest hand dealt.
    pub fn total_tricks(&self) -> usize {
        self.dealt.iter().copied().max().unwrap_or(0)
    }

    pub fn current_trick(&self) -> &Trick {
        &self.current_trick
    }

    pub fn trick_history(&self) -> &[Trick] {
        &self.trick_history
    }

    pub fn tricks_resolved(&self) -> usize {
        self.trick_history.len()
    }

    pub fn scores(&self) -> &ScoreSheet {
        &self.sheet
    }

    pub fn last_trick_winner(&self) -> Option<PlayerId> {
        self.last_winner
    }

    pub fn cards_on_board(&self) -> bool {
        !self.current_trick.is_empty()
    }

    pub fn lead_card(&self) -> Result<Card, RoundError> {
        self.current_trick
            .lead_card()
            .ok_or(RoundError::NoTrickInProgress)
    }

    /// The last trick's winner leads, then seating order wraps around. Players
    /// with empty hands have no action and are skipped.
    pub fn playing_order(&self) -> Vec<PlayerId> {
        let rotation = match self.last_winner {
            Some(leader) => self.seating.rotation_from(leader),
            None => self.seating.players().to_vec(),
        };
        rotation
            .into_iter()
            .filter(|id| self.hand(*id).is_some_and(|hand| !hand.is_empty()))
            .collect()
    }

    pub fn legal_moves(&self, player: PlayerId) -> Result<Vec<Card>, RoundError> {
        let hand = self.hand(player).ok_or(RoundError::UnknownPlayer(player))?;
        Ok(rules::legal_moves(&self.current_trick, hand))
    }

    pub fn all_bets_placed(&self) -> bool {
        self.sheet.bets().len() == self.num_players()
    }

    pub fn place_bet(&mut self, player: PlayerId, bet: u8) -> Result<(), RoundError> {
        if !matches!(self.phase, RoundPhase::Dealt | RoundPhase::Betting) {
            return Err(RoundError::WrongPhase {
                action: "place a bet",
                phase: self.phase,
            });
        }
        let dealt = self
            .cards_dealt(player)
            .ok_or(RoundError::UnknownPlayer(player))?;
        if self.sheet.bet(player).is_some() {
            return Err(RoundError::BetAlreadyPlaced(player));
        }
        let max = u8::try_from(dealt).unwrap_or(u8::MAX);
        if bet > max {
            return Err(RoundError::BetOutOfRange { player, bet, max });
        }

        self.sheet.record_bet(player, bet);
        self.phase = RoundPhase::Betting;
        debug!(target: "spades_core::round", player = %player, bet, "bet placed");

        if self.all_bets_placed() {
            self.current_trick = Trick::new(self.playing_order());
            self.phase = RoundPhase::TrickInProgress;
        }
        Ok(())
    }

    pub fn play_card(&mut self, player: PlayerId, card: Card) -> Result<PlayOutcome, RoundError> {
        if !matches!(
            self.phase,
            RoundPhase::TrickInProgress | RoundPhase::TrickResolved
        ) || self.is_terminal()
        {
            return Err(RoundError::WrongPhase {
                action: "play a card",
                phase: self.phase,
            });
        }

        let seat = self
            .seating
            .position_of(player)
            .ok_or(RoundError::UnknownPlayer(player))?;

        if let Some(expected) = self.current_trick.expected_player() {
            if expected != player {
                return Err(TrickError::OutOfTurn {
                    expected,
                    actual: player,
                }
                .into());
            }
        }

        let hand = &self.hands[seat];
        if !hand.contains(card) {
            return Err(RoundError::CardNotInHand { player, card });
        }
        if !rules::is_legal(&self.current_trick, hand, card) {
            return Err(RoundError::IllegalCard { player, card });
        }

        self.current_trick.play(player, card)?;
        self.hands[seat].remove(card);
        self.phase = RoundPhase::TrickInProgress;
        trace!(
            target: "spades_core::round",
            player = %player,
            card = %card,
            position = self.current_trick.len() - 1,
            "card played"
        );

        match self.current_trick.winning_play() {
            Some(winning) => {
                self.resolve_trick(winning.player);
                Ok(PlayOutcome::TrickCompleted {
                    winner: winning.player,
                    winning_card: winning.card,
                })
            }
            None => Ok(PlayOutcome::Played),
        }
    }

    fn resolve_trick(&mut self, winner: PlayerId) {
        self.sheet.add_trick(winner);
        self.last_winner = Some(winner);
        let next = if self.is_terminal() {
            Trick::new(Vec::new())
        } else {
            Trick::new(self.playing_order())
        };
        let finished = std::mem::replace(&mut self.current_trick, next);
        debug!(
            target: "spades_core::round",
            winner = %winner,
            trick = self.trick_history.len() + 1,
            "trick won"
        );
        self.trick_history.push(finished);
        self.phase = RoundPhase::TrickResolved;
    }

    /// True once every hand is empty.
    pub fn is_terminal(&self) -> bool {
        self.hands.iter().all(Hand::is_empty)
    }

    /// Settles bets against tricks won. The round is read-only afterwards.
    pub fn score_game(&mut self, mode: ScoringMode) -> Result<&BTreeMap<PlayerId, i32>, RoundError> {
        if !self.is_terminal() {
            return Err(RoundError::HandsNotEmpty);
        }
        if !matches!(self.phase, RoundPhase::TrickResolved) {
            return Err(RoundError::WrongPhase {
                action: "score the game",
                phase: self.phase,
            });
        }
        self.sheet.settle(mode);
        self.phase = RoundPhase::Scored;
        Ok(self.sheet.final_scores())
    }
}

fn validate_players(players: &[PlayerId]) -> Result<(), RoundError> {
    if players.is_empty() {
        return Err(RoundError::NoPlayers);
    }
    match Seating::first_duplicate(players) {
        Some(id) => Err(RoundError::DuplicatePlayer(id)),
        None => Ok(()),
    }
}
