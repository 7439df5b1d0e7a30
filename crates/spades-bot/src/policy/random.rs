use rand::SeedableRng;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use spades_core::game::agent::{Agent, TableView};
use spades_core::model::card::Card;
use spades_core::model::player::PlayerId;
use statrs::distribution::Normal;

const BET_SIGMA: f64 = 2.0;

/// Baseline opponent: a normally distributed bet and a uniformly random legal
/// card.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    id: PlayerId,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(id: PlayerId, seed: u64) -> Self {
        Self {
            id,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn make_bet(&mut self, view: &TableView<'_>) -> u8 {
        sample_normal_bet(
            view.deck_size(),
            view.num_players(),
            view.cards_dealt(),
            &mut self.rng,
        )
    }

    fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
        view.legal_moves().choose(&mut self.rng).copied()
    }
}

/// Draws `round(N(mu, 2))` with `mu = round(round(deck / players) / 2)`, then
/// clamps to `[0, 2 * mu]` and to the cards actually held.
pub fn sample_normal_bet<R: rand::Rng + ?Sized>(
    deck_size: usize,
    num_players: usize,
    cards_held: usize,
    rng: &mut R,
) -> u8 {
    let tricks = (deck_size as f64 / num_players.max(1) as f64).round();
    let mu = (tricks / 2.0).round();
    let draw = match Normal::new(mu, BET_SIGMA) {
        Ok(normal) => normal.sample(rng).round(),
        Err(_) => mu,
    };
    let ceiling = (2.0 * mu).min(cards_held as f64);
    draw.clamp(0.0, ceiling.max(0.0)) as u8
}

#[cfg(test)]
mod tests {
    use super::{RandomAgent, sample_normal_bet};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use spades_core::game::agent::{Agent, TableView};
    use spades_core::model::deck::Deck;
    use spades_core::model::player::PlayerId;
    use spades_core::model::round::RoundState;

    #[test]
    fn bets_stay_within_twice_the_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut total = 0u32;
        for _ in 0..500 {
            let bet = sample_normal_bet(52, 4, 13, &mut rng);
            assert!(bet <= 14, "bet {bet} above 2 * mu");
            total += u32::from(bet);
        }
        let mean = f64::from(total) / 500.0;
        assert!((mean - 7.0).abs() < 0.5, "mean bet {mean}");
    }

    #[test]
    fn bets_never_exceed_cards_held() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            assert!(sample_normal_bet(52, 2, 3, &mut rng) <= 3);
        }
    }

    #[test]
    fn plays_only_legal_cards() {
        let players = [PlayerId(0), PlayerId(1)];
        let mut round = RoundState::deal(&players, &Deck::shuffled_with_seed(12)).unwrap();
        let mut agents = [RandomAgent::new(PlayerId(0), 1), RandomAgent::new(PlayerId(1), 2)];
        for (agent, id) in agents.iter_mut().zip(players) {
            let view = TableView::for_player(&round, id).unwrap();
            let bet = agent.make_bet(&view);
            round.place_bet(id, bet).unwrap();
        }
        while !round.is_terminal() {
            let id = round.current_trick().expected_player().unwrap();
            let view = TableView::for_player(&round, id).unwrap();
            let card = agents[id.index() as usize].decide(&view).unwrap();
            assert!(view.legal_moves().contains(&card));
            round.play_card(id, card).unwrap();
        }
        assert_eq!(round.scores().total_tricks_won(), 26);
    }
}
