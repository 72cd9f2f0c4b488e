//! Card Board: the drag-and-drop state machine behind the sequencing sheet.
//!
//! # Model
//! - `cards` is an arena of event cards keyed by their stable id.
//! - `slots` and `pool` hold ids only; `locations` is the reverse index.
//! - Every card in the arena lives in exactly one place: one slot, or the pool.
//!
//! # Transactions
//! A drag starts with `begin_drag` and ends with `drop_on_slot`, `drop_on_pool`
//! or `cancel_drag`. A drop always clears the transaction, even when it turns
//! out to be a no-op.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::toolkit::{CardId, EventCard};

/// Number of ordered target slots on the sequencing sheet.
pub const SLOT_COUNT: usize = 4;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Where a drag started. The pool index is the card's display position and is
/// advisory only; the card is removed from the pool by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    Pool { index: usize },
    Slot { index: usize },
}

/// Current resting place of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Pool,
    Slot { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    Dragging { card: CardId, origin: Origin },
}

/// What a drop did to the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DropOutcome {
    /// The card now sits in `slot`; a previous occupant, if any, was appended to the pool.
    Placed {
        card: CardId,
        slot: usize,
        displaced: Option<CardId>,
    },
    /// The card left its slot and was appended to the pool.
    ReturnedToPool { card: CardId },
    /// A transaction was active but the drop changed nothing.
    Unchanged { card: CardId },
    /// There was no active transaction.
    NoDrag,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("the board has no cards")]
    NoCards,

    #[error("unknown card '{0}'")]
    UnknownCard(CardId),

    #[error("card '{card}' is not at {claimed:?}")]
    OriginMismatch { card: CardId, claimed: Origin },

    #[error("another card is already being dragged")]
    DragInProgress,

    #[error("board invariant violated: {0}")]
    Invariant(String),
}

/// Per-slot verdict of a sequence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotVerdict {
    Empty,
    Correct,
    Misplaced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceCheck {
    pub slots: Vec<SlotVerdict>,
    pub placed: usize,
    pub correct: usize,
    pub is_complete_and_correct: bool,
}

/// Serializable snapshot of the board for clients.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub slots: Vec<Option<EventCard>>,
    pub pool: Vec<EventCard>,
    pub drag: DragState,
}

// ────────────────────────────────────────────────────────────────────────────
// Board
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Board {
    cards: HashMap<CardId, EventCard>,
    /// Source order of the card set, used when reshuffling.
    canonical: Vec<CardId>,
    slots: [Option<CardId>; SLOT_COUNT],
    pool: Vec<CardId>,
    locations: HashMap<CardId, Location>,
    drag: DragState,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the card set: all cards go to the pool in random order, slots empty.
    pub fn initialize(&mut self, cards: &[EventCard]) {
        self.initialize_with(cards, &mut rand::thread_rng());
    }

    pub fn initialize_with<R: Rng + ?Sized>(&mut self, cards: &[EventCard], rng: &mut R) {
        self.cards = cards.iter().map(|c| (c.id.clone(), c.clone())).collect();
        self.canonical = cards.iter().map(|c| c.id.clone()).collect();
        debug!("Board initialized with {} cards", self.canonical.len());
        self.reset_with(rng);
    }

    /// Reshuffles the full card set into the pool and clears every slot.
    pub fn reset(&mut self) {
        self.reset_with(&mut rand::thread_rng());
    }

    pub fn reset_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.slots = Default::default();
        self.pool = self.canonical.clone();
        self.pool.shuffle(rng);
        self.locations = self
            .pool
            .iter()
            .map(|id| (id.clone(), Location::Pool))
            .collect();
        self.drag = DragState::Idle;
        debug_assert!(self.check_invariant().is_ok());
    }

    /// Starts a drag transaction. Nothing moves until the drop.
    pub fn begin_drag(&mut self, card: CardId, origin: Origin) -> Result<(), BoardError> {
        if self.cards.is_empty() {
            return Err(BoardError::NoCards);
        }
        if matches!(self.drag, DragState::Dragging { .. }) {
            return Err(BoardError::DragInProgress);
        }
        let location = *self
            .locations
            .get(&card)
            .ok_or_else(|| BoardError::UnknownCard(card.clone()))?;

        let matches_origin = match (origin, location) {
            (Origin::Pool { .. }, Location::Pool) => true,
            (Origin::Slot { index }, Location::Slot { index: at }) => index == at,
            _ => false,
        };
        if !matches_origin {
            return Err(BoardError::OriginMismatch {
                card,
                claimed: origin,
            });
        }

        debug!("Drag started: {card} from {origin:?}");
        self.drag = DragState::Dragging { card, origin };
        Ok(())
    }

    /// Ends the active drag without moving anything. Returns whether one was active.
    pub fn cancel_drag(&mut self) -> bool {
        matches!(
            std::mem::take(&mut self.drag),
            DragState::Dragging { .. }
        )
    }

    /// Drops the dragged card onto slot `target`.
    ///
    /// The card leaves its origin, any other occupant of `target` is appended to
    /// the pool, and the card takes the slot. Out-of-range targets and drops onto
    /// the card's own slot leave the board untouched.
    pub fn drop_on_slot(&mut self, target: usize) -> DropOutcome {
        let DragState::Dragging { card, origin } = std::mem::take(&mut self.drag) else {
            return DropOutcome::NoDrag;
        };

        if target >= SLOT_COUNT {
            warn!("Drop on slot {target} ignored (only {SLOT_COUNT} slots)");
            return DropOutcome::Unchanged { card };
        }
        if origin == (Origin::Slot { index: target }) {
            return DropOutcome::Unchanged { card };
        }

        match origin {
            Origin::Pool { .. } => self.pool.retain(|id| id != &card),
            Origin::Slot { index } => self.slots[index] = None,
        }

        let displaced = self.slots[target].take();
        if let Some(occupant) = &displaced {
            self.pool.push(occupant.clone());
            self.locations.insert(occupant.clone(), Location::Pool);
        }

        self.slots[target] = Some(card.clone());
        self.locations
            .insert(card.clone(), Location::Slot { index: target });

        debug_assert!(self.check_invariant().is_ok());
        DropOutcome::Placed {
            card,
            slot: target,
            displaced,
        }
    }

    /// Drops the dragged card onto the pool. A card that came from the pool stays
    /// where it was; a card from a slot is appended to the end of the pool.
    pub fn drop_on_pool(&mut self) -> DropOutcome {
        let DragState::Dragging { card, origin } = std::mem::take(&mut self.drag) else {
            return DropOutcome::NoDrag;
        };

        match origin {
            Origin::Pool { .. } => DropOutcome::Unchanged { card },
            Origin::Slot { index } => {
                self.slots[index] = None;
                self.pool.push(card.clone());
                self.locations.insert(card.clone(), Location::Pool);
                debug_assert!(self.check_invariant().is_ok());
                DropOutcome::ReturnedToPool { card }
            }
        }
    }

    /// Sets a card's illustration in the arena, if it has none yet.
    pub fn attach_illustration(&mut self, id: &CardId, url: String) -> bool {
        self.cards
            .get_mut(id)
            .map(|card| card.attach_illustration(url))
            .unwrap_or(false)
    }

    /// True if `cards` carries exactly the ids already on the board.
    pub fn holds_same_cards(&self, cards: &[EventCard]) -> bool {
        cards.len() == self.canonical.len() && cards.iter().all(|c| self.cards.contains_key(&c.id))
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn card(&self, id: &CardId) -> Option<&EventCard> {
        self.cards.get(id)
    }

    pub fn location_of(&self, id: &CardId) -> Option<Location> {
        self.locations.get(id).copied()
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn slot_ids(&self) -> &[Option<CardId>; SLOT_COUNT] {
        &self.slots
    }

    pub fn pool_ids(&self) -> &[CardId] {
        &self.pool
    }

    pub fn slot_card(&self, index: usize) -> Option<&EventCard> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .and_then(|id| self.cards.get(id))
    }

    /// Pool cards in display order.
    pub fn pool_cards(&self) -> impl Iterator<Item = &EventCard> + '_ {
        self.pool.iter().filter_map(|id| self.cards.get(id))
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            slots: (0..SLOT_COUNT).map(|i| self.slot_card(i).cloned()).collect(),
            pool: self.pool_cards().cloned().collect(),
            drag: self.drag.clone(),
        }
    }

    /// Compares slot contents against each card's chronological order.
    pub fn evaluate(&self) -> SequenceCheck {
        let slots: Vec<SlotVerdict> = (0..SLOT_COUNT)
            .map(|i| match self.slot_card(i) {
                None => SlotVerdict::Empty,
                Some(card) if usize::from(card.order) == i + 1 => SlotVerdict::Correct,
                Some(_) => SlotVerdict::Misplaced,
            })
            .collect();

        let placed = slots.iter().filter(|v| **v != SlotVerdict::Empty).count();
        let correct = slots.iter().filter(|v| **v == SlotVerdict::Correct).count();

        SequenceCheck {
            is_complete_and_correct: !self.is_empty()
                && correct == SLOT_COUNT.min(self.len())
                && placed == correct,
            slots,
            placed,
            correct,
        }
    }

    /// Verifies that every card sits in exactly one place and that the reverse
    /// index agrees with the slots and pool.
    pub fn check_invariant(&self) -> Result<(), BoardError> {
        let mut seen: HashMap<&CardId, Location> = HashMap::new();

        let placements = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|id| (id, Location::Slot { index: i })))
            .chain(self.pool.iter().map(|id| (id, Location::Pool)));

        for (id, location) in placements {
            if !self.cards.contains_key(id) {
                return Err(BoardError::Invariant(format!("'{id}' is not in the card set")));
            }
            if let Some(previous) = seen.insert(id, location) {
                return Err(BoardError::Invariant(format!(
                    "'{id}' appears at both {previous:?} and {location:?}"
                )));
            }
            if self.locations.get(id) != Some(&location) {
                return Err(BoardError::Invariant(format!(
                    "reverse index for '{id}' is {:?}, found at {location:?}",
                    self.locations.get(id)
                )));
            }
        }

        let canonical: HashSet<&CardId> = self.canonical.iter().collect();
        if canonical.len() != self.cards.len() || seen.len() != self.cards.len() {
            return Err(BoardError::Invariant(format!(
                "{} cards placed, {} in the card set",
                seen.len(),
                self.cards.len()
            )));
        }
        if self.locations.len() != self.cards.len() {
            return Err(BoardError::Invariant(
                "reverse index holds stale entries".to_string(),
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cards() -> Vec<EventCard> {
        (1..=4u8)
            .map(|order| EventCard {
                id: CardId::from(format!("E{order}").as_str()),
                order,
                text: format!("Event {order}"),
                image_prompt: format!("Picture of event {order}"),
                image_url: None,
            })
            .collect()
    }

    fn id(s: &str) -> CardId {
        CardId::from(s)
    }

    fn board() -> Board {
        let mut board = Board::new();
        board.initialize_with(&cards(), &mut StdRng::seed_from_u64(7));
        board
    }

    fn pool_index(board: &Board, card: &CardId) -> usize {
        board.pool_ids().iter().position(|c| c == card).unwrap()
    }

    fn move_from_pool(board: &mut Board, card: &str, slot: usize) -> DropOutcome {
        let card = id(card);
        let index = pool_index(board, &card);
        board.begin_drag(card, Origin::Pool { index }).unwrap();
        board.drop_on_slot(slot)
    }

    fn pool_set(board: &Board) -> HashSet<CardId> {
        board.pool_ids().iter().cloned().collect()
    }

    #[test]
    fn test_initialize_puts_every_card_in_pool() {
        let board = board();
        assert_eq!(board.pool_ids().len(), 4);
        assert!(board.slot_ids().iter().all(Option::is_none));
        assert_eq!(board.drag(), &DragState::Idle);
        board.check_invariant().unwrap();
    }

    #[test]
    fn test_scenario_pool_to_slot_and_back() {
        let mut board = board();

        let outcome = move_from_pool(&mut board, "E3", 2);
        assert_eq!(
            outcome,
            DropOutcome::Placed {
                card: id("E3"),
                slot: 2,
                displaced: None
            }
        );
        assert_eq!(board.slot_ids()[2], Some(id("E3")));
        assert_eq!(
            pool_set(&board),
            [id("E1"), id("E2"), id("E4")]
                .into_iter()
                .collect::<HashSet<_>>()
        );

        board.begin_drag(id("E3"), Origin::Slot { index: 2 }).unwrap();
        assert_eq!(
            board.drop_on_pool(),
            DropOutcome::ReturnedToPool { card: id("E3") }
        );
        assert_eq!(board.slot_ids()[2], None);
        assert_eq!(board.pool_ids().last(), Some(&id("E3")));
        assert_eq!(board.pool_ids().len(), 4);
        board.check_invariant().unwrap();
    }

    #[test]
    fn test_drop_on_occupied_slot_appends_occupant_to_pool() {
        let mut board = board();
        move_from_pool(&mut board, "E1", 0);

        let outcome = move_from_pool(&mut board, "E2", 0);
        assert_eq!(
            outcome,
            DropOutcome::Placed {
                card: id("E2"),
                slot: 0,
                displaced: Some(id("E1"))
            }
        );
        assert_eq!(board.slot_ids()[0], Some(id("E2")));
        assert_eq!(board.pool_ids().last(), Some(&id("E1")));
        assert!(!board.pool_ids().contains(&id("E2")));
        assert_eq!(board.location_of(&id("E1")), Some(Location::Pool));
        board.check_invariant().unwrap();
    }

    #[test]
    fn test_slot_to_occupied_slot_sends_occupant_to_pool() {
        let mut board = board();
        move_from_pool(&mut board, "E1", 0);
        move_from_pool(&mut board, "E2", 1);

        board.begin_drag(id("E1"), Origin::Slot { index: 0 }).unwrap();
        board.drop_on_slot(1);

        assert_eq!(board.slot_ids()[0], None);
        assert_eq!(board.slot_ids()[1], Some(id("E1")));
        assert_eq!(board.location_of(&id("E2")), Some(Location::Pool));
        board.check_invariant().unwrap();
    }

    #[test]
    fn test_drop_on_own_slot_is_noop_but_clears_transaction() {
        let mut board = board();
        move_from_pool(&mut board, "E4", 3);
        let slots_before = board.slot_ids().clone();
        let pool_before = board.pool_ids().to_vec();

        board.begin_drag(id("E4"), Origin::Slot { index: 3 }).unwrap();
        assert_eq!(
            board.drop_on_slot(3),
            DropOutcome::Unchanged { card: id("E4") }
        );

        assert_eq!(board.slot_ids(), &slots_before);
        assert_eq!(board.pool_ids(), pool_before.as_slice());
        assert_eq!(board.drag(), &DragState::Idle);
    }

    #[test]
    fn test_pool_card_dropped_on_pool_keeps_order() {
        let mut board = board();
        let pool_before = board.pool_ids().to_vec();
        let card = pool_before[1].clone();

        board.begin_drag(card.clone(), Origin::Pool { index: 1 }).unwrap();
        assert_eq!(board.drop_on_pool(), DropOutcome::Unchanged { card });

        assert_eq!(board.pool_ids(), pool_before.as_slice());
        assert!(board.slot_ids().iter().all(Option::is_none));
        assert_eq!(board.drag(), &DragState::Idle);
    }

    #[test]
    fn test_drop_without_drag_is_noop() {
        let mut board = board();
        let pool_before = board.pool_ids().to_vec();
        assert_eq!(board.drop_on_slot(0), DropOutcome::NoDrag);
        assert_eq!(board.drop_on_pool(), DropOutcome::NoDrag);
        assert_eq!(board.pool_ids(), pool_before.as_slice());
    }

    #[test]
    fn test_drop_out_of_range_is_noop_and_clears_transaction() {
        let mut board = board();
        let pool_before = board.pool_ids().to_vec();
        let card = pool_before[0].clone();

        board.begin_drag(card.clone(), Origin::Pool { index: 0 }).unwrap();
        assert_eq!(board.drop_on_slot(SLOT_COUNT), DropOutcome::Unchanged { card });
        assert_eq!(board.pool_ids(), pool_before.as_slice());
        assert_eq!(board.drag(), &DragState::Idle);
    }

    #[test]
    fn test_begin_drag_rejections() {
        let mut empty = Board::new();
        assert_eq!(
            empty.begin_drag(id("E1"), Origin::Pool { index: 0 }),
            Err(BoardError::NoCards)
        );

        let mut board = board();
        assert_eq!(
            board.begin_drag(id("nope"), Origin::Pool { index: 0 }),
            Err(BoardError::UnknownCard(id("nope")))
        );
        assert!(matches!(
            board.begin_drag(id("E1"), Origin::Slot { index: 0 }),
            Err(BoardError::OriginMismatch { .. })
        ));

        board.begin_drag(id("E1"), Origin::Pool { index: 0 }).unwrap();
        assert_eq!(
            board.begin_drag(id("E2"), Origin::Pool { index: 0 }),
            Err(BoardError::DragInProgress)
        );
        assert!(board.cancel_drag());
        assert!(!board.cancel_drag());
    }

    #[test]
    fn test_reset_twice_keeps_board_valid() {
        let mut board = board();
        move_from_pool(&mut board, "E1", 0);
        move_from_pool(&mut board, "E2", 1);

        board.reset();
        board.reset();

        assert!(board.slot_ids().iter().all(Option::is_none));
        assert_eq!(pool_set(&board).len(), 4);
        board.check_invariant().unwrap();
    }

    #[test]
    fn test_reset_clears_active_drag() {
        let mut board = board();
        board.begin_drag(id("E2"), Origin::Pool { index: 0 }).unwrap();
        board.reset();
        assert_eq!(board.drag(), &DragState::Idle);
    }

    #[test]
    fn test_shuffle_usually_differs_from_story_order() {
        let canonical: Vec<CardId> = cards().into_iter().map(|c| c.id).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let mut board = Board::new();
        let differing = (0..100)
            .filter(|_| {
                board.initialize_with(&cards(), &mut rng);
                board.pool_ids() != canonical.as_slice()
            })
            .count();
        assert!(differing > 80, "only {differing}/100 shuffles differed");
    }

    #[test]
    fn test_random_operations_preserve_invariant() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut board = board();

        for _ in 0..2_000 {
            match rng.gen_range(0..10) {
                0 => board.reset_with(&mut rng),
                1 => {
                    board.cancel_drag();
                }
                2..=5 => {
                    let all: Vec<CardId> = board.canonical.clone();
                    let card = all[rng.gen_range(0..all.len())].clone();
                    let origin = match board.location_of(&card).unwrap() {
                        Location::Pool => Origin::Pool {
                            index: pool_index(&board, &card),
                        },
                        Location::Slot { index } => Origin::Slot { index },
                    };
                    let _ = board.begin_drag(card, origin);
                }
                6..=8 => {
                    board.drop_on_slot(rng.gen_range(0..SLOT_COUNT + 1));
                }
                _ => {
                    board.drop_on_pool();
                }
            }
            board.check_invariant().unwrap();
        }
    }

    #[test]
    fn test_evaluate_reports_correct_and_misplaced() {
        let mut board = board();
        move_from_pool(&mut board, "E1", 0);
        move_from_pool(&mut board, "E3", 1);

        let check = board.evaluate();
        assert_eq!(
            check.slots,
            vec![
                SlotVerdict::Correct,
                SlotVerdict::Misplaced,
                SlotVerdict::Empty,
                SlotVerdict::Empty
            ]
        );
        assert_eq!(check.placed, 2);
        assert_eq!(check.correct, 1);
        assert!(!check.is_complete_and_correct);

        let mut solved = self::board();
        for (card, slot) in [("E1", 0), ("E2", 1), ("E3", 2), ("E4", 3)] {
            move_from_pool(&mut solved, card, slot);
        }
        assert!(solved.evaluate().is_complete_and_correct);
        assert_eq!(solved.pool_ids().len(), 0);
    }

    #[test]
    fn test_attach_illustration_updates_arena_once() {
        let mut board = board();
        assert!(board.attach_illustration(&id("E2"), "data:image/png;base64,X".to_string()));
        assert!(!board.attach_illustration(&id("E2"), "data:image/png;base64,Y".to_string()));
        assert!(!board.attach_illustration(&id("missing"), "x".to_string()));
        assert_eq!(
            board.card(&id("E2")).unwrap().image_url.as_deref(),
            Some("data:image/png;base64,X")
        );
    }

    #[test]
    fn test_holds_same_cards() {
        let board = board();
        assert!(board.holds_same_cards(&cards()));
        let mut other = cards();
        other[0].id = id("E9");
        assert!(!board.holds_same_cards(&other));
    }
}
