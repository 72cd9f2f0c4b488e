// Sequencing activity: shuffled event cards dragged between a pool and four ordered slots.
// Mutated by the board handlers, and by `Session::apply_toolkit` when a toolkit is published.

pub mod handlers;
pub mod state;

pub use state::{Board, BoardError, BoardView, DropOutcome, Location, Origin, SLOT_COUNT};
