//! Play-by-play input decoding.
//!
//! Turns provider JSON into an ordered [`RawEvent`](crate::models::RawEvent)
//! stream plus the data-quality findings raised while decoding it.

pub mod clock;
pub mod json_parser;

pub use clock::{parse_clock_str, parse_clock_value};
pub use json_parser::{decode_records, parse_game_json, parse_game_json_str, DecodedGame, EventRecord};
