pub mod encode;

pub use encode::{
    DEFAULT_TICKS_PER_QUARTER, MAX_TICKS_PER_QUARTER, events_to_midi, tracks_to_midi,
};
