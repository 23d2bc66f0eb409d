pub mod link;

pub use link::LinkPhase;
