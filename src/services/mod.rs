pub mod encoder;
pub mod neighbors;
pub mod recommendations;

pub use encoder::{TextEncoder, TfidfEncoder};
pub use neighbors::{BruteForceIndex, NeighborIndex};
pub use recommendations::Recommender;
