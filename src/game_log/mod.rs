pub mod directory;
pub mod live;
pub mod models;
pub mod provider;
pub mod synthetic;

pub use directory::PlayerDirectory;
pub use live::LiveProvider;
pub use models::{GameLog, GameRecord, StatKind};
pub use provider::GameLogProvider;
pub use synthetic::SyntheticProvider;
