pub mod settings;
pub mod token;

// Re-export commonly used types
pub use settings::{
    AvgCapFilter, DevFilter, FilterSettings, LastFilter, MigrationFilter, MinCapFilter,
};
pub use token::TokenModel;
