pub mod constraints;
pub mod provider;

pub use constraints::SymbolConstraintRegistry;
pub use provider::MarketSnapshotProvider;
