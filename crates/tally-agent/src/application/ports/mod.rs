pub mod asset_repository;
pub mod fact_collector;
pub mod software_source;

pub use asset_repository::AssetRepositoryPort;
pub use fact_collector::FactCollectorPort;
pub use software_source::SoftwareSourcePort;
