pub mod asset_repository;
pub mod client;

pub use asset_repository::GraphQlAssetRepository;
pub use client::GraphQlClient;
