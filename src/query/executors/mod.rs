pub mod catalog;
#[cfg(feature = "experimental")]
pub mod experimental;

pub use catalog::{CatalogQuery, CatalogRequest, GeneralQuery, SpecificQuery};
#[cfg(feature = "experimental")]
pub use experimental::ExperimentalQuery;
