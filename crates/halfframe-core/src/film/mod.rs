//! Film stocks and the catalog that maps ids to them.

pub mod registry;
pub mod stock;

pub use registry::FilmRegistry;
pub use stock::FilmStock;
