pub mod dataset;
pub mod endpoint;
pub mod insider;
pub mod merged;
pub mod price_bar;
pub mod scalar;
