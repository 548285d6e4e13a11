pub mod clahe;
pub mod preprocessor;
