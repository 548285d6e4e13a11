pub mod clock;
pub mod constants;
pub mod face;
pub mod frame;
pub mod model_resolver;
