mod discord_layer;
mod tracing_layer;

pub use discord_layer::*;
pub use tracing_layer::*;
