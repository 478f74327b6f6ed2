pub mod builder;
pub mod docs;
pub mod emitter;
pub mod enums;
pub mod overrides;
pub mod pipeline;
pub mod resolver;
pub mod types;
