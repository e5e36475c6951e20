pub mod pipeline;

pub use pipeline::GeoPipeline;
