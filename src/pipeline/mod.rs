mod assembler;
pub mod causes;
mod model;
mod paging;

pub use assembler::{AssemblyOptions, LatestPipelines, PipelineAssembler};
pub use model::{Component, ManualStep, Pipeline, Stage, Status, Task};
pub use paging::{trim_components, PageRequest, Pagination};
