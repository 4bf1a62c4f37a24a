pub mod coalescer;

pub use coalescer::{Admission, CoalesceState, RenderCoalescer, UpdateFlags};
