pub mod digitizer;

pub use digitizer::Digitizer;
