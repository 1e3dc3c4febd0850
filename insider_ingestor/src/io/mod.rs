pub mod dataframe;
pub mod sink;

pub use dataframe::IpcSink;
pub use sink::{CsvSink, DataSink, SinkError};
