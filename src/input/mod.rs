pub mod history;

pub use history::{HistoryError, HistorySink};
