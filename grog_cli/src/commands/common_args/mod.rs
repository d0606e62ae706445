mod grog;
pub use grog::*;
