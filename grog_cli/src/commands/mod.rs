mod common_args;

mod run;
pub use run::*;

mod info;
pub use info::*;
