pub mod clean;
pub mod csr;
pub mod direct;
mod edit;
mod error;
pub mod locate;
pub mod update;

pub use clean::*;
pub use edit::{Merged, Pruned, Section};
pub use error::{Error, Result};
pub use locate::kube_dir;
