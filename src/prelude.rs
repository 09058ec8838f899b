#![allow(unused_imports)]

pub use anyhow::{Context, bail, ensure};
pub use tracing::{debug, info, instrument, warn};

pub type Result<T = (), E = anyhow::Error> = anyhow::Result<T, E>;
