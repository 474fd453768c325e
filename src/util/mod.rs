pub mod audio;
mod time;
mod writer;

pub use time::{format_local, local_rfc3339, now_local};
pub use writer::{ArtifactKind, ArtifactWriter};
