mod remote_streams;
mod track_classifier;

pub use remote_streams::*;
pub use track_classifier::*;
