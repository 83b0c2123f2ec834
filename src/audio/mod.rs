//! Audio primitives: buffers, file I/O, and loudness analysis

pub mod analysis;
pub mod buffer;
pub mod io;

pub use analysis::{clip_rms, isolated_rms};
pub use buffer::AudioBuffer;
pub use io::{read_clip, write_clip};
