//! Test helper modules for mono-source integration tests

pub mod audio_generator;

pub use audio_generator::{generate_float_wav, generate_sine_wav, pattern_value};
