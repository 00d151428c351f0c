pub mod audio_output;
pub mod capture_provider;
pub mod image_generator;
pub mod session_delegate;
pub mod speech;
pub mod transport;
pub mod video_source;
