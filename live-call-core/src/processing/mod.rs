pub mod chunker;
pub mod frame;
pub mod pcm;
