pub mod encoder;
pub mod live;
mod outbound;
pub mod playback;
pub mod router;
mod shared;
pub mod tools;
pub mod video_sampler;

#[cfg(test)]
pub(crate) mod test_support;
