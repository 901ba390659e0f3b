pub mod advertisement;
pub mod decoder;
pub mod decryptor;
pub mod fallback;
pub mod fixed_point;
pub mod frames;

pub use decoder::Decoder;
pub use decryptor::KeyMaterial;
