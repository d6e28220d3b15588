/// Image decoding into premultiplied RGBA8.
pub mod decode;
