pub mod image;
pub mod request;
pub mod response;
pub mod stream;

pub use image::*;
pub use request::*;
pub use response::*;
pub use stream::*;
