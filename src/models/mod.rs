pub mod donation;
pub mod payment;
pub mod registration;
pub mod subscription;

pub use donation::*;
pub use payment::*;
pub use registration::*;
pub use subscription::*;
