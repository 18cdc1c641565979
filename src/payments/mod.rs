mod wompi;

pub use wompi::*;
