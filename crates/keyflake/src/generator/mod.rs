mod lock;
mod mutex;
mod policy;
mod status;

pub use lock::*;
pub use policy::*;
pub use status::*;
