pub mod client_ext;
pub mod fs;

pub use crate::client_ext::util::{ClientUtilExt as Util, RawResponse};
pub use crate::fs::write_atomic;
