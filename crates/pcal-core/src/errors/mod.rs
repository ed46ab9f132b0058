mod pcal_error;

pub use pcal_error::{PcalError, PcalResult};
