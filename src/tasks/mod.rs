// SipSense - Host Tasks

pub mod console;
pub mod pet;
pub mod sensor;
