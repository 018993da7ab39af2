pub mod constants;
#[cfg(feature = "fitacf")]
pub mod fitacf;
pub mod hdw;
pub mod rpos;
pub mod scan;
