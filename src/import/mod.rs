//! Moving history in and out: the hosted store's CSV export on the way in,
//! monthly CSV files on the way out.
mod export;
mod legacy;

pub(crate) use export::export_to_path;
pub(crate) use legacy::{load_legacy, parse_decimal, parse_timestamp};
