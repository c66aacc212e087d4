pub mod garage;
pub mod io;
