/// Station code for the pseudostation at grid position `(ix1, ix2)`.
pub fn virtual_station_name(ix1: i64, ix2: i64) -> String {
    format!("{:03}{:03}", ix1, ix2)
}

/// Output file identifier for one event and pseudostation.
pub fn make_dfile_name(evid: i64, ix1: i64, ix2: i64) -> String {
    format!("pwstack_{}_{}_{}", evid, ix1, ix2)
}
