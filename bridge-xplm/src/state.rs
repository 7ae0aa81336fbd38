//! Datarefs captured into the aircraft state snapshot.

/// Storage type to read a dataref with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Integer read as a boolean.
    Flag,
    Float,
    Double,
}

/// One snapshot field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateField {
    pub key: &'static str,
    pub dataref: &'static str,
    pub kind: DataKind,
}

const fn field(key: &'static str, dataref: &'static str, kind: DataKind) -> StateField {
    StateField { key, dataref, kind }
}

/// Snapshot layout, in output order.
pub const AIRCRAFT_STATE: &[StateField] = &[
    field("latitude", "sim/flightmodel/position/latitude", DataKind::Double),
    field("longitude", "sim/flightmodel/position/longitude", DataKind::Double),
    field("elevation_m", "sim/flightmodel/position/elevation", DataKind::Double),
    field("agl_m", "sim/flightmodel/position/y_agl", DataKind::Float),
    field("local_x", "sim/flightmodel/position/local_x", DataKind::Double),
    field("local_y", "sim/flightmodel/position/local_y", DataKind::Double),
    field("local_z", "sim/flightmodel/position/local_z", DataKind::Double),
    field("pitch_deg", "sim/flightmodel/position/theta", DataKind::Float),
    field("roll_deg", "sim/flightmodel/position/phi", DataKind::Float),
    field("heading_deg", "sim/flightmodel/position/psi", DataKind::Float),
    field("groundspeed_mps", "sim/flightmodel/position/groundspeed", DataKind::Float),
    field(
        "indicated_airspeed_kt",
        "sim/flightmodel/position/indicated_airspeed",
        DataKind::Float,
    ),
    field("vertical_speed_fpm", "sim/flightmodel/position/vh_ind_fpm", DataKind::Float),
    field("on_ground", "sim/flightmodel/failures/onground_any", DataKind::Flag),
    field("paused", "sim/time/paused", DataKind::Flag),
    field("sim_elapsed_sec", "sim/time/total_running_time_sec", DataKind::Float),
];
