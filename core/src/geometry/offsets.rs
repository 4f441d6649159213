use crate::seismic::{MetadataError, ThreeComponentSeismogram};

/// Mean earth radius in km.
pub const EARTH_RADIUS: f64 = 6371.0;

/// North and east offsets (km) of `(lat, lon)` from `(lat0, lon0)`, all in radians.
///
/// Offsets follow the great circle from the origin: the arc distance is split
/// into north and east parts by the azimuth at the origin.
pub fn geographic_to_dne(lat0: f64, lon0: f64, lat: f64, lon: f64) -> (f64, f64) {
    let dlat = lat - lat0;
    let dlon = lon - lon0;
    let a = (dlat / 2.0).sin().powi(2) + lat0.cos() * lat.cos() * (dlon / 2.0).sin().powi(2);
    let delta = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    if delta == 0.0 {
        return (0.0, 0.0);
    }
    let azimuth = (dlon.sin() * lat.cos())
        .atan2(lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * dlon.cos());
    let distance = EARTH_RADIUS * delta;
    (distance * azimuth.cos(), distance * azimuth.sin())
}

/// Planar layout of an ensemble about its pseudostation reference point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationGeometry {
    pub dnorth: Vec<f64>,
    pub deast: Vec<f64>,
    pub elev: Vec<f64>,
}

impl StationGeometry {
    /// Read offsets from each member.
    ///
    /// Precomputed `dnorth`/`deast` attributes win; otherwise `site.lat` and
    /// `site.lon` (degrees) are projected against `lat0`/`lon0` (degrees).
    pub fn from_members<'a, I>(members: I, lat0: f64, lon0: f64) -> Result<Self, MetadataError>
    where
        I: IntoIterator<Item = &'a ThreeComponentSeismogram>,
    {
        let mut geometry = Self::default();
        for member in members {
            let md = &member.metadata;
            let (dn, de) = if md.contains("dnorth") && md.contains("deast") {
                (md.get_double("dnorth")?, md.get_double("deast")?)
            } else {
                let lat = md.get_double("site.lat")?.to_radians();
                let lon = md.get_double("site.lon")?.to_radians();
                geographic_to_dne(lat0.to_radians(), lon0.to_radians(), lat, lon)
            };
            geometry.dnorth.push(dn);
            geometry.deast.push(de);
            geometry.elev.push(md.get_double("site.elev")?);
        }
        Ok(geometry)
    }

    pub fn len(&self) -> usize {
        self.dnorth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dnorth.is_empty()
    }
}
