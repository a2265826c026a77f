//! Point geometry codec and great-circle distance.
//!
//! Locations are stored as extended WKB (EWKB) point geometries tagged with
//! SRID 4326, the form PostGIS returns from `ST_AsEWKB` and renders as hex
//! text for geometry columns.

use crate::error::GeoError;
use crate::models::Point;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Spatial reference of every stored location (WGS 84)
pub const SRID: u32 = 4326;

const WKB_POINT: u32 = 1;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const EWKB_Z_FLAG: u32 = 0x8000_0000;
const EWKB_M_FLAG: u32 = 0x4000_0000;

const BYTE_ORDER_XDR: u8 = 0;
const BYTE_ORDER_NDR: u8 = 1;

/// Encoded length of a 2D point with SRID
pub const EWKB_POINT_LEN: usize = 1 + 4 + 4 + 8 + 8;

/// Encode a point as little-endian EWKB with SRID 4326
pub fn encode(point: &Point) -> Result<Vec<u8>, GeoError> {
    if Point::new(point.lat(), point.lng()).is_none() {
        return Err(GeoError::Encoding(format!(
            "coordinates out of range: ({}, {})",
            point.lat(),
            point.lng()
        )));
    }

    let mut out = Vec::with_capacity(EWKB_POINT_LEN);
    out.push(BYTE_ORDER_NDR);
    out.extend_from_slice(&(WKB_POINT | EWKB_SRID_FLAG).to_le_bytes());
    out.extend_from_slice(&SRID.to_le_bytes());
    // WKB axis order is (x, y) = (longitude, latitude)
    out.extend_from_slice(&point.lng().to_le_bytes());
    out.extend_from_slice(&point.lat().to_le_bytes());
    Ok(out)
}

/// Encode raw coordinates, failing on NaN or out-of-range values
pub fn encode_coords(lat: f64, lng: f64) -> Result<Vec<u8>, GeoError> {
    let point = Point::new(lat, lng).ok_or_else(|| {
        GeoError::Encoding(format!("coordinates out of range: ({}, {})", lat, lng))
    })?;
    encode(&point)
}

/// Decode an EWKB (or plain WKB) 2D point
///
/// Accepts either byte order. An SRID, when present, must be 4326.
pub fn decode(bytes: &[u8]) -> Result<Point, GeoError> {
    let mut reader = WkbReader::new(bytes)?;

    let geometry_type = reader.read_u32()?;
    if geometry_type & (EWKB_Z_FLAG | EWKB_M_FLAG) != 0 {
        return Err(GeoError::Decoding(
            "only 2D point geometries are supported".to_string(),
        ));
    }

    let kind = geometry_type & 0x0FFF_FFFF;
    if kind != WKB_POINT {
        return Err(GeoError::Decoding(format!(
            "location is not a point (geometry type {})",
            kind
        )));
    }

    if geometry_type & EWKB_SRID_FLAG != 0 {
        let srid = reader.read_u32()?;
        if srid != SRID {
            return Err(GeoError::Decoding(format!("unexpected SRID {}", srid)));
        }
    }

    let lng = reader.read_f64()?;
    let lat = reader.read_f64()?;
    reader.finish()?;

    Point::new(lat, lng).ok_or_else(|| {
        GeoError::Decoding(format!("coordinates out of range: ({}, {})", lat, lng))
    })
}

/// Hex text form of [`encode`]
pub fn encode_hex(point: &Point) -> Result<String, GeoError> {
    encode(point).map(hex::encode_upper)
}

/// Decode the hex text form of an EWKB point
pub fn decode_hex(location: &str) -> Result<Point, GeoError> {
    let bytes = hex::decode(location.trim())
        .map_err(|e| GeoError::Decoding(format!("invalid hex: {}", e)))?;
    decode(&bytes)
}

struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self, GeoError> {
        let little_endian = match bytes.first() {
            Some(&BYTE_ORDER_NDR) => true,
            Some(&BYTE_ORDER_XDR) => false,
            Some(other) => {
                return Err(GeoError::Decoding(format!("unknown byte order {}", other)))
            }
            None => return Err(GeoError::Decoding("empty geometry".to_string())),
        };
        Ok(Self {
            bytes,
            pos: 1,
            little_endian,
        })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], GeoError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| GeoError::Decoding("truncated geometry".to_string()))?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos = end;
        Ok(buf)
    }

    fn read_u32(&mut self) -> Result<u32, GeoError> {
        let buf = self.take::<4>()?;
        Ok(if self.little_endian {
            u32::from_le_bytes(buf)
        } else {
            u32::from_be_bytes(buf)
        })
    }

    fn read_f64(&mut self) -> Result<f64, GeoError> {
        let buf = self.take::<8>()?;
        Ok(if self.little_endian {
            f64::from_le_bytes(buf)
        } else {
            f64::from_be_bytes(buf)
        })
    }

    fn finish(self) -> Result<(), GeoError> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(GeoError::Decoding(format!(
                "{} trailing bytes after point",
                self.bytes.len() - self.pos
            )))
        }
    }
}

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let half_lat = (delta_lat / 2.0).sin();
    let half_lon = (delta_lon / 2.0).sin();
    let a = half_lat * half_lat + lat1_rad.cos() * lat2_rad.cos() * half_lon * half_lon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whole kilometers between two points, truncated toward zero
#[inline]
pub fn distance_km(from: &Point, to: &Point) -> i64 {
    haversine_distance(from.lat(), from.lng(), to.lat(), to.lng()) as i64
}
