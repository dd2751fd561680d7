//! Validation for geographic coordinates and region geometry.

use crate::error::{Error, Result};
use geo::{Coord, Point, Polygon};

const MIN_RING_COORDS: usize = 4;

/// Whether a point is finite and within lon [-180, 180], lat [-90, 90].
pub fn is_geographic(point: &Point) -> bool {
    let (x, y) = (point.x(), point.y());
    x.is_finite() && y.is_finite() && (-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y)
}

/// Validates a 2D point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use geotract::compute::validation::validate_geographic_point;
/// use geo::Point;
///
/// let sao_paulo = Point::new(-46.6333, -23.5505);
/// assert!(validate_geographic_point(&sao_paulo).is_ok());
///
/// let invalid = Point::new(-46.6, 95.0);
/// assert!(validate_geographic_point(&invalid).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(Error::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(Error::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(Error::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(Error::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Parses and validates a textual `lng`/`lat` pair as received by a request
/// handler.
///
/// # Examples
///
/// ```
/// use geotract::compute::validation::parse_query_point;
///
/// let point = parse_query_point("-46.63", "-23.55").unwrap();
/// assert_eq!(point.x(), -46.63);
///
/// assert!(parse_query_point("abc", "-23.55").is_err());
/// ```
pub fn parse_query_point(lng: &str, lat: &str) -> Result<Point> {
    let parse = |name: &str, raw: &str| {
        raw.trim().parse::<f64>().map_err(|_| {
            Error::InvalidInput(format!("{} must be a number, got: {:?}", name, raw))
        })
    };

    let point = Point::new(parse("lng", lng)?, parse("lat", lat)?);
    validate_geographic_point(&point)?;
    Ok(point)
}

/// Validates all polygon coordinates (exterior and interior rings) are in
/// geographic range.
pub fn validate_polygon(polygon: &Polygon) -> Result<()> {
    for (idx, coord) in polygon.exterior().coords().enumerate() {
        let point = Point::from(*coord);
        validate_geographic_point(&point).map_err(|e| {
            Error::InvalidInput(format!("Exterior ring point at index {}: {}", idx, e))
        })?;
    }

    for (ring_idx, interior) in polygon.interiors().iter().enumerate() {
        for (idx, coord) in interior.coords().enumerate() {
            let point = Point::from(*coord);
            validate_geographic_point(&point).map_err(|e| {
                Error::InvalidInput(format!(
                    "Interior ring {} point at index {}: {}",
                    ring_idx, idx, e
                ))
            })?;
        }
    }

    Ok(())
}

/// Structural checks every indexed polygon must pass: finite vertices and
/// rings with at least four coordinates once closed.
pub fn validate_polygon_structure(polygon: &Polygon) -> Result<()> {
    check_ring("Exterior ring", &polygon.exterior().0)?;

    for (ring_idx, interior) in polygon.interiors().iter().enumerate() {
        check_ring(&format!("Interior ring {}", ring_idx), &interior.0)?;
    }

    Ok(())
}

fn check_ring(name: &str, coords: &[Coord]) -> Result<()> {
    if coords.len() < MIN_RING_COORDS {
        return Err(Error::InvalidInput(format!(
            "{} needs at least {} coordinates, got {}",
            name,
            MIN_RING_COORDS,
            coords.len()
        )));
    }

    if let Some(idx) = coords
        .iter()
        .position(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(Error::InvalidInput(format!(
            "{} has a non-finite coordinate at index {}",
            name, idx
        )));
    }

    Ok(())
}
