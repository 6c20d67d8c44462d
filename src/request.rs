//! Request parameter validation.
//!
//! Everything that reaches `NearestQueryService` has been through here:
//! coordinates are finite and in range, `page` and `per_page` are positive.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use crate::model::{LATITUDE_RANGE, LONGITUDE_RANGE};

pub const PARAM_LATITUDE: &str = "latitude";
pub const PARAM_LONGITUDE: &str = "longitude";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_PER_PAGE: &str = "per_page";

/// A validated nearest-car-park request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub page: NonZeroUsize,
    pub per_page: NonZeroUsize,
}

/// Why a request was rejected. Rendered to the client as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// A required parameter was not supplied.
    Missing(&'static str),
    /// The value is not a number of the expected kind.
    Invalid { name: &'static str, value: String },
    /// A coordinate outside the WGS84 ranges.
    OutOfRange { name: &'static str, value: f64 },
    /// `page` or `per_page` given as zero or a negative integer.
    NotPositive { name: &'static str, value: i64 },
}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::Missing(name) => write!(f, "Missing required parameter: {}", name),
            ParamError::Invalid { name, value } => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
            ParamError::OutOfRange { name, value } => {
                write!(f, "{} out of range: {}", name, value)
            }
            ParamError::NotPositive { name, value } => {
                write!(f, "{} must be a positive integer, got {}", name, value)
            }
        }
    }
}

impl std::error::Error for ParamError {}

/// Validates raw string parameters.
///
/// `latitude` and `longitude` are required. `page` defaults to 1 and
/// `per_page` to `default_per_page` when absent; when present they must be
/// positive integers.
pub fn parse_nearest(
    latitude: Option<&str>,
    longitude: Option<&str>,
    page: Option<&str>,
    per_page: Option<&str>,
    default_per_page: NonZeroUsize,
) -> Result<NearestRequest, ParamError> {
    let latitude = parse_coordinate(PARAM_LATITUDE, latitude, &LATITUDE_RANGE)?;
    let longitude = parse_coordinate(PARAM_LONGITUDE, longitude, &LONGITUDE_RANGE)?;
    let page = parse_positive(PARAM_PAGE, page)?.unwrap_or(NonZeroUsize::MIN);
    let per_page = parse_positive(PARAM_PER_PAGE, per_page)?.unwrap_or(default_per_page);

    Ok(NearestRequest {
        latitude,
        longitude,
        page,
        per_page,
    })
}

/// Same as `parse_nearest`, reading from a query-string style map.
pub fn parse_nearest_params(
    params: &HashMap<String, String>,
    default_per_page: NonZeroUsize,
) -> Result<NearestRequest, ParamError> {
    let get = |name: &str| params.get(name).map(String::as_str);
    parse_nearest(
        get(PARAM_LATITUDE),
        get(PARAM_LONGITUDE),
        get(PARAM_PAGE),
        get(PARAM_PER_PAGE),
        default_per_page,
    )
}

fn parse_coordinate(
    name: &'static str,
    raw: Option<&str>,
    range: &std::ops::RangeInclusive<f64>,
) -> Result<f64, ParamError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(ParamError::Missing(name))?;

    let value: f64 = raw.parse().map_err(|_| ParamError::Invalid {
        name,
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ParamError::Invalid {
            name,
            value: raw.to_string(),
        });
    }
    if !range.contains(&value) {
        return Err(ParamError::OutOfRange { name, value });
    }
    Ok(value)
}

fn parse_positive(name: &'static str, raw: Option<&str>) -> Result<Option<NonZeroUsize>, ParamError> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };

    let value: i64 = raw.parse().map_err(|_| ParamError::Invalid {
        name,
        value: raw.to_string(),
    })?;
    let positive = usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(ParamError::NotPositive { name, value })?;
    Ok(Some(positive))
}
