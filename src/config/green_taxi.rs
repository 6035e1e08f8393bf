//! Reference instance: NYC TLC "green taxi" trip records, 2013-09 layout.
//!
//! Column types:
//!
//! - IDs and counts are `SmallInt` (RateCodeID reaches 99, too close to the `i8` limit)
//! - timestamps are New York wall-clock time, stored as UTC
//! - longitudes keep all 15 source fractional digits with up to 3 integral digits
//!   (`DECIMAL(18,15)`), latitudes up to 2 (`DECIMAL(17,15)`)
//! - distances stay below 100 miles (`DECIMAL(4,2)`), dollar amounts below $10,000
//!   (`DECIMAL(6,2)`)
//!
//! The source header spells `Lpep_dropoff_datetime` with a capital `L`; the schema uses the
//! data dictionary's `lpep_dropoff_datetime`.

use crate::types::{Field, LogicalType, Schema};

/// Header line the source file must start with, in order.
pub const HEADER: [&str; 20] = [
    "VendorID",
    "lpep_pickup_datetime",
    "Lpep_dropoff_datetime",
    "Store_and_fwd_flag",
    "RateCodeID",
    "Pickup_longitude",
    "Pickup_latitude",
    "Dropoff_longitude",
    "Dropoff_latitude",
    "Passenger_count",
    "Trip_distance",
    "Fare_amount",
    "Extra",
    "MTA_tax",
    "Tip_amount",
    "Tolls_amount",
    "Ehail_fee",
    "Total_amount",
    "Payment_type",
    "Trip_type",
];

const INTEGER: LogicalType = LogicalType::SmallInt;
const TIMESTAMP: LogicalType = LogicalType::TimestampLocal;
const BOOLEAN: LogicalType = LogicalType::Bool;
const DECIMAL_LON: LogicalType = LogicalType::Decimal {
    precision: 18,
    scale: 15,
};
const DECIMAL_LAT: LogicalType = LogicalType::Decimal {
    precision: 17,
    scale: 15,
};
const DECIMAL_DISTANCE: LogicalType = LogicalType::Decimal {
    precision: 4,
    scale: 2,
};
const DECIMAL_DOLLAR: LogicalType = LogicalType::Decimal {
    precision: 6,
    scale: 2,
};

const COLUMNS: [(&str, LogicalType); 20] = [
    ("VendorID", INTEGER),
    ("lpep_pickup_datetime", TIMESTAMP),
    ("lpep_dropoff_datetime", TIMESTAMP),
    ("Store_and_fwd_flag", BOOLEAN),
    ("RateCodeID", INTEGER),
    ("Pickup_longitude", DECIMAL_LON),
    ("Pickup_latitude", DECIMAL_LAT),
    ("Dropoff_longitude", DECIMAL_LON),
    ("Dropoff_latitude", DECIMAL_LAT),
    ("Passenger_count", INTEGER),
    ("Trip_distance", DECIMAL_DISTANCE),
    ("Fare_amount", DECIMAL_DOLLAR),
    ("Extra", DECIMAL_DOLLAR),
    ("MTA_tax", DECIMAL_DOLLAR),
    ("Tip_amount", DECIMAL_DOLLAR),
    ("Tolls_amount", DECIMAL_DOLLAR),
    ("Ehail_fee", DECIMAL_DOLLAR),
    ("Total_amount", DECIMAL_DOLLAR),
    ("Payment_type", INTEGER),
    ("Trip_type", INTEGER),
];

/// The 20-column typed schema of cleaned records.
pub fn schema() -> Schema {
    Schema::new(
        COLUMNS
            .iter()
            .map(|&(name, logical_type)| Field::new(name, logical_type))
            .collect(),
    )
}
