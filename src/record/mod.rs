//! Vehicle record definitions
//!
//! A detail page is first turned into a [`CarDraft`]: the raw field set as it
//! was found on the page, numeric fields still in their JSON form. Only
//! [`CarDraft::validate`] produces a [`CarRecord`], the unit handed to storage.

mod validation;

pub use validation::ValidationError;

use serde::Serialize;
use serde_json::Value;

/// A validated vehicle record, keyed by `url`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarRecord {
    pub url: String,
    pub title: Option<String>,
    pub price_usd: Option<f64>,
    pub odometer: Option<u32>,
    pub seller_name: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub image_count: Option<u32>,
    pub plate_number: Option<String>,
    pub vin: Option<String>,
}

impl CarRecord {
    /// Creates a record with every optional field empty
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            price_usd: None,
            odometer: None,
            seller_name: None,
            phone_number: None,
            image_url: None,
            image_count: None,
            plate_number: None,
            vin: None,
        }
    }
}

/// Raw field set assembled by the extractor, not yet checked
#[derive(Debug, Clone, Default)]
pub struct CarDraft {
    pub url: String,
    pub title: Option<String>,
    pub price: Option<Value>,
    pub odometer: Option<Value>,
    pub seller_name: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub image_count: Option<usize>,
    pub plate_number: Option<String>,
    pub vin: Option<Value>,
}

impl CarDraft {
    /// Checks every field against the record constraints
    ///
    /// Any violation rejects the whole draft; nothing is partially kept.
    pub fn validate(self) -> Result<CarRecord, ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let price_usd = self
            .price
            .as_ref()
            .map(|v| validation::non_negative_decimal("price_usd", v))
            .transpose()?;
        let odometer = self
            .odometer
            .as_ref()
            .map(|v| validation::non_negative_integer("odometer", v))
            .transpose()?;
        let image_count = self
            .image_count
            .map(|count| {
                u32::try_from(count).map_err(|_| ValidationError::OutOfRange {
                    field: "image_count",
                    value: count.to_string(),
                })
            })
            .transpose()?;
        let vin = self
            .vin
            .as_ref()
            .map(|v| validation::string_value("vin", v))
            .transpose()?;

        Ok(CarRecord {
            url: self.url,
            title: self.title,
            price_usd,
            odometer,
            seller_name: self.seller_name,
            phone_number: validation::stripped(self.phone_number),
            image_url: self.image_url,
            image_count,
            plate_number: validation::stripped(self.plate_number),
            vin,
        })
    }
}
