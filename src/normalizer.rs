//! Maps provider listing payloads onto the canonical `Property`.
//!
//! Every lookup tolerates missing or oddly typed keys. The only input that is
//! rejected is a record that is not a JSON object at all.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::fetcher::{as_number, first_number, first_text, number, text};
use crate::scorer::listing_score;
use crate::types::Property;

const UNKNOWN: &str = "Unknown";
const HALF_BATH: f64 = 0.5;

const DEFAULT_NEIGHBORHOOD_SCORE: f64 = 7.5;
const DEFAULT_WALKABILITY_SCORE: f64 = 50.0;
const DEFAULT_SCHOOL_RATING: f64 = 7.0;
const DEFAULT_CRIME_RATING: &str = "Moderate";

/// Normalize one listing. `None` only when `raw` is not an object.
pub fn normalize(raw: &Value) -> Option<Property> {
    if !raw.is_object() {
        return None;
    }
    let addr = raw.get("address").filter(|a| a.is_object());

    let address = addr
        .and_then(|a| first_text(a, &["line", "addressLine1", "street"]))
        .or_else(|| text(raw, "address"))
        .or_else(|| first_text(raw, &["addressLine1", "formattedAddress"]))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let city = addr
        .and_then(|a| text(a, "city"))
        .or_else(|| text(raw, "city"))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let state = addr
        .and_then(|a| text(a, "state"))
        .or_else(|| text(raw, "state"))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let zip_code = addr
        .and_then(|a| first_text(a, &["zipCode", "postalCode"]))
        .or_else(|| first_text(raw, &["zipCode", "postalCode"]))
        .unwrap_or_default();

    let price = first_number(raw, &["price", "listPrice"])
        .filter(|p| *p > 0.0)
        .unwrap_or(0.0);
    let bedrooms = count(first_number(raw, &["bedrooms", "beds"]));
    let bathrooms = first_number(raw, &["bathrooms", "baths"])
        .filter(|b| *b > 0.0)
        .unwrap_or(0.0)
        + f64::from(count(first_number(raw, &["halfBathrooms"]))) * HALF_BATH;
    let square_feet = first_number(raw, &["squareFootage", "livingArea"])
        .filter(|a| *a > 0.0)
        .unwrap_or(0.0);
    let days_on_market = count(first_number(raw, &["daysOnMarket"]));

    let property_type = text(raw, "propertyType").unwrap_or_else(|| UNKNOWN.to_string());
    let listing_date = first_text(raw, &["listedDate", "listingDate"]).and_then(|s| parse_date(&s));
    let description = text(raw, "description").unwrap_or_default();
    let photo_url = photo_url(raw);
    let listing_url = first_text(raw, &["listingUrl", "url"]);

    let reported_rent = raw.get("rentEstimate").and_then(|r| match r {
        Value::Object(_) => r.get("rent").and_then(as_number),
        other => as_number(other),
    });

    let neighborhood = raw.get("neighborhood").filter(|n| n.is_object());
    let schools = raw.get("schools").filter(|s| s.is_object());
    let amenities = raw
        .get("amenities")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let ai_score = listing_score::ai_score(price, square_feet, days_on_market, bedrooms, bathrooms);
    let rental_estimate = listing_score::rental_estimate(price, reported_rent);

    Some(Property {
        id: listing_id(&address, &zip_code),
        address,
        city,
        state,
        zip_code,
        price,
        bedrooms,
        bathrooms,
        square_feet,
        property_type,
        listing_date,
        days_on_market,
        description,
        photo_url,
        listing_url,
        amenities,
        neighborhood_score: neighborhood
            .and_then(|n| number(n, "score"))
            .unwrap_or(DEFAULT_NEIGHBORHOOD_SCORE),
        walkability_score: number(raw, "walkScore").unwrap_or(DEFAULT_WALKABILITY_SCORE),
        school_rating: schools
            .and_then(|s| number(s, "rating"))
            .unwrap_or(DEFAULT_SCHOOL_RATING),
        crime_rating: neighborhood
            .and_then(|n| text(n, "crimeRating"))
            .unwrap_or_else(|| DEFAULT_CRIME_RATING.to_string()),
        ai_score,
        trend: listing_score::trend(days_on_market),
        investment_potential: listing_score::investment_tier(ai_score),
        rental_estimate,
        cap_rate: listing_score::cap_rate(price, rental_estimate),
    })
}

/// Normalize a batch, logging and skipping malformed records.
pub fn normalize_batch(records: &[Value]) -> Vec<Property> {
    records
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let property = normalize(raw);
            if property.is_none() {
                warn!(index = idx, "Skipping malformed listing record");
            }
            property
        })
        .collect()
}

/// Lower-case alphanumeric runs of address and ZIP joined by `-`,
/// e.g. "123 Oak Street" + "78701" is `123-oak-street-78701`.
pub fn listing_id(address: &str, zip_code: &str) -> String {
    format!("{address} {zip_code}")
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn count(n: Option<f64>) -> u32 {
    n.map(|v| v.max(0.0).round().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Accepts "2024-07-15" and ISO timestamps such as "2024-07-15T00:00:00.000Z".
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn photo_url(raw: &Value) -> Option<String> {
    let first = raw.get("photos").and_then(|p| p.as_array()).and_then(|a| a.first());
    let from_array = first.and_then(|photo| match photo {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => first_text(photo, &["href", "url"]),
        _ => None,
    });
    from_array.or_else(|| first_text(raw, &["photoUrl", "imgSrc"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvestmentTier, Trend};
    use serde_json::json;

    #[test]
    fn empty_object_normalizes_to_defaults() {
        let p = normalize(&json!({})).unwrap();
        assert_eq!(p.address, "Unknown");
        assert_eq!(p.city, "Unknown");
        assert_eq!(p.state, "Unknown");
        assert_eq!(p.zip_code, "");
        assert_eq!(p.property_type, "Unknown");
        assert_eq!(p.description, "");
        assert_eq!(p.price, 0.0);
        assert_eq!(p.bedrooms, 0);
        assert_eq!(p.bathrooms, 0.0);
        assert_eq!(p.square_feet, 0.0);
        assert_eq!(p.days_on_market, 0);
        assert!(p.listing_date.is_none());
        assert!(p.photo_url.is_none());
        assert_eq!(p.rental_estimate, 0.0);
        assert_eq!(p.cap_rate, 6.0);
        assert_eq!(p.ai_score, 7.0);
        assert_eq!(p.investment_potential, InvestmentTier::Fair);
        assert_eq!(p.id, "unknown");
        assert!(p.amenities.is_empty());
        assert_eq!(p.neighborhood_score, 7.5);
        assert_eq!(p.walkability_score, 50.0);
        assert_eq!(p.school_rating, 7.0);
        assert_eq!(p.crime_rating, "Moderate");
    }

    #[test]
    fn enrichment_fields_are_read_when_present() {
        let p = normalize(&json!({
            "amenities": ["Pool", " ", 3, "Garage"],
            "neighborhood": {"score": "8.2", "crimeRating": "Low"},
            "walkScore": 88,
            "schools": {"rating": 9}
        }))
        .unwrap();
        assert_eq!(p.amenities, vec!["Pool".to_string(), "Garage".to_string()]);
        assert_eq!(p.neighborhood_score, 8.2);
        assert_eq!(p.walkability_score, 88.0);
        assert_eq!(p.school_rating, 9.0);
        assert_eq!(p.crime_rating, "Low");

        let odd = normalize(&json!({
            "amenities": "Pool",
            "neighborhood": "nice",
            "schools": [9],
            "walkScore": null
        }))
        .unwrap();
        assert!(odd.amenities.is_empty());
        assert_eq!(odd.neighborhood_score, 7.5);
        assert_eq!(odd.walkability_score, 50.0);
        assert_eq!(odd.school_rating, 7.0);
        assert_eq!(odd.crime_rating, "Moderate");
    }

    #[test]
    fn listing_id_is_a_stable_slug() {
        assert_eq!(listing_id("123 Oak Street", "78701"), "123-oak-street-78701");
        assert_eq!(listing_id(" 9 Lake Rd, Austin, TX ", "78703"), "9-lake-rd-austin-tx-78703");
        assert_eq!(listing_id("Unit #4B", ""), "unit-4b");
    }

    #[test]
    fn wrong_typed_fields_fall_back_to_defaults() {
        let p = normalize(&json!({
            "address": 42,
            "price": {"amount": 1},
            "bedrooms": "three",
            "photos": "not-an-array",
            "rentEstimate": [],
        }))
        .unwrap();
        assert_eq!(p.address, "Unknown");
        assert_eq!(p.price, 0.0);
        assert_eq!(p.bedrooms, 0);
        assert!(p.photo_url.is_none());
    }

    #[test]
    fn nested_address_and_derived_fields() {
        let p = normalize(&json!({
            "address": {"line": "123 Oak Street", "city": "Austin", "state": "TX", "zipCode": "78701"},
            "price": 650000,
            "bedrooms": 3,
            "bathrooms": 2,
            "halfBathrooms": 1,
            "squareFootage": 1850,
            "propertyType": "Single Family",
            "listedDate": "2024-07-15T00:00:00.000Z",
            "daysOnMarket": 15,
            "photos": [{"href": "https://img/1.jpg"}],
            "rentEstimate": {"rent": 3200}
        }))
        .unwrap();

        assert_eq!(p.address, "123 Oak Street");
        assert_eq!(p.id, "123-oak-street-78701");
        assert_eq!(p.zip_code, "78701");
        assert_eq!(p.bathrooms, 2.5);
        assert_eq!(p.listing_date, NaiveDate::from_ymd_opt(2024, 7, 15));
        assert_eq!(p.photo_url.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(p.trend, Trend::Rising);
        assert_eq!(p.rental_estimate, 3200.0);
        assert_eq!(p.cap_rate, 4.4);
        // base 7.0 + fresh listing 0.5 + family layout 0.5
        assert_eq!(p.ai_score, 8.0);
        assert_eq!(p.investment_potential, InvestmentTier::Good);
    }

    #[test]
    fn flat_address_fields_are_read() {
        let p = normalize(&json!({
            "formattedAddress": "9 Lake Rd, Austin, TX 78703",
            "city": "Austin",
            "state": "TX",
            "zipCode": "78703",
            "price": "$480,000",
            "livingArea": 1500,
            "daysOnMarket": 120
        }))
        .unwrap();
        assert_eq!(p.address, "9 Lake Rd, Austin, TX 78703");
        assert_eq!(p.city, "Austin");
        assert_eq!(p.price, 480000.0);
        assert_eq!(p.square_feet, 1500.0);
        assert_eq!(p.trend, Trend::Declining);
        assert_eq!(p.rental_estimate, 2880.0);
    }

    #[test]
    fn batch_skips_malformed_records() {
        let out = normalize_batch(&[json!({"price": 1}), json!([1, 2]), json!("x"), json!({})]);
        assert_eq!(out.len(), 2);
    }
}
