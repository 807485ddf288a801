//! Detail-page record extraction
//!
//! Each field is filled by an ordered chain of strategies; the first one that
//! yields a value wins. Parsing the document is synchronous and finishes
//! before the only await point (the phone-reveal call), so the parsed tree
//! never lives across a suspension.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::phone::{self, PhoneIdentifiers};
use crate::record::{CarDraft, CarRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static MASKED_VIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-HJ-NPR-Z0-9]{8}[A-HJ-NPR-Z0-9][A-HJ-NPR-Z0-9]{2}[xX]{4}[A-HJ-NPR-Z0-9]{2}\b")
        .expect("hardcoded regex pattern is valid")
});

static USER_NAME_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.ria\.userName\s*=\s*"([^"]*)";"#)
        .expect("hardcoded regex pattern is valid")
});

static HEAD_PHOTO_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.ria\.headPhoto\s*=\s*"([^"]+)""#)
        .expect("hardcoded regex pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

/// One way of reading a field off a parsed page
pub type Strategy<T> = fn(&DetailPage) -> Option<T>;

/// Runs a strategy chain; the first non-empty result wins
pub fn first_match<T>(page: &DetailPage, chain: &[Strategy<T>]) -> Option<T> {
    chain.iter().find_map(|strategy| strategy(page))
}

const TITLE: &[Strategy<String>] = &[title_from_heading];
const PRICE: &[Strategy<Value>] = &[price_from_structured_data];
const ODOMETER: &[Strategy<Value>] = &[odometer_from_structured_data];
const VIN: &[Strategy<Value>] = &[vin_from_structured_data, vin_from_masked_text];
const SELLER_NAME: &[Strategy<String>] = &[seller_from_info_block, seller_from_script];
const IMAGE_URL: &[Strategy<String>] = &[image_from_script];
const IMAGE_COUNT: &[Strategy<usize>] = &[image_count_from_photo_ids];
const PLATE_NUMBER: &[Strategy<String>] = &[plate_from_state_number];

/// A parsed detail page plus the raw text the script-variable strategies scan
pub struct DetailPage {
    document: Html,
    source: String,
    structured: Option<Value>,
}

impl DetailPage {
    /// Parses a detail page
    ///
    /// The embedded JSON-LD block (`script#ldJson2`) is decoded once up
    /// front; a missing or malformed block leaves `structured` empty.
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let structured = select_first(&document, "script#ldJson2")
            .map(|script| script.text().collect::<String>())
            .and_then(|text| match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("[Parser] Malformed structured data block: {}", e);
                    None
                }
            });

        Self {
            document,
            source: html.to_string(),
            structured,
        }
    }

    /// Decoded JSON-LD block, if any
    pub fn structured(&self) -> Option<&Value> {
        self.structured.as_ref()
    }

    /// Assembles every field except the phone number
    pub fn draft(&self, url: &str) -> CarDraft {
        CarDraft {
            url: url.to_string(),
            title: Some(first_match(self, TITLE).unwrap_or_default()),
            price: first_match(self, PRICE),
            odometer: first_match(self, ODOMETER),
            seller_name: first_match(self, SELLER_NAME),
            phone_number: None,
            image_url: first_match(self, IMAGE_URL),
            image_count: first_match(self, IMAGE_COUNT),
            plate_number: first_match(self, PLATE_NUMBER),
            vin: first_match(self, VIN),
        }
    }

    /// Phone-reveal identifiers; `None` unless all three are on the page
    pub fn phone_identifiers(&self) -> Option<PhoneIdentifiers> {
        PhoneIdentifiers::from_parts(
            self.attribute("a#openPopupCommentSeller[data-phone-id]", "data-phone-id"),
            self.attribute("body[data-auto-id]", "data-auto-id"),
            self.attribute("script[data-owner-id]", "data-owner-id"),
        )
    }

    fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        select_first(&self.document, selector)?
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn capture(&self, regex: &Regex) -> Option<String> {
        regex
            .captures(&self.source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// Text nodes directly under an element, nested tooltips excluded
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect()
}

fn title_from_heading(page: &DetailPage) -> Option<String> {
    let heading = select_first(&page.document, "h1")?;
    Some(own_text(heading).trim().to_string())
}

fn price_from_structured_data(page: &DetailPage) -> Option<Value> {
    page.structured()?
        .pointer("/offers/price")
        .filter(|v| !v.is_null())
        .cloned()
}

fn odometer_from_structured_data(page: &DetailPage) -> Option<Value> {
    page.structured()?
        .pointer("/mileageFromOdometer/value")
        .filter(|v| !v.is_null())
        .cloned()
}

fn vin_from_structured_data(page: &DetailPage) -> Option<Value> {
    page.structured()?
        .get("vehicleIdentificationNumber")
        .filter(|v| !v.is_null())
        .cloned()
}

/// Scans the whole page for a VIN with four redacted characters
fn vin_from_masked_text(page: &DetailPage) -> Option<Value> {
    MASKED_VIN
        .find(&page.source)
        .map(|m| Value::String(m.as_str().to_uppercase()))
}

fn seller_from_info_block(page: &DetailPage) -> Option<String> {
    let link = select_first(
        &page.document,
        "section#userInfoBlock div.seller_info_name a",
    )?;
    let name = link.text().collect::<String>().trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn seller_from_script(page: &DetailPage) -> Option<String> {
    page.capture(&USER_NAME_VAR)
}

fn image_from_script(page: &DetailPage) -> Option<String> {
    page.capture(&HEAD_PHOTO_VAR)
}

/// Counts distinct photo ids; thumbnails repeat the same id
fn image_count_from_photo_ids(page: &DetailPage) -> Option<usize> {
    let selector = Selector::parse("img[data-photo-id]").ok()?;
    let ids: HashSet<&str> = page
        .document
        .select(&selector)
        .filter_map(|img| img.value().attr("data-photo-id"))
        .collect();
    Some(ids.len())
}

fn plate_from_state_number(page: &DetailPage) -> Option<String> {
    let plate = select_first(&page.document, "span.state-num.ua")?;
    let compact = WHITESPACE.replace_all(own_text(plate).trim(), "").into_owned();
    (!compact.is_empty()).then_some(compact)
}

/// Turns detail pages into validated records
#[derive(Clone)]
pub struct RecordExtractor {
    fetcher: PageFetcher,
    phone_url: String,
}

impl RecordExtractor {
    pub fn new(fetcher: PageFetcher, phone_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            phone_url: phone_url.into(),
        }
    }

    /// Extracts a record from a detail page
    ///
    /// Returns `None` when the assembled fields fail validation; that is the
    /// only way extraction fails. Phone-reveal problems only leave the phone
    /// number empty.
    pub async fn extract_record(&self, html: &str, url: &str) -> Option<CarRecord> {
        let (mut draft, phone_ids) = {
            let page = DetailPage::parse(html);
            (page.draft(url), page.phone_identifiers())
        };

        if let Some(ids) = phone_ids {
            draft.phone_number = self.reveal_phone(&ids, url).await;
        } else {
            tracing::debug!("[Parser] No phone identifiers on {}", url);
        }

        match draft.validate() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("[Parser] Validation error for {}: {}", url, e);
                None
            }
        }
    }

    async fn reveal_phone(&self, ids: &PhoneIdentifiers, url: &str) -> Option<String> {
        let headers = self.fetcher.phone_headers(url);
        let payload = phone::build_payload(ids);

        let body = match self.fetcher.post(&self.phone_url, headers, &payload).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    "[Parser] Error fetching phone number for {} (phone_id={}, auto_id={}, user_id={}): {}",
                    url,
                    ids.phone_id,
                    ids.auto_id,
                    ids.user_id,
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(data) => phone::parse_response(&data),
            Err(e) => {
                let preview: String = body.chars().take(100).collect();
                tracing::warn!(
                    "[Parser] Failed to decode phone JSON for {}: {} ({:?})",
                    url,
                    e,
                    preview
                );
                None
            }
        }
    }
}
