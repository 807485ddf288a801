//! Phone-reveal call: identifiers, request payload and response parsing
//!
//! Seller numbers are masked on detail pages. Revealing one takes a POST
//! that names the listing, the owner and the phone slot, wrapped in the
//! form template the site's own pop-up sends.

use serde_json::{json, Value};

/// Country code prefixed to numbers found in a response template
pub const COUNTRY_PREFIX: &str = "+380";

const ANALYTICS_SOURCE: &str =
    "main_side_sellerInfo_sellerInfoHiddenPhone_sellerInfoPhone_showBottomPopUp";

/// The three page-embedded identifiers the reveal call needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneIdentifiers {
    pub phone_id: String,
    pub auto_id: String,
    pub user_id: String,
}

impl PhoneIdentifiers {
    /// Combines the identifiers; all three must be present
    pub fn from_parts(
        phone_id: Option<String>,
        auto_id: Option<String>,
        user_id: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            phone_id: phone_id?,
            auto_id: auto_id?,
            user_id: user_id?,
        })
    }
}

/// Builds the JSON body of the phone-reveal POST
pub fn build_payload(ids: &PhoneIdentifiers) -> Value {
    json!({
        "blockId": "autoPhone",
        "popUpId": "autoPhone",
        "isLoginRequired": false,
        "autoId": ids.auto_id,
        "data": [
            ["userId", ids.user_id],
            ["phoneId", ids.phone_id],
            ["title", ""],
            ["isCheckedVin", "1"],
            ["companyId", ""],
            ["companyEng", ""],
            ["avatar", ""],
            ["userName", ""],
            ["isCardPayer", "1"],
            ["dia", ""],
            ["isOnline", ""],
            ["isCompany", ""],
            ["srcAnalytic", ANALYTICS_SOURCE],
        ],
        "params": {
            "userId": ids.user_id,
            "phoneId": ids.phone_id,
            "title": "",
            "isCheckedVin": "1",
            "companyId": "",
            "companyEng": "",
            "avatar": "",
            "userName": "",
            "isCardPayer": "1",
            "dia": "",
            "isOnline": "",
            "isCompany": "",
        },
        "target": {},
        "formId": null,
        "langId": 2,
        "device": "desktop-web",
    })
}

/// Pulls the phone number out of a decoded reveal response
///
/// The first template whose `actionData.params.phone` is set wins and gets
/// the country prefix. Otherwise a top-level `phone` is returned as is.
pub fn parse_response(data: &Value) -> Option<String> {
    let from_templates = data
        .get("templates")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find_map(|template| {
            template
                .pointer("/actionData/params/phone")
                .and_then(phone_text)
        });

    if let Some(phone) = from_templates {
        return Some(format!("{}{}", COUNTRY_PREFIX, phone));
    }

    data.get("phone").and_then(phone_text)
}

/// Stringifies a phone value; null, empty, false and zero count as missing
fn phone_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}
