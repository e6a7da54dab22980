#![forbid(unsafe_code)]

use std::collections::HashMap;
use url::form_urlencoded;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Whether a body with this content type should be decoded as a form.
/// A missing content type is treated as a form, since several SMS webhook
/// providers omit it.
pub fn is_form_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => value
            .split(';')
            .next()
            .map(|essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
            .unwrap_or(false),
    }
}

/// Decodes URL-encoded fields from the body and then the query string. The
/// first occurrence of a key wins, so body values shadow query values.
pub fn decode_form_fields(body: Option<&[u8]>, query: Option<&str>) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let sources = body
        .into_iter()
        .chain(query.map(str::as_bytes));

    for source in sources {
        for (key, value) in form_urlencoded::parse(source) {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }

    fields
}
