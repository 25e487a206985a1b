//! Response tainting: how a response looks to the requesting page.

use shellkeep_core::ResponseKind;
use url::Url;

/// Classify a response received for `origin`.
///
/// - Same origin as the application: `basic`
/// - Cross-origin with an `Access-Control-Allow-Origin` granting this origin: `cors`
/// - Any other cross-origin response: `opaque`
pub fn response_kind(origin: &Url, final_url: &Url, allow_origin: Option<&str>) -> ResponseKind {
    if final_url.origin() == origin.origin() {
        return ResponseKind::Basic;
    }

    let serialized = origin.origin().ascii_serialization();
    match allow_origin.map(str::trim) {
        Some("*") => ResponseKind::Cors,
        Some(allowed) if allowed.eq_ignore_ascii_case(&serialized) => ResponseKind::Cors,
        _ => ResponseKind::Opaque,
    }
}
