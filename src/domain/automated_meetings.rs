//! Detection of meetings created by automated booking tools such as Calendly.

use crate::models::properties::meeting;
use crate::models::CrmObject;
use once_cell::sync::Lazy;
use regex::Regex;

static BOOKING_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)calendly\.com").expect("Failed to compile booking URL regex"));

static BOOKING_TITLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)calendly|quick call|discovery call|15 minute|30 minute|book a time|schedule a call",
    )
    .expect("Failed to compile booking title regex")
});

static BOOKING_LOCATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)calendly|automated|zoom\.us/j/")
        .expect("Failed to compile booking location regex")
});

/// Whether a meeting looks like it was booked through a scheduling link.
pub fn is_automated_booking(object: &CrmObject) -> bool {
    let url_hit = object
        .property(meeting::EXTERNAL_URL)
        .is_some_and(|url| BOOKING_URL_REGEX.is_match(url));
    let title_hit = object
        .property(meeting::TITLE)
        .is_some_and(|title| BOOKING_TITLE_REGEX.is_match(title));
    let location_hit = object
        .property(meeting::LOCATION)
        .is_some_and(|location| BOOKING_LOCATION_REGEX.is_match(location));

    url_hit || title_hit || location_hit
}

/// Drop automated bookings, keeping the order of the rest.
pub fn exclude_automated_bookings(meetings: Vec<CrmObject>) -> Vec<CrmObject> {
    meetings
        .into_iter()
        .filter(|m| {
            let automated = is_automated_booking(m);
            if automated {
                tracing::debug!(meeting_id = %m.id, "Excluding automated booking");
            }
            !automated
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectType;

    fn meeting(id: &str) -> CrmObject {
        CrmObject::new(id, ObjectType::Meeting)
    }

    #[test]
    fn test_detects_booking_indicators() {
        assert!(is_automated_booking(
            &meeting("1").with_property(meeting::EXTERNAL_URL, "https://Calendly.com/acme/30min")
        ));
        assert!(is_automated_booking(
            &meeting("2").with_property(meeting::TITLE, "Discovery Call with Jane")
        ));
        assert!(is_automated_booking(
            &meeting("3").with_property(meeting::LOCATION, "https://zoom.us/j/123456")
        ));
    }

    #[test]
    fn test_regular_meetings_are_kept() {
        let kept = meeting("4")
            .with_property(meeting::TITLE, "Quarterly business review")
            .with_property(meeting::LOCATION, "Head office, room 3");
        assert!(!is_automated_booking(&kept));
        assert!(!is_automated_booking(&meeting("5")));

        let filtered = exclude_automated_bookings(vec![
            meeting("a").with_property(meeting::TITLE, "Book a time: intro"),
            kept,
        ]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "4");
    }
}
