//! HubSpot property names, grouped by object type.
//!
//! Each module's `KNOWN` slice is the declared property set for that type;
//! anything else the API returns is kept in the object's extra bag.

/// Properties shared by every engagement object.
pub mod common {
    pub const TIMESTAMP: &str = "hs_timestamp";
    pub const OWNER_ID: &str = "hubspot_owner_id";
    pub const CREATE_DATE: &str = "hs_createdate";
    pub const LAST_MODIFIED: &str = "hs_lastmodifieddate";
    pub const OBJECT_ID: &str = "hs_object_id";
}

pub mod meeting {
    use super::common;

    pub const TITLE: &str = "hs_meeting_title";
    pub const BODY: &str = "hs_meeting_body";
    pub const START_TIME: &str = "hs_meeting_start_time";
    pub const END_TIME: &str = "hs_meeting_end_time";
    pub const OUTCOME: &str = "hs_meeting_outcome";
    pub const LOCATION: &str = "hs_meeting_location";
    pub const EXTERNAL_URL: &str = "hs_meeting_external_url";
    pub const ACTIVITY_TYPE: &str = "hs_activity_type";
    pub const INTERNAL_NOTES: &str = "hs_internal_meeting_notes";

    pub const KNOWN: &[&str] = &[
        TITLE,
        BODY,
        START_TIME,
        END_TIME,
        OUTCOME,
        LOCATION,
        EXTERNAL_URL,
        ACTIVITY_TYPE,
        INTERNAL_NOTES,
        common::TIMESTAMP,
        common::OWNER_ID,
        common::CREATE_DATE,
        common::LAST_MODIFIED,
        common::OBJECT_ID,
    ];
}

pub mod task {
    use super::common;

    pub const SUBJECT: &str = "hs_task_subject";
    pub const BODY: &str = "hs_task_body";
    pub const STATUS: &str = "hs_task_status";
    pub const PRIORITY: &str = "hs_task_priority";
    pub const TYPE: &str = "hs_task_type";

    pub const KNOWN: &[&str] = &[
        SUBJECT,
        BODY,
        STATUS,
        PRIORITY,
        TYPE,
        common::TIMESTAMP,
        common::OWNER_ID,
        common::CREATE_DATE,
        common::LAST_MODIFIED,
        common::OBJECT_ID,
    ];
}

pub mod note {
    use super::common;

    pub const BODY: &str = "hs_note_body";

    pub const KNOWN: &[&str] = &[
        BODY,
        common::TIMESTAMP,
        common::OWNER_ID,
        common::CREATE_DATE,
        common::LAST_MODIFIED,
        common::OBJECT_ID,
    ];
}

pub mod deal {
    use super::common;

    pub const NAME: &str = "dealname";
    pub const STAGE: &str = "dealstage";
    pub const AMOUNT: &str = "amount";
    pub const CLOSE_DATE: &str = "closedate";
    pub const PIPELINE: &str = "pipeline";

    pub const KNOWN: &[&str] = &[
        NAME,
        STAGE,
        AMOUNT,
        CLOSE_DATE,
        PIPELINE,
        common::OWNER_ID,
        common::CREATE_DATE,
        common::LAST_MODIFIED,
        common::OBJECT_ID,
    ];
}

pub mod contact {
    use super::common;

    pub const FIRST_NAME: &str = "firstname";
    pub const LAST_NAME: &str = "lastname";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const COMPANY: &str = "company";

    pub const KNOWN: &[&str] = &[
        FIRST_NAME,
        LAST_NAME,
        EMAIL,
        PHONE,
        COMPANY,
        common::OWNER_ID,
        common::CREATE_DATE,
        common::LAST_MODIFIED,
        common::OBJECT_ID,
    ];
}
