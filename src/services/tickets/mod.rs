pub mod archive_message_db;
pub mod auto_close_db;
pub mod category_update_queue;
pub mod claim_db;
pub mod close_reason_db;
pub mod close_request_db;
pub mod exit_survey_db;
pub mod first_response_db;
pub mod last_message_db;
pub mod participant_db;
pub mod service_rating_db;
pub mod ticket_db;
pub mod webhook_db;

/// `tickets` first, every other table here references it
pub const SCHEMAS: &[&str] = &[
    ticket_db::SCHEMA,
    participant_db::SCHEMA,
    claim_db::SCHEMA,
    last_message_db::SCHEMA,
    close_reason_db::SCHEMA,
    close_request_db::SCHEMA,
    auto_close_db::SCHEMA,
    service_rating_db::SCHEMA,
    webhook_db::SCHEMA,
    archive_message_db::SCHEMA,
    exit_survey_db::SCHEMA,
    first_response_db::SCHEMA,
    category_update_queue::SCHEMA,
];
