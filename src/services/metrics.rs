use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, CounterVec, Gauge};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref UPLOADS_COUNTER: CounterVec = register_counter_vec!(
        "api_uploads_total",
        "Stored uploads by kind (gallery, trip, profile)",
        &["kind"]
    ).unwrap();

    pub static ref EMAILS_COUNTER: CounterVec = register_counter_vec!(
        "api_emails_sent_total",
        "Transactional emails by purpose",
        &["purpose"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref FAMILY_MEMBERS_GAUGE: Gauge = register_gauge!(
        "family_members_total",
        "Family members on record, refreshed whenever the member list is read"
    ).unwrap();
}

/// Prometheus text exposition of every registered metric.
pub fn render() -> anyhow::Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
