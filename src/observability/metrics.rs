use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounterVec,
    pub claims_total: IntCounterVec,
    pub transitions_total: IntCounterVec,
    pub orders_delivered_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total = IntCounterVec::new(
            Opts::new("orders_created_total", "Orders created by kind"),
            &["kind"],
        )
        .expect("valid orders_created_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Status transitions by action and outcome"),
            &["action", "outcome"],
        )
        .expect("valid transitions_total metric");

        let orders_delivered_total = IntCounterVec::new(
            Opts::new("orders_delivered_total", "Delivered orders by payment mode"),
            &["cod"],
        )
        .expect("valid orders_delivered_total metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(orders_delivered_total.clone()))
            .expect("register orders_delivered_total");

        Self {
            registry,
            orders_created_total,
            claims_total,
            transitions_total,
            orders_delivered_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
