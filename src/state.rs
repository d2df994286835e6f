use crate::config::Config;
use crate::notify::Dispatcher;
use crate::observability::metrics::Metrics;
use crate::store::OrderStore;

pub struct AppState {
    pub orders: OrderStore,
    pub dispatcher: Dispatcher,
    pub metrics: Metrics,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            orders: OrderStore::new(),
            dispatcher: Dispatcher::new(config.event_buffer_size),
            metrics: Metrics::new(),
            default_page_limit: config.default_page_limit,
            max_page_limit: config.max_page_limit,
        }
    }
}
