use serde_json::{Map, Value};

/// Caller-supplied receiver of protocol events in `custom` listen mode.
pub trait EventListener: Send + Sync {
    fn fire(&self, event: &str, parameters: &Map<String, Value>, message: &str);
}

impl<F> EventListener for F
where
    F: Fn(&str, &Map<String, Value>, &str) + Send + Sync,
{
    fn fire(&self, event: &str, parameters: &Map<String, Value>, message: &str) {
        self(event, parameters, message)
    }
}
