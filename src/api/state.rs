use std::sync::Arc;

use crate::scheduler::{Dispatcher, ScheduleCalculator};
use crate::storage::ResultStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ResultStore>,
    pub calculator: Arc<ScheduleCalculator>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(calculator: ScheduleCalculator, dispatcher: Dispatcher) -> Self {
        Self {
            store: dispatcher.store().clone(),
            calculator: Arc::new(calculator),
            dispatcher: Arc::new(dispatcher),
        }
    }
}
