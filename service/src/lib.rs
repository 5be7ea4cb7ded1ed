use config::Config;
use relay::Dispatcher;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state containing only infrastructure concerns.
// Needs to implement Clone to be able to be passed into Router as State.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, dispatcher: &Arc<Dispatcher>) -> Self {
        Self {
            dispatcher: Arc::clone(dispatcher),
            config: app_config,
        }
    }

    pub fn dispatcher_ref(&self) -> &Dispatcher {
        self.dispatcher.as_ref()
    }
}
