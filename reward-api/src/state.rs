use reward_engine::LifecycleEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: LifecycleEngine,
    pub version: &'static str,
}

impl AppState {
    pub fn new(engine: LifecycleEngine) -> Self {
        Self {
            engine,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
