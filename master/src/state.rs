// master/src/state.rs

use common::{PlanId, SplitPlanInfo};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Clone, Default)]
pub struct AppState {
    // planes ya calculados, por id
    pub plans: Arc<Mutex<HashMap<PlanId, SplitPlanInfo>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
