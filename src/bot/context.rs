use std::sync::Arc;

use crate::database::Stores;
use crate::questionnaire::QuestionnaireEngine;
use crate::services::calendar::CalendarSource;
use crate::services::timezone::TimezoneResolver;

/// Everything the handlers need, injected once into the dispatcher.
pub struct AppContext {
    pub engine: QuestionnaireEngine,
    pub stores: Stores,
    pub calendar: Arc<dyn CalendarSource>,
    pub timezone_resolver: Arc<dyn TimezoneResolver>,
    pub materials_url: Option<String>,
    pub upcoming_days: i64,
}
