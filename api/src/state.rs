use crate::config::LlmSettings;

#[derive(Clone)]
pub struct AppState {
    pub llm: LlmSettings,
}
