use crate::core::intake::IntakeForm;
use crate::domain::model::AnalysisResult;
use crate::domain::ports::AnalysisService;
use crate::utils::error::GENERIC_FAILURE_MESSAGE;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 一次送出的結果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed(AnalysisResult),
    Failed(String),
    /// 已有請求進行中，送出按鈕處於停用狀態
    Busy,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    result: Option<AnalysisResult>,
    error: Option<String>,
}

/// Intake page state: at most one submission in flight, last result or
/// last error kept for display.
pub struct IntakeSession<S: AnalysisService> {
    service: S,
    loading: AtomicBool,
    state: Mutex<SessionState>,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: AnalysisService> IntakeSession<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            loading: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.state.lock().ok().and_then(|s| s.result.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.error.clone())
    }

    fn set_state(&self, result: Option<AnalysisResult>, error: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.result = result;
            state.error = error;
        }
    }

    pub async fn submit(&self, form: &IntakeForm) -> SubmitOutcome {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Submission ignored, another one is in flight");
            return SubmitOutcome::Busy;
        }
        let _guard = LoadingGuard(&self.loading);

        self.set_state(None, None);

        let request = match form.to_request() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("❌ Intake form rejected: {}", e);
                let message = e.user_friendly_message();
                self.set_state(None, Some(message.clone()));
                return SubmitOutcome::Failed(message);
            }
        };

        tracing::debug!("Submitting intake: {:?}", request);

        match self.service.analyze(&request).await {
            Ok(result) => {
                tracing::info!(
                    "✅ Treatment plan received ({} differential diagnoses, {} citations)",
                    result.differential_diagnosis.len(),
                    result.citations.len()
                );
                self.set_state(Some(result.clone()), None);
                SubmitOutcome::Completed(result)
            }
            Err(e) => {
                tracing::error!(
                    "❌ Analysis request failed: {} (Category: {:?})",
                    e,
                    e.category()
                );
                self.set_state(None, Some(GENERIC_FAILURE_MESSAGE.to_string()));
                SubmitOutcome::Failed(GENERIC_FAILURE_MESSAGE.to_string())
            }
        }
    }
}
