//! Extension point for providers whose search protocol needs more than one
//! request/response round trip per logical query (e.g. a search step
//! followed by a separate fetch-by-id step). Not wired to any live
//! provider — the built-in registry's providers all fit the single-step
//! [`crate::search_coordinator::SearchCoordinator`] contract.

use async_trait::async_trait;

use crate::response::{APIResponse, SearchResult, SearchResultList};
use crate::search_coordinator::SearchCoordinator;

/// What a [`Workflow`] wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue { page: u32 },
    Stop,
}

/// Carries one step's outcome plus whatever state the workflow needs to
/// thread into the next step's decision (e.g. an id extracted from step 1's
/// response, used to build step 2's request).
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    pub step_number: u32,
    pub response: Option<APIResponse>,
    pub state: indexmap::IndexMap<String, serde_json::Value>,
}

impl StepContext {
    pub fn initial() -> Self {
        Self::default()
    }
}

/// A multi-step search protocol against one [`SearchCoordinator`].
///
/// [`Self::execute`] drives the loop: `pre_transform` decides whether to
/// continue (and which page to request next) or stop, `run_step` performs
/// that request and folds its result into the context, and `merge` turns
/// the full step history into a [`SearchResultList`] once the loop stops.
#[async_trait]
pub trait Workflow: Send + Sync {
    fn pre_transform(&self, ctx: &StepContext) -> Step;

    async fn run_step(&self, step_number: u32, page: u32, coordinator: &SearchCoordinator, ctx: StepContext) -> StepContext;

    fn merge(&self, history: Vec<StepContext>) -> SearchResultList;

    async fn execute(&self, coordinator: &SearchCoordinator) -> SearchResultList {
        let mut history = Vec::new();
        let mut ctx = StepContext::initial();
        loop {
            let page = match self.pre_transform(&ctx) {
                Step::Stop => break,
                Step::Continue { page } => page,
            };
            ctx = self.run_step(ctx.step_number + 1, page, coordinator, ctx).await;
            history.push(ctx.clone());
        }
        self.merge(history)
    }
}

/// A two-step workflow: fetch page 1, then page 2, then stop. Exercises the
/// [`Workflow`] contract without encoding any real provider's protocol.
pub struct TwoPageWorkflow;

#[async_trait]
impl Workflow for TwoPageWorkflow {
    fn pre_transform(&self, ctx: &StepContext) -> Step {
        match ctx.step_number {
            0 => Step::Continue { page: 1 },
            1 => Step::Continue { page: 2 },
            _ => Step::Stop,
        }
    }

    async fn run_step(&self, step_number: u32, page: u32, coordinator: &SearchCoordinator, mut ctx: StepContext) -> StepContext {
        let result = coordinator.search(page).await;
        ctx.step_number = step_number;
        ctx.response = Some(result.response);
        ctx
    }

    fn merge(&self, history: Vec<StepContext>) -> SearchResultList {
        let mut out = SearchResultList::new();
        for (index, ctx) in history.into_iter().enumerate() {
            if let Some(response) = ctx.response {
                out.push(SearchResult {
                    page: (index + 1) as u32,
                    query: String::new(),
                    provider_name: String::new(),
                    response,
                });
            }
        }
        out
    }
}
