//! Scripted model backend and fixtures shared by unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::{ClassifierConfig, HierarchicalClassifier};
use crate::llm::{ClassificationBackend, CompletionRequest};
use crate::taxonomy::{Taxonomy, TaxonomyNode};

/// What the scripted backend does for one request.
pub struct Reply {
    pub delay: Duration,
    pub outcome: Result<String, String>,
}

impl Reply {
    pub fn json(code: &str, confidence: f64) -> Self {
        Reply {
            delay: Duration::ZERO,
            outcome: Ok(format!(r#"{{"code": "{}", "confidence": {}}}"#, code, confidence)),
        }
    }

    pub fn text(body: &str) -> Self {
        Reply {
            delay: Duration::ZERO,
            outcome: Ok(body.to_string()),
        }
    }

    pub fn error(message: &str) -> Self {
        Reply {
            delay: Duration::ZERO,
            outcome: Err(message.to_string()),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Script = dyn Fn(&CompletionRequest<'_>, usize) -> Reply + Send + Sync;

/// Backend answering from a closure that sees the request and the call number.
pub struct ScriptedBackend {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest<'_>, usize) -> Reply + Send + Sync + 'static,
    {
        Arc::new(ScriptedBackend {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.script)(&request, call);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.outcome.map_err(|message| anyhow!(message))
    }
}

/// Two-level hardware/electrical tree.
pub fn hardware_taxonomy() -> Arc<Taxonomy> {
    Arc::new(
        Taxonomy::new(vec![
            TaxonomyNode::branch(
                "01",
                "Fasteners",
                vec![
                    TaxonomyNode::leaf("01.01", "Bolts"),
                    TaxonomyNode::leaf("01.02", "Nuts"),
                    TaxonomyNode::leaf("01.03", "Washers"),
                ],
            ),
            TaxonomyNode::branch(
                "02",
                "Electrical",
                vec![
                    TaxonomyNode::leaf("02.01", "Power cable"),
                    TaxonomyNode::leaf("02.02", "Switches"),
                ],
            ),
        ])
        .expect("valid taxonomy"),
    )
}

/// Single-level tree: every answer is one model call.
pub fn flat_taxonomy() -> Arc<Taxonomy> {
    Arc::new(
        Taxonomy::new(vec![
            TaxonomyNode::leaf("10", "Threaded fasteners"),
            TaxonomyNode::leaf("20", "Hand tools"),
        ])
        .expect("valid taxonomy"),
    )
}

pub fn test_config(models: &[&str]) -> ClassifierConfig {
    ClassifierConfig {
        models: models.iter().map(|m| m.to_string()).collect(),
        retry_delay: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
        ..ClassifierConfig::default()
    }
}

pub fn classifier_with(
    taxonomy: Arc<Taxonomy>,
    backend: Arc<ScriptedBackend>,
    config: ClassifierConfig,
) -> HierarchicalClassifier {
    HierarchicalClassifier::new(taxonomy, backend, config).expect("valid classifier")
}
