pub mod prompt;
pub mod response;
pub mod types;

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::environment::{get_env_millis, get_env_secs, get_env_var_as_vec, get_env_var_or};
use crate::llm::{ClassificationBackend, CompletionRequest};
use crate::taxonomy::{LocalMatchKind, Taxonomy, TaxonomyNode};
use crate::TARGET_CLASSIFIER;

use prompt::level_choice_prompt;
use response::parse_level_decision;
pub use types::{clamp_confidence, ClassificationResult, PathSource};

/// Confidence of an exact local name match.
pub const LOCAL_EXACT_CONFIDENCE: f64 = 1.0;
/// Confidence of a local match where a leaf name is contained in the item name.
pub const LOCAL_SUBSTRING_CONFIDENCE: f64 = 0.9;

/// `base * 2^attempt`, saturating.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Tuning for `HierarchicalClassifier`.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    // Models to try, highest priority first
    pub models: Vec<String>,
    pub temperature: f32,
    // Substituted when the model omits its confidence
    pub default_confidence: f64,
    // Retries per model after the first attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub fallback_code: String,
    pub fallback_name: String,
    pub fallback_confidence: f64,
    // Guards against cyclic or absurdly deep trees
    pub max_depth: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            temperature: 0.0,
            default_confidence: 0.5,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
            fallback_code: "UNCLASSIFIED".to_string(),
            fallback_name: "Unclassified".to_string(),
            fallback_confidence: 0.1,
            max_depth: 8,
        }
    }
}

impl ClassifierConfig {
    /// Reads `CLASSIFIER_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            models: get_env_var_as_vec("CLASSIFIER_MODELS", ','),
            temperature: get_env_var_or("CLASSIFIER_TEMPERATURE", defaults.temperature),
            default_confidence: get_env_var_or(
                "CLASSIFIER_DEFAULT_CONFIDENCE",
                defaults.default_confidence,
            ),
            max_retries: get_env_var_or("CLASSIFIER_MAX_RETRIES", defaults.max_retries),
            retry_delay: get_env_millis("CLASSIFIER_RETRY_DELAY_MS", 500),
            request_timeout: get_env_secs("CLASSIFIER_REQUEST_TIMEOUT_SECS", 60),
            fallback_code: std::env::var("CLASSIFIER_FALLBACK_CODE")
                .unwrap_or(defaults.fallback_code),
            fallback_name: std::env::var("CLASSIFIER_FALLBACK_NAME")
                .unwrap_or(defaults.fallback_name),
            fallback_confidence: get_env_var_or(
                "CLASSIFIER_FALLBACK_CONFIDENCE",
                defaults.fallback_confidence,
            ),
            max_depth: defaults.max_depth,
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Reorders the configured models by a benchmark ranking. Ranked models come
    /// first in rank order; unranked ones keep their relative order after them.
    pub fn apply_priorities(&mut self, ranked: &[String]) {
        let mut ordered: Vec<String> = ranked
            .iter()
            .filter(|model| self.models.contains(model))
            .cloned()
            .collect();
        for model in &self.models {
            if !ordered.contains(model) {
                ordered.push(model.clone());
            }
        }
        self.models = ordered;
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("default_confidence", self.default_confidence),
            ("fallback_confidence", self.fallback_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if self.fallback_code.trim().is_empty() {
            bail!("fallback_code must not be empty");
        }
        if self.max_depth == 0 {
            bail!("max_depth must be at least 1");
        }
        Ok(())
    }
}

/// Walks the taxonomy tree, resolving locally where it can and asking a model
/// one level at a time where it cannot.
#[derive(Clone)]
pub struct HierarchicalClassifier {
    taxonomy: Arc<Taxonomy>,
    backend: Arc<dyn ClassificationBackend>,
    config: ClassifierConfig,
}

impl HierarchicalClassifier {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        backend: Arc<dyn ClassificationBackend>,
        config: ClassifierConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            taxonomy,
            backend,
            config,
        })
    }

    /// Classifies an item. Never fails: local match, then each configured model
    /// with retries and exponential backoff, then the fallback leaf.
    pub async fn classify(&self, item_name: &str, category_hint: &str) -> ClassificationResult {
        if let Some(result) = self.classify_local(item_name, category_hint) {
            debug!(target: TARGET_CLASSIFIER, "'{}' resolved locally to {}", item_name, result.code);
            return result;
        }

        for model in &self.config.models {
            let attempts = self.config.max_retries.saturating_add(1);
            for attempt in 0..attempts {
                match self
                    .classify_with_model(item_name, category_hint, model)
                    .await
                {
                    Ok(result) => {
                        info!(target: TARGET_CLASSIFIER, "[{}] '{}' classified as {} ({:.2})", model, item_name, result.code, result.confidence);
                        return result;
                    }
                    Err(e) => {
                        warn!(target: TARGET_CLASSIFIER, "[{}] attempt {}/{} for '{}' failed: {}", model, attempt + 1, attempts, item_name, e);
                        if attempt + 1 < attempts {
                            let backoff = backoff_delay(self.config.retry_delay, attempt);
                            debug!(target: TARGET_CLASSIFIER, "[{}] backing off for {:?}", model, backoff);
                            sleep(backoff).await;
                        }
                    }
                }
            }
        }

        warn!(target: TARGET_CLASSIFIER, "'{}' falls back to {}", item_name, self.config.fallback_code);
        self.fallback()
    }

    /// Local resolution only, restricted to the hinted branch when the hint names one.
    pub fn classify_local(&self, item_name: &str, category_hint: &str) -> Option<ClassificationResult> {
        let within = self
            .taxonomy
            .find_branch(category_hint)
            .map(|branch| branch.code.clone());
        let found = self.taxonomy.resolve_local(item_name, within.as_deref())?;
        let confidence = match found.kind {
            LocalMatchKind::Exact => LOCAL_EXACT_CONFIDENCE,
            LocalMatchKind::Substring => LOCAL_SUBSTRING_CONFIDENCE,
        };
        Some(ClassificationResult::new(
            &found.code,
            &found.name,
            confidence,
            PathSource::Local,
        ))
    }

    /// One un-retried AI descent with a single model. Any timeout, backend error,
    /// unparseable reply, decline or unknown code is returned as an error.
    pub async fn classify_with_model(
        &self,
        item_name: &str,
        category_hint: &str,
        model: &str,
    ) -> Result<ClassificationResult> {
        let start = self.taxonomy.find_branch(category_hint);
        let mut path: Vec<&TaxonomyNode> = start.into_iter().collect();
        let mut candidates: &[TaxonomyNode] = match start {
            Some(branch) => &branch.children,
            None => self.taxonomy.roots(),
        };
        let mut confidence: f64 = 1.0;

        for _ in 0..self.config.max_depth {
            let chosen = match candidates {
                [] => bail!("taxonomy level has no candidates"),
                // Nothing to decide
                [only] => only,
                _ => {
                    let (node, level_confidence) = self
                        .choose_level(item_name, category_hint, model, &path, candidates)
                        .await?;
                    confidence = confidence.min(level_confidence);
                    node
                }
            };

            if chosen.is_leaf() {
                return Ok(ClassificationResult::new(
                    &chosen.code,
                    &chosen.name,
                    confidence,
                    PathSource::Ai,
                )
                .with_model(model));
            }
            path.push(chosen);
            candidates = &chosen.children;
        }

        Err(anyhow!(
            "no leaf reached within {} levels",
            self.config.max_depth
        ))
    }

    async fn choose_level<'t>(
        &self,
        item_name: &str,
        category_hint: &str,
        model: &str,
        path: &[&TaxonomyNode],
        candidates: &'t [TaxonomyNode],
    ) -> Result<(&'t TaxonomyNode, f64)> {
        let prompt = level_choice_prompt(item_name, category_hint, path, candidates);
        let request = CompletionRequest {
            model,
            prompt: &prompt,
            temperature: self.config.temperature,
        };

        let raw = match timeout(self.config.request_timeout, self.backend.complete(request)).await
        {
            Ok(result) => result?,
            Err(_) => bail!("request timed out after {:?}", self.config.request_timeout),
        };

        let decision = parse_level_decision(&raw)?;
        let code = decision
            .code
            .ok_or_else(|| anyhow!("model declined to choose a category"))?;
        let node = candidates
            .iter()
            .find(|node| node.code == code)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|node| node.name.eq_ignore_ascii_case(&code))
            })
            .ok_or_else(|| anyhow!("model chose unknown category '{}'", code))?;

        let confidence = match decision.confidence {
            Some(value) => clamp_confidence(value, self.config.default_confidence),
            None => self.config.default_confidence,
        };

        debug!(target: TARGET_CLASSIFIER, "[{}] '{}' -> {} {} ({:.2})", model, item_name, node.code, node.name, confidence);
        Ok((node, confidence))
    }

    pub fn fallback(&self) -> ClassificationResult {
        ClassificationResult::new(
            &self.config.fallback_code,
            &self.config.fallback_name,
            self.config.fallback_confidence,
            PathSource::Fallback,
        )
    }
}
