//! Single-image analysis: locate, measure, score, check the SLA.

use std::collections::BTreeMap;
use std::time::Instant;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::scoring::recommendations;
use super::{DocumentLocator, ScoringEngine, SlaEvaluator};
use crate::domain::{
    AnalysisResult, Category, ConfigError, ConfigurationProfile, DocumentMask, Image,
    MetricComputer, MetricInput, MetricResult, ResultMetadata,
};
use crate::modules::MetricRegistry;

/// Runs the full pipeline for one profile.
///
/// Construction validates the profile, so an `Analyzer` always holds a
/// usable configuration. Analysis itself never fails.
pub struct Analyzer {
    profile: ConfigurationProfile,
    locator: DocumentLocator,
    registry: MetricRegistry,
    scoring: ScoringEngine,
    sla: SlaEvaluator,
}

impl Analyzer {
    /// Validates `profile` and builds its computers.
    ///
    /// # Errors
    ///
    /// Returns the first invalid profile field.
    pub fn new(profile: ConfigurationProfile) -> Result<Self, ConfigError> {
        profile.validate()?;
        info!(
            profile = %profile.name,
            categories = profile.categories.enabled().count(),
            sla = profile.sla.enabled,
            "analyzer ready"
        );
        Ok(Self {
            locator: DocumentLocator::new(profile.locator.clone()),
            registry: MetricRegistry::from_profile(&profile),
            scoring: ScoringEngine::new(&profile),
            sla: SlaEvaluator::new(&profile),
            profile,
        })
    }

    /// Turns SLA evaluation on or off.
    #[must_use]
    pub fn with_sla(mut self, enabled: bool) -> Self {
        self.profile.sla.enabled = enabled;
        self.sla = SlaEvaluator::new(&self.profile);
        self
    }

    /// Replaces the computer for its category.
    #[must_use]
    pub fn with_computer(mut self, computer: Box<dyn MetricComputer>) -> Self {
        self.registry.register(computer);
        self
    }

    /// Profile in use.
    #[must_use]
    pub const fn profile(&self) -> &ConfigurationProfile {
        &self.profile
    }

    /// Registered computers.
    #[must_use]
    pub const fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// SLA evaluator in use.
    #[must_use]
    pub const fn sla(&self) -> &SlaEvaluator {
        &self.sla
    }

    /// Analyzes one image.
    #[instrument(skip_all, fields(source = %image.source_id))]
    pub fn analyze(&self, image: &Image) -> AnalysisResult {
        let mask = self.locator.locate(image);
        let metrics = self.registry.run(&MetricInput {
            image,
            mask: &mask,
        });
        self.assemble(image, &mask, metrics)
    }

    /// Analyzes one image unless `deadline` passes first.
    ///
    /// The deadline is checked between computers, so one slow computer can
    /// overrun it. Returns `None` when it was missed.
    #[instrument(skip_all, fields(source = %image.source_id))]
    pub fn analyze_until(&self, image: &Image, deadline: Instant) -> Option<AnalysisResult> {
        let mask = self.locator.locate(image);
        if Instant::now() >= deadline {
            return None;
        }
        let metrics = self.registry.run_until(
            &MetricInput {
                image,
                mask: &mask,
            },
            deadline,
        )?;
        Some(self.assemble(image, &mask, metrics))
    }

    fn assemble(
        &self,
        image: &Image,
        mask: &DocumentMask,
        metrics: BTreeMap<Category, MetricResult>,
    ) -> AnalysisResult {
        let global = self.scoring.score(&metrics);
        let sla = self.sla.section(&global, &metrics);
        debug!(
            score = global.score,
            stars = global.stars,
            status = %global.status,
            "analysis complete"
        );

        let metadata = &image.metadata;
        AnalysisResult {
            metadata: ResultMetadata {
                source_id: image.source_id.clone(),
                timestamp: iso_timestamp(),
                profile_name: self.profile.name.clone(),
                width: image.width,
                height: image.height,
                format: metadata.format,
                dpi: metadata.dpi,
                bit_depth: metadata.bit_depth,
                document_bbox: mask.bbox(),
            },
            global,
            recommendations: recommendations(&metrics),
            metrics,
            sla,
        }
    }
}

/// Current UTC time in RFC 3339 format.
pub(crate) fn iso_timestamp() -> String {
    match OffsetDateTime::now_utc().format(&Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
