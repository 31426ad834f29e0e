use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info_span, warn};

use crate::db::detection_repo::{self, NewDetection};
use crate::db::photo_repo::{self, ProcessedStatus};
use crate::db::{artwork_repo, Database};
use crate::worker::job::JobResult;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};
use super::sampler::DetectionSampler;

pub struct DetectionPipeline {
    db: Database,
    config: Arc<PipelineConfig>,
    sampler: Mutex<DetectionSampler>,
}

impl DetectionPipeline {
    /// Production constructor, sampler seeded from config.
    pub fn from_config(db: Database, config: Arc<PipelineConfig>) -> Self {
        let sampler = DetectionSampler::from_seed(config.rng_seed, config.max_detections);
        Self::new(db, config, sampler)
    }

    /// Constructor with an injected sampler.
    pub fn new(db: Database, config: Arc<PipelineConfig>, sampler: DetectionSampler) -> Self {
        Self {
            db,
            config,
            sampler: Mutex::new(sampler),
        }
    }

    /// Run detection for a single photo.
    /// Returns a (JobResult, PipelineContext) pair.
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, PipelineContext) {
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.job_id,
            installation_photo_id = ctx.job.installation_photo_id,
        )
        .entered();

        match self.run_steps(&mut ctx, progress) {
            Ok(()) => {
                let message = format!("Successfully detected {} artworks", ctx.detection_ids.len());
                progress.report(ProgressEvent::Completed {
                    message: message.clone(),
                });
                let result = JobResult::success(&ctx.job, ctx.detection_ids.clone(), message);
                (result, ctx)
            }
            Err(e) => {
                let err_msg = e.to_string();
                warn!("Detection failed: {}", err_msg);
                progress.report(ProgressEvent::Failed {
                    error: err_msg.clone(),
                });
                self.mark_photo_failed(ctx.job.installation_photo_id);
                (JobResult::failure(&ctx.job, err_msg), ctx)
            }
        }
    }

    fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        // Step 1: Analyze image
        {
            let _step = info_span!("analyze_image").entered();
            progress.report(ProgressEvent::Checkpoint {
                progress: 10,
                message: "Downloading and analyzing image...".to_string(),
            });
            self.step_mark_processing(ctx)?;
            if !self.config.processing_delay.is_zero() {
                std::thread::sleep(self.config.processing_delay);
            }
        }

        // Step 2: Load candidates and detect
        {
            let _step = info_span!("detect_artworks").entered();
            progress.report(ProgressEvent::Checkpoint {
                progress: 50,
                message: "Detecting artworks in image...".to_string(),
            });
            self.step_load_candidates(ctx)?;
            self.step_detect(ctx);
        }

        // Step 3: Persist detections and complete the photo
        {
            let _step = info_span!("store_detections").entered();
            progress.report(ProgressEvent::Checkpoint {
                progress: 80,
                message: "Creating detection records...".to_string(),
            });
            self.step_store_detections(ctx)?;
        }

        Ok(())
    }

    fn step_mark_processing(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        let photo_id = ctx.job.installation_photo_id;
        let found = self
            .db
            .with_conn(|conn| photo_repo::update_status(conn, photo_id, ProcessedStatus::Processing))?;
        if !found {
            return Err(PipelineError::PhotoMissing(photo_id));
        }
        Ok(())
    }

    fn step_load_candidates(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let limit = self.config.candidate_limit;
        let candidates = self
            .db
            .with_conn(|conn| artwork_repo::list(conn, Some(limit)))?;
        if candidates.is_empty() {
            return Err(PipelineError::NoCandidates);
        }
        debug!("Loaded {} candidate artworks", candidates.len());
        ctx.candidates = candidates;
        Ok(())
    }

    fn step_detect(&self, ctx: &mut PipelineContext) {
        ctx.detections = self.sampler().sample(&ctx.candidates);
        debug!("Synthesized {} detections", ctx.detections.len());
    }

    fn step_store_detections(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let photo_id = ctx.job.installation_photo_id;
        let detections = &ctx.detections;

        let ids = self.db.with_transaction(|tx| {
            let mut ids = Vec::with_capacity(detections.len());
            for detection in detections {
                let id = detection_repo::insert(
                    tx,
                    &NewDetection {
                        installation_photo_id: photo_id,
                        artwork_id: detection.artwork_id,
                        confidence_score: detection.confidence_score,
                        bounding_box: Some(detection.bounding_box),
                    },
                )?;
                ids.push(id);
            }
            if !photo_repo::update_status(tx, photo_id, ProcessedStatus::Completed)? {
                return Err(PipelineError::PhotoMissing(photo_id));
            }
            Ok::<_, PipelineError>(ids)
        })?;

        ctx.detection_ids = ids;
        Ok(())
    }

    /// Best-effort: a failure here is logged, never raised.
    fn mark_photo_failed(&self, photo_id: i64) {
        let result = self
            .db
            .with_conn(|conn| photo_repo::update_status(conn, photo_id, ProcessedStatus::Failed));
        if let Err(e) = result {
            warn!("Failed to mark photo {} as failed: {}", photo_id, e);
        }
    }

    fn sampler(&self) -> MutexGuard<'_, DetectionSampler> {
        match self.sampler.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Detection sampler lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
