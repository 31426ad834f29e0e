/// Work item: detect artworks in one installation photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoJob {
    pub job_id: String,
    pub installation_photo_id: i64,
}

impl PhotoJob {
    pub fn new(job_id: &str, installation_photo_id: i64) -> Self {
        Self {
            job_id: job_id.to_string(),
            installation_photo_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub installation_photo_id: i64,
    pub success: bool,
    pub detection_ids: Vec<i64>,
    pub message: String,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job: &PhotoJob, detection_ids: Vec<i64>, message: String) -> Self {
        Self {
            job_id: job.job_id.clone(),
            installation_photo_id: job.installation_photo_id,
            success: true,
            detection_ids,
            message,
            error: None,
        }
    }

    pub fn failure(job: &PhotoJob, error: String) -> Self {
        Self {
            job_id: job.job_id.clone(),
            installation_photo_id: job.installation_photo_id,
            success: false,
            detection_ids: Vec::new(),
            message: "Processing failed".to_string(),
            error: Some(error),
        }
    }
}
