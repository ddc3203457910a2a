//! Background generation pipeline: mark processing, generate (real upstream
//! or deterministic mock), persist the image, then mark completed/failed.
//! Worker failures never propagate to the request that spawned the task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use tracing::{error, info};
use uuid::Uuid;

use models::task;

use crate::errors::ServiceError;
use crate::generator::GeneratorClient;
use crate::images::ImageStore;
use crate::tasks;

const MOCK_IMAGE_BYTES: &[u8] = b"mock image data";
const MOCK_DELAY: Duration = Duration::from_millis(500);

/// Everything the pipeline needs, cloneable into spawned tasks.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: DatabaseConnection,
    pub generator: Arc<GeneratorClient>,
    pub images: Arc<ImageStore>,
}

/// Fire-and-forget entry used by the generate handlers.
pub fn spawn(ctx: WorkerContext, task_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = process_task(&ctx, task_id).await {
            error!(%task_id, error = %e, "generation task failed");
        }
    });
}

/// Drive one task through the pipeline. Also called synchronously by the CLI.
pub async fn process_task(ctx: &WorkerContext, task_id: Uuid) -> Result<task::Model, ServiceError> {
    let started = Instant::now();
    let found = tasks::get_task(&ctx.db, task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("task"))?;
    if !found.status()?.can_process() {
        return Err(ServiceError::Validation(format!(
            "task {task_id} is not pending (status: {})",
            found.status
        )));
    }

    tasks::mark_processing(&ctx.db, task_id).await?;

    let outcome = run_pipeline(ctx, &found).await;
    match outcome {
        Ok(image_url) => {
            let updated = tasks::mark_completed(&ctx.db, task_id, image_url).await?;
            info!(%task_id, elapsed_ms = started.elapsed().as_millis() as u64, "image generation completed");
            Ok(updated)
        }
        Err(e) => {
            let msg = e.to_string();
            tasks::mark_failed(&ctx.db, task_id, msg.clone()).await?;
            Err(ServiceError::Upstream(msg))
        }
    }
}

async fn run_pipeline(ctx: &WorkerContext, t: &task::Model) -> Result<String, ServiceError> {
    let generator = resolve_generator(ctx, t).await?;
    if !generator.is_configured() {
        // No upstream key: produce a deterministic placeholder so the rest of
        // the flow (storage, URLs, status) behaves exactly like production.
        tokio::time::sleep(MOCK_DELAY).await;
        let filename = mock_filename(&t.prompt);
        ctx.images.save_bytes_as(MOCK_IMAGE_BYTES, &filename).await?;
        return Ok(ctx.images.public_url(&filename));
    }

    let generated = generator
        .generate(&t.prompt, t.width, t.height, t.style.as_deref())
        .await?;
    let filename = ctx.images.save_from_url(&generated.url).await?;
    Ok(ctx.images.public_url(&filename))
}

/// Tasks pinned to a model_config get a transient client for that endpoint;
/// everything else uses the shared one.
async fn resolve_generator(ctx: &WorkerContext, t: &task::Model) -> Result<Arc<GeneratorClient>, ServiceError> {
    let Some(mc_id) = t.model_config_id else {
        return Ok(Arc::clone(&ctx.generator));
    };
    let mc = models::model_config::find_active(&ctx.db, mc_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("model config"))?;
    let cfg = configs::GeneratorConfig {
        api_key: mc.api_key,
        api_base_url: mc.api_base_url,
        model: mc.model,
        ..configs::GeneratorConfig::default()
    };
    let client = GeneratorClient::from_config(&cfg)
        .map_err(|e| ServiceError::Upstream(e.to_string()))?;
    Ok(Arc::new(client))
}

fn mock_filename(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("mock_{}.jpg", &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_filename_is_deterministic() {
        assert_eq!(mock_filename("a cat"), mock_filename("a cat"));
        assert_ne!(mock_filename("a cat"), mock_filename("a dog"));
        assert!(mock_filename("a cat").starts_with("mock_"));
        assert!(mock_filename("a cat").ends_with(".jpg"));
    }

    #[tokio::test]
    async fn mock_pipeline_completes_a_task() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = match crate::test_support::get_db().await {
            Ok(db) => db,
            Err(e) => {
                eprintln!("skip: {}", e);
                return Ok(());
            }
        };

        let dir = tempfile::tempdir()?;
        let storage = configs::StorageConfig {
            image_dir: dir.path().to_string_lossy().into_owned(),
            ..configs::StorageConfig::default()
        };
        let ctx = WorkerContext {
            db: db.clone(),
            generator: Arc::new(GeneratorClient::from_config(&configs::GeneratorConfig::default())?),
            images: Arc::new(ImageStore::new(&storage).await?),
        };

        let t = tasks::create_task(
            &db,
            models::task::NewTask {
                prompt: "worker pipeline test".into(),
                width: 512,
                height: 512,
                style: None,
                user_id: None,
                model_config_id: None,
            },
        )
        .await?;

        let done = process_task(&ctx, t.id).await?;
        assert_eq!(done.status()?, models::task::TaskStatus::Completed);
        let url = done.image_url.expect("image url set");
        let filename = url.rsplit('/').next().expect("filename");
        assert!(ctx.images.path_for(filename).is_some());

        // a terminal task cannot be processed again
        assert!(process_task(&ctx, t.id).await.is_err());

        tasks::delete_task(&db, t.id).await?;
        Ok(())
    }
}
