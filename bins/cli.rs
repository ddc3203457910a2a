//! One-shot generation from the command line: create a task and drive the
//! same pipeline the server runs in the background, synchronously.

use clap::Parser;
use dotenvy::dotenv;

use models::task::NewTask;
use server::schemas::GenerateRequest;
use server::startup::build_state;
use service::{tasks, worker};

#[derive(Parser, Debug)]
#[command(name = "picgen-cli", about = "Generate an AI image from the command line")]
struct Args {
    /// Image description
    prompt: String,
    /// Image width in pixels
    #[arg(long, default_value_t = 512)]
    width: i32,
    /// Image height in pixels
    #[arg(long, default_value_t = 512)]
    height: i32,
    /// Optional style hint
    #[arg(long)]
    style: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_default();

    let args = Args::parse();

    // Same validation the HTTP schema layer applies
    let request = GenerateRequest {
        prompt: args.prompt,
        width: args.width,
        height: args.height,
        style: args.style,
        model_config_id: None,
    }
    .validated()
    .map_err(|e| anyhow::anyhow!(e))?;

    println!("generating image: {}", request.prompt);
    println!("  size: {}x{}", request.width, request.height);

    let cfg = configs::AppConfig::load_and_validate()?;
    let state = build_state(&cfg).await?;
    let ctx = state.worker_context();

    let task = tasks::create_task(
        &state.db,
        NewTask {
            prompt: request.prompt,
            width: request.width,
            height: request.height,
            style: request.style,
            user_id: None,
            model_config_id: None,
        },
    )
    .await?;
    println!("task created: {}", task.id);

    match worker::process_task(&ctx, task.id).await {
        Ok(done) => {
            println!("image generation completed");
            println!("  task id: {}", done.id);
            println!("  status: {}", done.status);
            println!("  image url: {}", done.image_url.as_deref().unwrap_or("-"));
            println!("  created at: {}", done.created_at);
            Ok(())
        }
        Err(e) => {
            eprintln!("generation failed: {e}");
            std::process::exit(1);
        }
    }
}
