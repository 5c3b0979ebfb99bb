use anyhow::Result;
use clap::Parser;
use reverse_prompt::app::App;
use reverse_prompt::image::ImageInput;
use reverse_prompt::models::Config;
use reverse_prompt::session::{AnalysisSession, SessionStatus};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "reverse-prompt")]
#[command(about = "Generate English and Arabic text-to-image prompts that recreate an image")]
struct CliArgs {
    /// Image file path or http(s) URL.
    #[arg(value_name = "SOURCE", conflicts_with_all = ["file", "url"], required_unless_present_any = ["file", "url"])]
    source: Option<String>,

    /// Local image file to analyze.
    #[arg(long, value_name = "PATH", conflicts_with = "url")]
    file: Option<String>,

    /// Remote image URL to analyze.
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Override the Gemini model (defaults to GEMINI_MODEL or gemini-2.5-flash).
    #[arg(long)]
    model: Option<String>,

    /// Print the result as JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl CliArgs {
    fn input(&self) -> reverse_prompt::Result<ImageInput> {
        match (&self.source, &self.file, &self.url) {
            (_, Some(path), _) => ImageInput::file(path.as_str()),
            (_, _, Some(url)) => ImageInput::url(url),
            (Some(source), _, _) => ImageInput::detect(source),
            (None, None, None) => Err(reverse_prompt::Error::InvalidInput(
                "No image source given.".to_string(),
            )),
        }
    }
}

fn print_session(session: &AnalysisSession, json: bool) -> Result<()> {
    match session.result() {
        Some(result) if json => println!("{}", serde_json::to_string_pretty(result)?),
        Some(result) => {
            println!("English prompt:\n{}\n", result.english());
            println!("Arabic prompt:\n{}", result.arabic());
        }
        None => {
            if let Some(message) = session.error_message() {
                eprintln!("Analysis failed: {}", message);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reverse_prompt=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let input = match args.input() {
        Ok(input) => input,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(2);
        }
    };

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };
    if let Some(model) = &args.model {
        config.gemini_model = model.clone();
    }

    let app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    let mut snapshots = app.subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(session) = snapshots.recv().await {
            info!(
                "Session {} is {}",
                session.generation(),
                session.status()
            );
            if session.status() != SessionStatus::Loading {
                break;
            }
        }
    });

    info!("Analyzing {}", input);
    let session = app.submit(&input).await?;
    // The watcher stops at the first terminal snapshot.
    let _ = watcher.await;

    print_session(&session, args.json)?;

    if session.status() == SessionStatus::Success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
