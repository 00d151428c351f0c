mod devices;
mod espeak;
mod report;
mod still_image;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use live_call_core::{
    AudioOutput, ChannelDelegate, LiveSession, SessionConfig, SessionError, SessionEvent,
    SessionState, SpeechHelper, VideoSource,
};
use live_call_gemini::{GeminiConfig, GeminiImageGenerator, GeminiLiveTransport, GeminiSpeech};

use espeak::EspeakSpeech;
use report::EventReporter;
use still_image::StillImage;

/// Talk to a Gemini Live agent from the terminal. Reads GEMINI_API_KEY.
#[derive(Parser, Debug)]
#[command(name = "live-call", version)]
struct Args {
    /// Session config as JSON (see --print-config).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Text file with the agent persona, replacing the configured one.
    #[arg(long)]
    persona: Option<PathBuf>,

    /// Still image streamed as the camera feed.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Microphone name (see --list-devices). Defaults to the system microphone.
    #[arg(long)]
    mic: Option<String>,

    /// Say this through text-to-speech before the call starts.
    #[arg(long)]
    say: Option<String>,

    /// Directory where generated roast images are written.
    #[arg(long)]
    save_images: Option<PathBuf>,

    /// List audio devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Print the effective session config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), SessionError> {
    if args.list_devices {
        return devices::list_devices();
    }

    let config = load_config(&args)?;
    if args.print_config {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| SessionError::EncodingFailed(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let gemini = GeminiConfig::from_env()?;
    let video = match &args.image {
        Some(path) => Some(Arc::new(StillImage::open(path)?) as Arc<dyn VideoSource>),
        None => None,
    };
    if let Some(text) = &args.say {
        greet(text, &gemini).await;
    }

    let media = devices::open_media(args.mic.as_deref(), video)?;

    let mut session = LiveSession::new(
        Arc::new(GeminiLiveTransport::new(gemini.clone())),
        Arc::new(GeminiImageGenerator::new(gemini.clone())),
        config,
    );
    let (delegate, mut events) = ChannelDelegate::new();
    session.set_delegate(delegate);

    session.connect(media).await?;
    log::info!("Connected, press Ctrl-C to hang up");

    let mut reporter = EventReporter::new(args.save_images.clone());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Hanging up");
                session.disconnect();
            }
            event = events.recv() => match event {
                Some(event) => {
                    reporter.report(&event);
                    if event == SessionEvent::StateChanged(SessionState::Closed) {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    log::info!("Call ended: {}", report::summarize(&session.diagnostics()));
    match reporter.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Speak `text` on a speaker of its own and wait until it has been heard.
async fn greet(text: &str, gemini: &GeminiConfig) {
    let output = match devices::open_output() {
        Ok(output) => output,
        Err(e) => {
            log::warn!("No speaker for the greeting: {}", e);
            return;
        }
    };

    let mut speech = SpeechHelper::new(
        Arc::new(GeminiSpeech::new(gemini.clone())),
        Arc::clone(&output),
    );
    match EspeakSpeech::auto() {
        Some(espeak) => speech = speech.with_fallback(Arc::new(espeak)),
        None => log::debug!("espeak-ng not found, greeting has no fallback voice"),
    }

    match speech.speak(text).await {
        Ok(route) => {
            log::info!("Greeting spoken ({:?} voice)", route);
            while speech.is_speaking() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
        Err(e) => log::warn!("Could not speak greeting: {}", e),
    }
    let _ = output.close();
}

fn load_config(args: &Args) -> Result<SessionConfig, SessionError> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(path) = &args.persona {
        config.persona = fs::read_to_string(path).map_err(|e| {
            SessionError::ConfigurationFailed(format!("cannot read {}: {}", path.display(), e))
        })?;
    }
    config
        .validate()
        .map_err(SessionError::ConfigurationFailed)?;
    Ok(config)
}
