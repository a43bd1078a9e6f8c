use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gofigure::voice::{AudioPlayback, CaptureController, MicrophoneDevice, SynthesisRequest};
use gofigure::{Config, Game, GameOptions, GameOutcome, Scenario, Terminal, backends};

/// gofigure - solve a murder mystery by talking to the suspects
#[derive(Parser)]
#[command(name = "gofigure", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a scenario
    Play {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Print character replies even when they are spoken
        #[arg(long)]
        show_responses: bool,

        /// Type instead of using the microphone
        #[arg(long)]
        text: bool,

        /// Play without background music
        #[arg(long)]
        no_music: bool,
    },
    /// Show the effective configuration
    Config,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Good evening, Detective. Shall we begin?")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load();
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Play {
            scenario,
            show_responses,
            text,
            no_music,
        } => play(config, &scenario, show_responses, text, no_music).await,
        Command::Config => {
            println!("{config}");
            Ok(())
        }
        Command::TestMic { duration } => test_mic(&config, duration).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

#[allow(clippy::future_not_send, clippy::fn_params_excessive_bools)]
async fn play(
    config: Config,
    path: &std::path::Path,
    show_responses: bool,
    text: bool,
    no_music: bool,
) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)?;
    tracing::info!(title = %scenario.title, "starting game");

    let generator = backends::dialogue_generator(&config)?;
    let narration = backends::narration_player(&config);
    let voice = backends::voice_input(&config, text);

    let options = GameOptions {
        show_responses: show_responses || config.show_responses,
        turn_timeout: config.llm.timeout,
        ..GameOptions::default()
    };

    let mut game = Game::new(
        scenario,
        generator,
        narration,
        Terminal::stdin(),
        Box::new(std::io::stdout()),
        options,
    );
    if let Some(voice) = voice {
        game = game.with_voice(voice);
    }
    if let Some(music) = backends::background_music(&config, no_music) {
        game = game.with_music(music);
    }

    let outcome = game.run().await?;
    tracing::info!(?outcome, "finished");

    if outcome == GameOutcome::Quit {
        println!("Thanks for playing!");
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = CaptureController::new(Box::new(MicrophoneDevice), config.stt.sample_rate);
    let pending = capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = pending.take();
        let energy = calculate_rms(&samples);
        let peak = samples
            .iter()
            .map(|&s| f32::from(s).abs() / 32768.0)
            .fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    let stats = pending.stats();
    capture.stop();

    println!("\n---");
    println!("Captured {} bytes in {} chunks.", stats.bytes_captured, stats.chunks_taken);
    if stats.bytes_captured == 0 {
        println!("No audio arrived. Check that a microphone is connected and selected.");
    } else {
        println!("If you saw movement in the meter, your mic is working!");
    }

    Ok(())
}

/// RMS energy of 16-bit samples, scaled to [0, 1]
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let v = f32::from(s) / 32768.0;
            v * v
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speech synthesis and playback
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let Some(synthesizer) = backends::speech_synthesizer(config)? else {
        anyhow::bail!("speech synthesis is disabled in the configuration");
    };
    println!("Engine: {}", synthesizer.name());

    let request = SynthesisRequest {
        text: text.to_string(),
        emotion: "Warm and curious".to_string(),
        voice: String::new(),
    };

    println!("Synthesizing speech...");
    let audio = synthesizer.synthesize(&request).await?;
    println!("Got {} bytes of audio data", audio.len());

    println!("Playing audio...");
    AudioPlayback::new()?.play_bytes(&audio).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
