//! Game loop integration tests
//!
//! Plays scripted sessions against fake backends and checks the printed
//! output, the outcome and the recorded conversations.

use std::sync::Arc;
use std::time::Duration;

use gofigure::voice::{
    NarrationPlayer, SilentSpeaker, Speaker, SpeechRecognizer, VoiceInput, VoiceTiming,
};
use gofigure::{Game, GameOptions, GameOutcome, Role, Terminal};
use tokio::sync::mpsc;

mod common;

use common::{
    FakeDevice, FakeGenerator, FakeRecognizer, RecordingSpeaker, SharedOutput, manor, settings,
};

/// Terminal with every line already typed and input closed afterwards
fn scripted(lines: &[&str]) -> Terminal {
    let (tx, rx) = mpsc::unbounded_channel();
    for line in lines {
        tx.send((*line).to_string()).unwrap();
    }
    Terminal::from_channel(rx)
}

fn game(
    generator: Arc<FakeGenerator>,
    speaker: Arc<dyn Speaker>,
    terminal: Terminal,
    out: &SharedOutput,
) -> Game {
    Game::new(
        manor(),
        generator,
        NarrationPlayer::new(speaker, Duration::from_secs(30)),
        terminal,
        Box::new(out.clone()),
        GameOptions::default(),
    )
}

fn silent() -> Arc<dyn Speaker> {
    Arc::new(SilentSpeaker)
}

#[tokio::test]
async fn test_correct_accusation_wins() {
    let out = SharedOutput::default();
    let mut game = game(
        Arc::new(FakeGenerator::new()),
        silent(),
        scripted(&["accuse MUSTARD Candlestick dining room"]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Won);
    assert!(out.contents().contains("Welcome Detective! You are investigating: Death at Blackwood Manor"));
    assert!(out.contents().contains("Correct!"));
}

#[tokio::test]
async fn test_wrong_accusation_loses_after_one_attempt() {
    let out = SharedOutput::default();
    let mut game = game(
        Arc::new(FakeGenerator::new()),
        silent(),
        scripted(&[
            "accuse scarlet candlestick dining room",
            "accuse mustard candlestick dining room",
        ]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Lost);
    assert!(out.contents().contains("Wrong!"));
    assert!(!out.contents().contains("Correct!"));
}

#[tokio::test]
async fn test_single_field_mismatch_loses() {
    let out = SharedOutput::default();
    let mut game = game(
        Arc::new(FakeGenerator::new()),
        silent(),
        scripted(&["accuse mustard rope dining room"]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Lost);
}

#[tokio::test]
async fn test_short_accusation_does_not_use_attempt() {
    let out = SharedOutput::default();
    let mut game = game(
        Arc::new(FakeGenerator::new()),
        silent(),
        scripted(&["accuse mustard candlestick", "accuse mustard candlestick dining room"]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Won);
    assert!(out.contents().contains("Usage: accuse <name> <weapon> <location>"));
}

#[tokio::test]
async fn test_help_list_unknown_and_quit() {
    let out = SharedOutput::default();
    let mut game = game(
        Arc::new(FakeGenerator::new()),
        silent(),
        scripted(&["help", "list", "sing a song", "", "quit"]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);

    let text = out.contents();
    assert!(text.contains("Available commands:"));
    assert!(text.contains("Characters in this mystery:"));
    assert!(text.contains("  - Colonel Mustard (Gruff retired officer)"));
    assert!(text.contains("  - Miss Scarlet (Charming and sharp)"));
    assert_eq!(text.matches("Unknown command. Type 'help' for options.").count(), 1);
}

#[tokio::test]
async fn test_closed_input_quits() {
    let out = SharedOutput::default();
    let mut game = game(Arc::new(FakeGenerator::new()), silent(), scripted(&[]), &out);

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
}

#[tokio::test]
async fn test_unavailable_generator_aborts_startup() {
    let out = SharedOutput::default();
    let mut game = game(Arc::new(FakeGenerator::unavailable()), silent(), scripted(&["quit"]), &out);

    assert!(game.run().await.is_err());
    assert!(!out.contents().contains("Welcome Detective"));
}

#[tokio::test]
async fn test_unknown_character() {
    let out = SharedOutput::default();
    let mut game = game(
        Arc::new(FakeGenerator::new()),
        silent(),
        scripted(&["interview professor", "interview", "quit"]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert!(out.contents().contains(
        "No character named 'professor' found. Enter 'list' command to see available characters."
    ));
    assert!(out.contents().contains("Usage: interview <name>"));
}

#[tokio::test]
async fn test_interview_records_conversation() {
    let out = SharedOutput::default();
    let generator = Arc::new(
        FakeGenerator::new()
            .reply("I was in the library, I tell you!", "defensive")
            .reply("Nothing at all.", "irritated"),
    );
    let mut game = game(
        Arc::clone(&generator),
        silent(),
        scripted(&[
            "interview mustrad",
            "Where were you at nine?",
            "",
            "What did you hear?",
            "exit",
            "quit",
        ]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);

    let conversation = &game.scenario().characters[0].conversation;
    assert_eq!(conversation.len(), 1 + 2 * 2);

    let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(conversation.messages()[1].content, "Detective's question: Where were you at nine?");
    assert_eq!(
        conversation.messages()[3].content,
        "Detective's follow up question: What did you hear?"
    );
    assert_eq!(conversation.messages()[2].emotion.as_deref(), Some("defensive"));
    assert!(game.scenario().characters[1].conversation.is_empty());

    let seen: Vec<usize> = generator.seen().iter().map(Vec::len).collect();
    assert_eq!(seen, [2, 4]);

    let text = out.contents();
    assert!(text.contains("You are now interviewing Colonel Mustard."));
    assert!(text.contains("Colonel Mustard (defensive): I was in the library, I tell you!"));
}

#[tokio::test]
async fn test_generation_failure_keeps_question() {
    let out = SharedOutput::default();
    let generator = Arc::new(FakeGenerator::new().fail().reply("Fine, I was there.", ""));
    let mut game = game(
        Arc::clone(&generator),
        silent(),
        scripted(&["interview scarlet", "Were you there?", "Were you there?", "quit", "quit"]),
        &out,
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert!(out
        .contents()
        .contains("Miss Scarlet seems distracted and doesn't respond clearly."));
    assert!(out.contents().contains("Miss Scarlet: Fine, I was there."));

    // system + failed question + follow up + reply
    assert_eq!(game.scenario().characters[1].conversation.len(), 4);
}

#[tokio::test]
async fn test_reply_spoken_with_character_voice() {
    let out = SharedOutput::default();
    let speaker = Arc::new(RecordingSpeaker::new("google", Duration::from_millis(10)));
    let generator = Arc::new(
        FakeGenerator::new()
            .reply("Harrumph.", "gruff")
            .reply("Oh, darling.", "amused"),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let mut game = Game::new(
        manor(),
        generator,
        NarrationPlayer::new(speaker.clone(), Duration::from_secs(30)),
        Terminal::from_channel(rx),
        Box::new(out.clone()),
        GameOptions::default(),
    );

    // The first ENTER skips the introduction
    for line in ["", "interview mustard", "hello", "exit", "interview miss", "hello", "exit", "quit"] {
        tx.send(line.to_string()).unwrap();
    }

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);

    let started = speaker.started();
    assert!(started.contains(&"en-GB-Chirp3-HD-Fenrir|Harrumph.".to_string()));
    // No binding for Miss Scarlet: the engine default voice is used
    assert!(started.contains(&"|Oh, darling.".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_introduction_can_be_skipped() {
    let out = SharedOutput::default();
    let speaker = Arc::new(RecordingSpeaker::new("google", Duration::from_secs(10)));
    let (tx, rx) = mpsc::unbounded_channel();

    let mut game = Game::new(
        manor(),
        Arc::new(FakeGenerator::new()),
        NarrationPlayer::new(speaker.clone(), Duration::from_secs(30)),
        Terminal::from_channel(rx),
        Box::new(out.clone()),
        GameOptions::default(),
    );

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send(String::new());
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send("quit".to_string());
    });

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert!(out
        .contents()
        .contains("Narration skipped. Let's begin the investigation!"));
    assert_eq!(
        speaker.started(),
        ["en-GB-Chirp3-HD-Charon|Welcome Detective! You are investigating: Death at Blackwood Manor"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_silent_engine_skips_introduction_narration() {
    let out = SharedOutput::default();
    let speaker = Arc::new(RecordingSpeaker::new("dummy", Duration::from_secs(1)));
    let mut game = Game::new(
        manor(),
        Arc::new(FakeGenerator::new()),
        NarrationPlayer::new(speaker.clone(), Duration::from_secs(30)),
        scripted(&["quit"]),
        Box::new(out.clone()),
        GameOptions::default(),
    );

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert!(speaker.started().is_empty());
    assert!(!out.contents().contains("Narration skipped"));
}

fn voice_timing() -> VoiceTiming {
    VoiceTiming {
        chunk_interval: Duration::from_secs(2),
        request_timeout: Duration::from_secs(15),
        grace: Duration::from_secs(2),
        session_timeout: Duration::from_secs(10),
    }
}

#[tokio::test(start_paused = true)]
async fn test_spoken_command() {
    let out = SharedOutput::default();
    let (device, counters) = FakeDevice::with_audio(1);
    let recognizer: Arc<dyn SpeechRecognizer> =
        Arc::new(FakeRecognizer::new().then(Duration::from_millis(100), &["List."]));
    let voice = VoiceInput::new(Box::new(device), recognizer, settings(), voice_timing());

    // ENTER to start, ENTER to stop, then a typed command
    let mut game = game(Arc::new(FakeGenerator::new()), silent(), scripted(&["", "", "quit"]), &out)
        .with_voice(voice);

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert_eq!(counters.opens(), 1);

    let text = out.contents();
    assert!(text.contains("🔴 Recording... Press ENTER to stop"));
    assert!(text.contains("[captured] List"));
    assert!(text.contains("  - Miss Scarlet"));
}

#[tokio::test(start_paused = true)]
async fn test_typed_text_bypasses_recording() {
    let out = SharedOutput::default();
    let (device, counters) = FakeDevice::with_audio(1);
    let voice = VoiceInput::new(
        Box::new(device),
        Arc::new(FakeRecognizer::new()),
        settings(),
        voice_timing(),
    );

    let mut game = game(Arc::new(FakeGenerator::new()), silent(), scripted(&["list", "quit"]), &out)
        .with_voice(voice);

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert_eq!(counters.opens(), 0);
    assert!(out.contents().contains("  - Colonel Mustard"));
}

#[tokio::test(start_paused = true)]
async fn test_voice_failures_abandon_turn() {
    let out = SharedOutput::default();
    let voice = VoiceInput::new(
        Box::new(FakeDevice::broken()),
        Arc::new(FakeRecognizer::new()),
        settings(),
        voice_timing(),
    );

    let mut game = game(Arc::new(FakeGenerator::new()), silent(), scripted(&["", "quit"]), &out)
        .with_voice(voice);

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert!(out.contents().contains("Voice input failed"));
}

#[tokio::test(start_paused = true)]
async fn test_no_speech_detected() {
    let out = SharedOutput::default();
    let (device, _) = FakeDevice::with_audio(1);
    let voice = VoiceInput::new(
        Box::new(device),
        Arc::new(FakeRecognizer::new()),
        settings(),
        voice_timing(),
    );

    let mut game = game(Arc::new(FakeGenerator::new()), silent(), scripted(&["", "", "quit"]), &out)
        .with_voice(voice);

    assert_eq!(game.run().await.unwrap(), GameOutcome::Quit);
    assert!(out.contents().contains("No speech detected."));
    assert!(!out.contents().contains("Unknown command"));
}
