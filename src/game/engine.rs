//! The interactive investigation loop

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use super::command::{Command, ends_interview};
use super::matcher::find_character;
use super::terminal::Terminal;
use crate::llm::DialogueGenerator;
use crate::scenario::{Accusation, Scenario, Verdict, voice_for};
use crate::voice::{BackgroundMusic, NarrationOutcome, NarrationPlayer, Segment, VoiceInput};
use crate::{Error, Result};

const HELP: &str = "\
Available commands:
  help                                   Show this help
  list                                   List the characters you can interview
  interview <name>                       Question a character
  accuse <name> <weapon> <location>      Make your final accusation (one attempt only)
  quit                                   Leave the game";

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Won,
    Lost,
    Quit,
}

/// Tunables for one game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOptions {
    /// Print character replies even when they are spoken
    pub show_responses: bool,
    /// Upper bound for one dialogue generation
    pub turn_timeout: Duration,
    /// Upper bound for the generator availability check
    pub startup_timeout: Duration,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            show_responses: false,
            turn_timeout: Duration::from_secs(50),
            startup_timeout: Duration::from_secs(10),
        }
    }
}

/// One line of player input
enum Input {
    Line(String),
    /// Voice input produced nothing usable; the turn is dropped
    Abandoned,
    Closed,
}

/// How an interview ended
enum InterviewEnd {
    Left,
    InputClosed,
}

/// Runs one murder mystery from welcome to verdict
pub struct Game {
    scenario: Scenario,
    generator: Arc<dyn DialogueGenerator>,
    narration: NarrationPlayer,
    voice: Option<VoiceInput>,
    music: Option<BackgroundMusic>,
    terminal: Terminal,
    out: Box<dyn Write + Send>,
    options: GameOptions,
}

impl Game {
    #[must_use]
    pub fn new(
        scenario: Scenario,
        generator: Arc<dyn DialogueGenerator>,
        narration: NarrationPlayer,
        terminal: Terminal,
        out: Box<dyn Write + Send>,
        options: GameOptions,
    ) -> Self {
        Self {
            scenario,
            generator,
            narration,
            voice: None,
            music: None,
            terminal,
            out,
            options,
        }
    }

    /// Take questions and commands by push-to-talk instead of typing
    #[must_use]
    pub fn with_voice(mut self, voice: VoiceInput) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Keep `music` playing for the rest of the game
    #[must_use]
    pub fn with_music(mut self, music: BackgroundMusic) -> Self {
        self.music = Some(music);
        self
    }

    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Play until the player accuses someone or quits
    ///
    /// # Errors
    ///
    /// Returns error if the dialogue generator is unavailable at startup or
    /// the terminal cannot be written
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self) -> Result<GameOutcome> {
        self.check_generator().await?;
        self.introduce().await?;

        let outcome = loop {
            let input = self.read_input("\nDetective> ").await?;
            let line = match input {
                Input::Line(line) => line,
                Input::Abandoned => continue,
                Input::Closed => break GameOutcome::Quit,
            };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Help => writeln!(self.out, "{HELP}")?,
                Command::List => self.list_characters()?,
                Command::Interview(None) => writeln!(self.out, "Usage: interview <name>")?,
                Command::Interview(Some(query)) => {
                    let names: Vec<String> =
                        self.scenario.character_names().map(str::to_string).collect();
                    match find_character(&names, &query) {
                        Ok(index) => {
                            let span = tracing::info_span!("interview", character = %names[index]);
                            if let InterviewEnd::InputClosed =
                                self.interview(index).instrument(span).await?
                            {
                                break GameOutcome::Quit;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "no character matched");
                            writeln!(
                                self.out,
                                "No character named '{query}' found. Enter 'list' command to see available characters."
                            )?;
                        }
                    }
                }
                Command::Accuse(None) => {
                    writeln!(self.out, "Usage: accuse <name> <weapon> <location>")?;
                }
                Command::Accuse(Some(accusation)) => break self.accuse(&accusation)?,
                Command::Quit => {
                    writeln!(self.out, "Goodbye, Detective. The case remains unsolved.")?;
                    break GameOutcome::Quit;
                }
                Command::Unknown(_) => {
                    writeln!(self.out, "Unknown command. Type 'help' for options.")?;
                }
            }
        };

        if let Some(voice) = self.voice.as_mut() {
            voice.stop_listening();
        }
        if let Some(mut music) = self.music.take() {
            music.stop();
        }
        self.out.flush()?;

        tracing::info!(?outcome, "game over");
        Ok(outcome)
    }

    async fn check_generator(&self) -> Result<()> {
        tracing::debug!(generator = self.generator.name(), "checking dialogue generator");

        tokio::time::timeout(self.options.startup_timeout, self.generator.check_available())
            .await
            .map_err(|_| Error::Timeout("dialogue generator check"))?
    }

    async fn introduce(&mut self) -> Result<()> {
        let welcome = format!(
            "Welcome Detective! You are investigating: {}",
            self.scenario.title
        );
        writeln!(self.out, "{welcome}")?;
        writeln!(self.out, "\n{}\n", self.scenario.intro)?;

        let engine = self.narration.engine();
        let narrator = self.scenario.narrator_voice(engine).to_string();

        if !narrator.is_empty() && engine != "dummy" {
            writeln!(self.out, "(Press ENTER to skip the introduction)")?;
            self.out.flush()?;

            let segments = [
                Segment::new(welcome, "Welcoming and friendly", narrator.clone()),
                Segment::new(
                    self.scenario.intro.clone(),
                    "Authoritative, calm with a tone of mischief",
                    narrator,
                ),
            ];

            let outcome = self
                .narration
                .play(&segments, self.terminal.key_press())
                .instrument(tracing::debug_span!("introduction"))
                .await;

            if outcome == NarrationOutcome::Skipped {
                writeln!(self.out, "Narration skipped. Let's begin the investigation!")?;
            }
        }

        writeln!(self.out, "Type 'help' to see what you can do.")?;
        Ok(())
    }

    fn list_characters(&mut self) -> Result<()> {
        writeln!(self.out, "Characters in this mystery:")?;
        for character in &self.scenario.characters {
            if character.personality.is_empty() {
                writeln!(self.out, "  - {}", character.name)?;
            } else {
                writeln!(self.out, "  - {} ({})", character.name, character.personality)?;
            }
        }
        Ok(())
    }

    fn accuse(&mut self, accusation: &Accusation) -> Result<GameOutcome> {
        let solution = &self.scenario.solution;
        let verdict = self.scenario.judge(accusation);
        tracing::info!(?verdict, name = %accusation.name, "accusation made");

        match verdict {
            Verdict::Correct => {
                writeln!(
                    self.out,
                    "Correct! {} did it with the {} in the {}. Case closed, Detective!",
                    solution.killer, solution.weapon, solution.location
                )?;
                Ok(GameOutcome::Won)
            }
            Verdict::Wrong => {
                writeln!(
                    self.out,
                    "Wrong! The killer was {}, with the {} in the {}. Better luck next time.",
                    solution.killer, solution.weapon, solution.location
                )?;
                Ok(GameOutcome::Lost)
            }
        }
    }

    #[allow(clippy::future_not_send)]
    async fn interview(&mut self, index: usize) -> Result<InterviewEnd> {
        let name = self.scenario.characters[index].name.clone();
        writeln!(
            self.out,
            "You are now interviewing {name}. Type 'exit' to end the interview."
        )?;

        loop {
            let line = match self.read_input(&format!("\n{name}> ")).await? {
                Input::Line(line) => line,
                Input::Abandoned => continue,
                Input::Closed => return Ok(InterviewEnd::InputClosed),
            };

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if ends_interview(question) {
                writeln!(self.out, "You end your interview with {name}.")?;
                return Ok(InterviewEnd::Left);
            }

            self.dialogue_turn(index, question).await?;
        }
    }

    async fn dialogue_turn(&mut self, index: usize, question: &str) -> Result<()> {
        let Scenario {
            characters,
            solution,
            ..
        } = &mut self.scenario;
        let character = &mut characters[index];

        let reply = match character
            .ask(
                question,
                solution,
                self.generator.as_ref(),
                self.options.turn_timeout,
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, character = %character.name, "dialogue generation failed");
                writeln!(
                    self.out,
                    "{} seems distracted and doesn't respond clearly.",
                    character.name
                )?;
                return Ok(());
            }
        };

        let engine = self.narration.engine();
        let spoken = engine != "dummy";
        if self.voice.is_none() || self.options.show_responses || !spoken {
            if reply.emotion.is_empty() {
                writeln!(self.out, "{}: {}", character.name, reply.response)?;
            } else {
                writeln!(
                    self.out,
                    "{} ({}): {}",
                    character.name, reply.emotion, reply.response
                )?;
            }
        }
        self.out.flush()?;

        let voice = voice_for(&character.tts, engine).to_string();
        let segment = Segment::new(reply.response, reply.emotion, voice);
        self.narration
            .play(std::slice::from_ref(&segment), std::future::pending::<()>())
            .await;

        Ok(())
    }

    /// Read one line, by push-to-talk when voice input is on
    #[allow(clippy::future_not_send)]
    async fn read_input(&mut self, prompt: &str) -> Result<Input> {
        let Some(voice) = self.voice.as_mut() else {
            write!(self.out, "{prompt}")?;
            self.out.flush()?;
            return Ok(self
                .terminal
                .next_line()
                .await
                .map_or(Input::Closed, Input::Line));
        };

        write!(
            self.out,
            "{prompt}🎙️ Press ENTER to start recording (or type instead)... "
        )?;
        self.out.flush()?;

        let Some(typed) = self.terminal.next_line().await else {
            return Ok(Input::Closed);
        };
        if !typed.trim().is_empty() {
            return Ok(Input::Line(typed));
        }

        writeln!(self.out, "🔴 Recording... Press ENTER to stop")?;
        self.out.flush()?;

        match voice.capture_utterance(self.terminal.key_press()).await {
            Ok(utterance) if utterance.is_empty() => {
                writeln!(self.out, "No speech detected.")?;
                Ok(Input::Abandoned)
            }
            Ok(utterance) => {
                writeln!(self.out, "[captured] {utterance}")?;
                Ok(Input::Line(utterance))
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice input failed");
                writeln!(self.out, "Voice input failed. Please try again.")?;
                Ok(Input::Abandoned)
            }
        }
    }
}
