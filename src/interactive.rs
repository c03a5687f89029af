//! Interactive prompt session.
//!
//! Walks the user through settings, URLs and per-URL overrides, and hands
//! back a [`SessionPlan`] for the orchestrator. Prompts read from any
//! `BufRead` so the whole flow can be scripted in tests. End of input on any
//! prompt counts as an interruption.

use crate::config::{
    AudioFormat, AudioQuality, Config, ConfigStore, ContentType, VideoFormat, VideoQuality,
};
use crate::error::{AppError, Result};
use crate::logging::Logging;
use crate::orchestrator::Overrides;
use crate::output::UrlOverride;
use crate::source::validate_url;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

/// Line-oriented prompts with defaults.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Err(AppError::Interrupted);
        }
        Ok(line.trim().to_string())
    }

    /// Free text; an empty answer takes `default`, or asks again without one.
    pub fn ask_input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let shown = match default {
            Some(d) if !d.is_empty() => format!("{prompt} [{d}]: "),
            _ => format!("{prompt}: "),
        };

        loop {
            let value = self.read_line(&shown)?;
            if !value.is_empty() {
                return Ok(value);
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
            self.say("Please enter a value.")?;
        }
    }

    /// Free text where an empty answer means "none".
    pub fn ask_optional(&mut self, prompt: &str) -> Result<Option<String>> {
        let value = self.read_line(&format!("{prompt}: "))?;
        Ok((!value.is_empty()).then_some(value))
    }

    pub fn ask_yes_no(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let shown = format!("{prompt} {}: ", if default { "[Y/n]" } else { "[y/N]" });

        loop {
            match self.read_line(&shown)?.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer 'y' or 'n'.")?,
            }
        }
    }

    /// Numbered menu; an empty answer keeps `default`.
    pub fn ask_choice<T: Copy + PartialEq>(
        &mut self,
        prompt: &str,
        choices: &[(&str, T)],
        default: T,
    ) -> Result<T> {
        writeln!(self.output, "\n{prompt}")?;
        for (i, (label, _)) in choices.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, label)?;
        }

        let default_index = choices.iter().position(|(_, value)| *value == default);
        let shown = match default_index {
            Some(i) => format!("Enter a number [{}]: ", i + 1),
            None => "Enter a number: ".to_string(),
        };

        loop {
            let answer = self.read_line(&shown)?;
            if answer.is_empty() {
                if let Some(i) = default_index {
                    return Ok(choices[i].1);
                }
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(choices[n - 1].1),
                Ok(_) => self.say(&format!("Enter a number from 1 to {}.", choices.len()))?,
                Err(_) => self.say("Enter a valid number.")?,
            }
        }
    }

    /// Reads URLs one per line until a blank line or `q`/`quit`/`exit`.
    pub fn ask_urls(&mut self) -> Result<Vec<String>> {
        self.say("\nEnter download URLs, one per line ('q' to quit).")?;
        self.say("Finish with an empty line.\n")?;

        let mut urls = Vec::new();
        loop {
            let url = self.read_line("URL: ")?;
            if url.is_empty() || matches!(url.to_lowercase().as_str(), "q" | "quit" | "exit") {
                break;
            }
            match validate_url(&url) {
                Ok(()) => urls.push(url),
                Err(_) => self.say("Please enter a valid URL.")?,
            }
        }

        if !urls.is_empty() {
            self.say(&format!("\nAccepted {} URLs. Starting downloads...", urls.len()))?;
        }
        Ok(urls)
    }
}

/// What an interactive session decided to download.
#[derive(Debug)]
pub struct SessionPlan {
    pub config: Config,
    pub urls: Vec<String>,
    pub overrides: Overrides,
}

const CONTENT_TYPES: [(&str, ContentType); 3] = [
    ("Video", ContentType::Video),
    ("Audio", ContentType::Audio),
    ("Both", ContentType::Both),
];

const VIDEO_QUALITIES: [(&str, VideoQuality); 5] = [
    ("Best available", VideoQuality::Best),
    ("High (1080p)", VideoQuality::High),
    ("Medium (720p)", VideoQuality::Medium),
    ("Low (480p)", VideoQuality::Low),
    ("Lowest (360p)", VideoQuality::Lowest),
];

const VIDEO_FORMATS: [(&str, VideoFormat); 3] = [
    ("MP4", VideoFormat::Mp4),
    ("WebM", VideoFormat::Webm),
    ("MKV", VideoFormat::Mkv),
];

const AUDIO_QUALITIES: [(&str, AudioQuality); 3] = [
    ("High (192kbps)", AudioQuality::High),
    ("Medium (128kbps)", AudioQuality::Medium),
    ("Low (96kbps)", AudioQuality::Low),
];

const AUDIO_FORMATS: [(&str, AudioFormat); 4] = [
    ("MP3", AudioFormat::Mp3),
    ("M4A", AudioFormat::M4a),
    ("WAV", AudioFormat::Wav),
    ("FLAC", AudioFormat::Flac),
];

#[derive(Clone, Copy, PartialEq)]
enum Customize {
    Directory,
    Format,
    Both,
}

/// One run of the prompt loop.
pub struct InteractiveSession<'a, R, W> {
    store: ConfigStore,
    prompter: Prompter<R, W>,
    logging: Option<&'a Logging>,
    per_url_config: bool,
}

impl<'a, R: BufRead, W: Write> InteractiveSession<'a, R, W> {
    pub fn new(store: ConfigStore, prompter: Prompter<R, W>, logging: Option<&'a Logging>) -> Self {
        Self {
            store,
            prompter,
            logging,
            per_url_config: false,
        }
    }

    /// Runs every prompt and returns the plan, or `None` when no URL was given.
    pub fn configure(&mut self) -> Result<Option<SessionPlan>> {
        let first_run = !self.store.load();
        self.apply_verbosity();

        self.prompter.say("\nWelcome to mediascoop!")?;
        if first_run {
            self.prompter.say("First run: let's set things up.")?;
            self.setup_config()?;
            self.offer_save()?;
        } else {
            self.prompter.say("Loaded your previous settings.\n")?;
            let summary = self.store.config().describe();
            self.prompter.say(&summary)?;
            if self.prompter.ask_yes_no("Change these settings?", false)? {
                self.setup_config()?;
                self.offer_save()?;
            } else {
                self.setup_custom_output_options()?;
            }
        }

        if !self.per_url_config {
            let use_original = self
                .prompter
                .ask_yes_no("Use each item's original title as the file name?", true)?;
            self.store.config_mut().use_original_title = use_original;
        }

        let urls = self.prompter.ask_urls()?;
        if urls.is_empty() {
            self.prompter.say("No URLs entered. Exiting.")?;
            return Ok(None);
        }

        let overrides = if self.per_url_config
            || (!self.store.config().use_original_title
                && self
                    .prompter
                    .ask_yes_no("Set a file name for each URL?", true)?)
        {
            self.configure_per_url_settings(&urls)?
        } else {
            Overrides::new()
        };

        Ok(Some(SessionPlan {
            config: self.store.config().clone(),
            urls,
            overrides,
        }))
    }

    pub fn say_goodbye(&mut self) -> Result<()> {
        self.prompter.say("\nAll done. Goodbye!")
    }

    fn apply_verbosity(&self) {
        if let Some(logging) = self.logging {
            logging.set_verbose(self.store.config().verbose);
        }
    }

    fn offer_save(&mut self) -> Result<()> {
        if self
            .prompter
            .ask_yes_no("Save these settings as the default?", true)?
        {
            match self.store.save() {
                Ok(()) => self.prompter.say("Settings saved.")?,
                Err(e) => {
                    debug!("config save failed: {}", e);
                    self.prompter.say("Could not save settings.")?
                }
            }
        }
        Ok(())
    }

    fn setup_config(&mut self) -> Result<()> {
        self.prompter.say("\n--- Settings ---")?;
        let current = self.store.config().clone();

        let content_type = self.prompter.ask_choice(
            "What do you want to download?",
            &CONTENT_TYPES,
            current.content_type,
        )?;
        let current_dir = current.output_dir.to_string_lossy().into_owned();
        let output_dir = self
            .prompter
            .ask_input("Output directory", Some(&current_dir))?;

        let config = self.store.config_mut();
        config.content_type = content_type;
        config.output_dir = PathBuf::from(output_dir);

        if content_type != ContentType::Audio {
            self.ask_video_quality()?;
            self.ask_video_format()?;
        }
        if content_type != ContentType::Video {
            self.ask_audio_quality()?;
            self.ask_audio_format()?;
        }

        let subtitles = self
            .prompter
            .ask_yes_no("Download subtitles?", current.subtitles)?;
        let verbose = self
            .prompter
            .ask_yes_no("Show detailed logs?", current.verbose)?;

        let config = self.store.config_mut();
        config.subtitles = subtitles;
        config.verbose = verbose;
        self.apply_verbosity();

        self.prompter.say("\nSettings complete.")
    }

    fn ask_video_quality(&mut self) -> Result<()> {
        let current = self.store.config().video_quality;
        let quality = self
            .prompter
            .ask_choice("Video quality:", &VIDEO_QUALITIES, current)?;
        self.store.config_mut().video_quality = quality;
        Ok(())
    }

    fn ask_video_format(&mut self) -> Result<()> {
        let current = self.store.config().video_format;
        let format = self
            .prompter
            .ask_choice("Video format:", &VIDEO_FORMATS, current)?;
        self.store.config_mut().video_format = format;
        Ok(())
    }

    fn ask_audio_quality(&mut self) -> Result<()> {
        let current = self.store.config().audio_quality;
        let quality = self
            .prompter
            .ask_choice("Audio quality:", &AUDIO_QUALITIES, current)?;
        self.store.config_mut().audio_quality = quality;
        Ok(())
    }

    fn ask_audio_format(&mut self) -> Result<()> {
        let current = self.store.config().audio_format;
        let format = self
            .prompter
            .ask_choice("Audio format:", &AUDIO_FORMATS, current)?;
        self.store.config_mut().audio_format = format;
        Ok(())
    }

    /// Lighter customization for returning users: output directory and/or
    /// file formats, optionally deferred to per-URL prompts.
    fn setup_custom_output_options(&mut self) -> Result<()> {
        self.prompter.say("\n--- Output options ---")?;
        if !self
            .prompter
            .ask_yes_no("Customize the output directory or file format?", false)?
        {
            return Ok(());
        }

        let choice = self.prompter.ask_choice(
            "What do you want to customize?",
            &[
                ("Output directory only", Customize::Directory),
                ("File format only", Customize::Format),
                ("Both", Customize::Both),
            ],
            Customize::Both,
        )?;

        if choice != Customize::Format {
            self.per_url_config = self
                .prompter
                .ask_yes_no("Configure each URL separately?", true)?;
            if !self.per_url_config {
                let current = self.store.config().output_dir.to_string_lossy().into_owned();
                let dir = self.prompter.ask_input("Output directory", Some(&current))?;
                self.store.config_mut().output_dir = PathBuf::from(dir);
            }
        }

        if choice != Customize::Directory && !self.per_url_config {
            let content_type = self.store.config().content_type;
            if content_type != ContentType::Audio {
                self.ask_video_format()?;
            }
            if content_type != ContentType::Video {
                self.ask_audio_format()?;
            }
        }
        Ok(())
    }

    fn configure_per_url_settings(&mut self, urls: &[String]) -> Result<Overrides> {
        self.prompter.say("\n--- Per-URL settings ---")?;
        self.prompter
            .say("Leave the file name empty to use the item's title.")?;

        let mut overrides = Overrides::new();
        for url in urls {
            let mut settings = UrlOverride::default();

            if self.per_url_config {
                self.prompter.say(&format!("\nURL: {url}"))?;
                let current = self.store.config().output_dir.to_string_lossy().into_owned();
                let dir = self.prompter.ask_input("Output directory", Some(&current))?;
                settings.output_dir = Some(PathBuf::from(dir));

                if !self
                    .prompter
                    .ask_yes_no("Use the original title as the file name?", true)?
                {
                    settings.filename = self.prompter.ask_optional("File name")?;
                }
            } else {
                settings.filename = self
                    .prompter
                    .ask_optional(&format!("File name for {url}"))?;
            }

            if !settings.is_empty() {
                overrides.insert(url.clone(), settings);
            }
        }
        Ok(overrides)
    }
}
