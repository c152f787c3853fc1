use std::{
    path::PathBuf,
    process::{Command, Stdio},
    thread,
};

use anyhow::{Result, bail};
use tracing::debug;

use crate::config::AppSettings;

/// Materialised command specification ready to be spawned or logged.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    binary: PathBuf,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(binary: PathBuf, args: Vec<String>) -> Self {
        Self { binary, args }
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    pub fn describe(&self) -> String {
        let args = self.args.join(" ");
        format!("{} {}", self.binary.display(), args)
    }
}

/// Opens the help page with the platform's default URL handler.
#[derive(Debug, Clone)]
pub struct HelpLauncher {
    url: String,
    opener: Option<PathBuf>,
}

impl HelpLauncher {
    pub fn new(url: impl Into<String>, opener: Option<PathBuf>) -> Self {
        Self {
            url: url.into(),
            opener,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.help_url.clone(), settings.opener.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the opener invocation for this platform.
    pub fn command(&self) -> Result<CommandSpec> {
        let url = self.url.clone();
        if let Some(path) = &self.opener {
            return Ok(CommandSpec::new(path.clone(), vec![url]));
        }
        if cfg!(target_os = "windows") {
            return Ok(CommandSpec::new(
                PathBuf::from("cmd"),
                vec!["/C".into(), "start".into(), String::new(), url],
            ));
        }
        if cfg!(target_os = "macos") {
            if let Ok(path) = which::which("open") {
                return Ok(CommandSpec::new(path, vec![url]));
            }
        }
        if let Ok(path) = which::which("xdg-open") {
            return Ok(CommandSpec::new(path, vec![url]));
        }
        if let Ok(path) = which::which("gio") {
            return Ok(CommandSpec::new(path, vec!["open".into(), url]));
        }
        bail!("No URL opener found; install xdg-open or set `opener` in the config")
    }

    /// Fire and forget. Failures are logged and otherwise ignored.
    pub fn open(&self) {
        let Some(spec) = self.resolve() else {
            return;
        };
        thread::spawn(move || launch(&spec));
    }

    /// Like [`HelpLauncher::open`], but waits for the opener to exit.
    pub fn open_and_wait(&self) {
        if let Some(spec) = self.resolve() {
            launch(&spec);
        }
    }

    fn resolve(&self) -> Option<CommandSpec> {
        match self.command() {
            Ok(spec) => {
                debug!(command = %spec.describe(), "opening help page");
                Some(spec)
            }
            Err(err) => {
                debug!(error = %err, url = %self.url, "help page not opened");
                None
            }
        }
    }
}

fn launch(spec: &CommandSpec) {
    match spec.to_command().spawn() {
        Ok(mut child) => {
            let _ = child.wait();
        }
        Err(err) => {
            debug!(error = %err, binary = %spec.binary().display(), "URL opener failed to start");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HELP_URL;

    #[test]
    fn configured_opener_receives_url() {
        let launcher = HelpLauncher::new(DEFAULT_HELP_URL, Some(PathBuf::from("/usr/bin/firefox")));
        let command = launcher.command().unwrap();
        assert_eq!(command.binary(), &PathBuf::from("/usr/bin/firefox"));
        assert_eq!(command.args(), &[DEFAULT_HELP_URL.to_string()]);
        assert_eq!(command.describe(), format!("/usr/bin/firefox {DEFAULT_HELP_URL}"));
    }

    #[test]
    fn settings_supply_url_and_opener() {
        let mut settings = AppSettings::default();
        settings.help_url = "https://example.invalid/help".into();
        settings.opener = Some(PathBuf::from("/opt/open-url"));

        let launcher = HelpLauncher::from_settings(&settings);
        assert_eq!(launcher.url(), "https://example.invalid/help");
        let command = launcher.command().unwrap();
        assert!(command.args().iter().any(|arg| arg == "https://example.invalid/help"));
    }

    #[test]
    fn missing_opener_binary_is_ignored() {
        let launcher = HelpLauncher::new(
            DEFAULT_HELP_URL,
            Some(PathBuf::from("/definitely/not/a/real/opener")),
        );
        launcher.open();
        launcher.open_and_wait();
    }
}
