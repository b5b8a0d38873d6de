//! URL detection and opening.
//!
//! Holds the compiled URL pattern and the opener command. The
//! front-end asks for the URL under a click position (or all URLs on
//! a line for hinting) and hands chosen ones back to `open_url`. A
//! failed spawn is logged and the dispatch returns normally.

use core_config::{Config, DEFAULT_URL_REGEX, UrlClickConfig};
use core_module::{Module, UrlHandler};
use regex::Regex;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub struct UrlOpenModule {
    opener: String,
    pattern: Regex,
}

impl Default for UrlOpenModule {
    fn default() -> Self {
        UrlOpenModule::new()
    }
}

impl UrlOpenModule {
    pub fn new() -> UrlOpenModule {
        let defaults = UrlClickConfig::default();
        UrlOpenModule {
            opener: defaults.opener,
            pattern: Regex::new(DEFAULT_URL_REGEX).expect("default pattern is valid"),
        }
    }

    /// All URL matches in a line of text, as `(start, end)` byte
    /// ranges plus the matched text.
    pub fn find_urls<'t>(&self, text: &'t str) -> Vec<(usize, usize, &'t str)> {
        self.pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end(), m.as_str()))
            .collect()
    }

    /// The URL whose byte range covers `pos`, if any.
    pub fn url_at<'t>(&self, text: &'t str, pos: usize) -> Option<&'t str> {
        self.find_urls(text)
            .into_iter()
            .find(|&(start, end, _)| pos >= start && pos < end)
            .map(|(_, _, url)| url)
    }
}

impl Module for UrlOpenModule {
    fn name(&self) -> &'static str {
        "urlopen"
    }

    fn configure(&mut self, config: &Config) {
        self.opener = config.urlclick.opener.clone();
        match Regex::new(&config.urlclick.regex) {
            Ok(pattern) => self.pattern = pattern,
            Err(err) => {
                warn!(target: "module.urlopen", %err, "invalid url regex, using default");
                self.pattern = Regex::new(DEFAULT_URL_REGEX).expect("default pattern is valid");
            }
        }
    }

    fn as_url_handler(&mut self) -> Option<&mut dyn UrlHandler> {
        Some(self)
    }
}

impl UrlHandler for UrlOpenModule {
    fn open_url(&mut self, url: &str) -> anyhow::Result<()> {
        debug!(target: "module.urlopen", url, opener = %self.opener, "opening");
        match Command::new(&self.opener)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_child) => {}
            // Not a module failure: the opener is environment-provided.
            Err(err) => warn!(target: "module.urlopen", %err, "opener spawn failed"),
        }
        Ok(())
    }
}
