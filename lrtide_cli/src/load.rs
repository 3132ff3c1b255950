use std::error::Error;
use std::fs;

use thiserror::Error;

use lrtide_core::{Automaton, Grammar, GrammarErrors, Strength};
use lrtide_scan::{extract, Section};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{path}: no code section named `{name}`")]
    NoSection { path: String, name: String },
    #[error("{path}: document contains no code")]
    NoCode { path: String },
    #[error("{path}: {errors}")]
    Grammar { path: String, errors: GrammarErrors },
}

/// A literate document read from disk
pub struct Document {
    pub path: String,
    text: String,
}

impl Document {
    pub fn read(path: &str) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        Ok(Document {
            path: path.to_owned(),
            text,
        })
    }

    pub fn sections(&self) -> Vec<Section> {
        let path = &self.path;
        extract(&self.text, |err| log::warn!("{}: {}", path, err))
    }

    /// The named section, or the first one if no name is given
    pub fn section(&self, name: Option<&str>) -> Result<Section, CliError> {
        let sections = self.sections();
        let found = match name {
            Some(name) => Section::find(&sections, name).cloned(),
            None => sections.into_iter().next(),
        };
        found.ok_or_else(|| match name {
            Some(name) => CliError::NoSection {
                path: self.path.clone(),
                name: name.to_owned(),
            },
            None => CliError::NoCode {
                path: self.path.clone(),
            },
        })
    }

    pub fn grammar(&self, name: Option<&str>) -> Result<Grammar, CliError> {
        let section = self.section(name)?;
        Grammar::read(section.code).map_err(|errors| CliError::Grammar {
            path: self.path.clone(),
            errors,
        })
    }
}

/// Build the automaton and warn about its conflicts
pub fn build(grammar: &Grammar, strength: Strength) -> Automaton {
    let automaton = Automaton::build(grammar, strength);
    let conflicts = automaton.report_conflicts();
    if conflicts > 0 {
        log::warn!("{} conflicts at {}", conflicts, strength);
    }
    automaton
}
