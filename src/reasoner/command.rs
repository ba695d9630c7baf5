//! Reasoner backed by an external program.
//!
//! The world is written to a temporary RDF/XML file whose path replaces
//! `{input}` in the configured arguments. The verdict is read from the
//! program's standard output; standard error belongs to the third-party tool
//! and is only logged at `trace`.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{Reasoner, ReasonerError, Verdict, World};
use crate::config::CommandConfig;

const INPUT_PLACEHOLDER: &str = "{input}";

pub struct CommandReasoner {
    config: CommandConfig,
    pattern: Regex,
}

impl CommandReasoner {
    /// Creates the reasoner, compiling the verdict pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonerError::Pattern`] when `inconsistent_pattern` is not
    /// a valid regex.
    pub fn new(config: CommandConfig) -> Result<Self, ReasonerError> {
        let pattern = Regex::new(&config.inconsistent_pattern)?;
        Ok(Self { config, pattern })
    }

    fn arguments(&self, input: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect()
    }
}

/// Removes the serialised world once the program has finished.
struct TempDocument(PathBuf);

impl TempDocument {
    fn write(content: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("ontoforge-{}.owl", Uuid::new_v4()));
        std::fs::write(&path, content)?;
        Ok(Self(path))
    }
}

impl Drop for TempDocument {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.0) {
            trace!(path = %self.0.display(), error = %err, "could not remove reasoner input");
        }
    }
}

impl Reasoner for CommandReasoner {
    fn name(&self) -> &str {
        &self.config.program
    }

    fn check(&self, world: &World) -> Result<Verdict, ReasonerError> {
        let input = TempDocument::write(&world.to_rdf_xml()?)?;
        let args = self.arguments(&input.0);
        debug!(program = %self.config.program, ?args, "running external reasoner");

        let output = duct::cmd(&self.config.program, &args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| ReasonerError::Command {
                program: self.config.program.clone(),
                message: err.to_string(),
            })?;
        drop(input);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            trace!(program = %self.config.program, stderr = %stderr, "external reasoner stderr");
        }

        if self.pattern.is_match(&stdout) {
            return Ok(Verdict::Inconsistent {
                explanation: strip_banner(&stdout, self.config.explanation_marker.as_deref()),
            });
        }
        if !output.status.success() {
            return Err(ReasonerError::Command {
                program: self.config.program.clone(),
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }
        Ok(Verdict::Consistent)
    }
}

/// Keeps only the text after `marker`, when the marker is present.
#[must_use]
pub fn strip_banner(output: &str, marker: Option<&str>) -> String {
    marker
        .and_then(|marker| output.split_once(marker))
        .map_or(output, |(_, explanation)| explanation)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "This is the output of `pellet explain`:";

    #[test]
    fn strips_banner_before_marker() {
        let output = format!("Loading ontology...\nDone\n{MARKER}\nAxiom: A EquivalentTo not A\n");
        assert_eq!(
            strip_banner(&output, Some(MARKER)),
            "Axiom: A EquivalentTo not A"
        );
        assert_eq!(strip_banner("  plain  ", Some(MARKER)), "plain");
        assert_eq!(strip_banner("plain", None), "plain");
    }

    #[test]
    fn rejects_invalid_patterns() {
        let config = CommandConfig {
            inconsistent_pattern: "(".to_string(),
            ..CommandConfig::default()
        };
        assert!(matches!(
            CommandReasoner::new(config),
            Err(ReasonerError::Pattern(_))
        ));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandReasoner {
        CommandReasoner::new(CommandConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "sh".to_string(), "{input}".to_string()],
            inconsistent_pattern: "(?i)inconsistent".to_string(),
            explanation_marker: Some(MARKER.to_string()),
        })
        .expect("reasoner")
    }

    #[cfg(unix)]
    #[test]
    fn reads_verdict_from_program_output() {
        let world = World::new("https://example.org/people");

        let reasoner = shell("test -f \"$1\" && echo 'Consistent: Yes'");
        assert_eq!(reasoner.check(&world).expect("verdict"), Verdict::Consistent);

        let reasoner = shell(
            "echo banner; echo 'This is the output of `pellet explain`:'; echo 'Inconsistent ontology: A EquivalentTo not A'",
        );
        assert_eq!(
            reasoner.check(&world).expect("verdict"),
            Verdict::Inconsistent {
                explanation: "Inconsistent ontology: A EquivalentTo not A".to_string()
            }
        );

        let reasoner = shell("echo failure >&2; exit 3");
        assert!(matches!(
            reasoner.check(&world),
            Err(ReasonerError::Command { .. })
        ));
    }
}
