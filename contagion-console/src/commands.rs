//! Administration commands and the sandbox session they run against.
//!
//! Script lines are matched against a small regex grammar. A command that
//! fails validation reports an error line and leaves the session untouched.

use contagion_engine::{
    CloudSpec, DiseaseEngine, DiseaseEvent, EntityId, EntityKind, Position, ReportKind,
    SandboxWorld, Vitals, render_report,
};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_STAGE: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("malformed `{verb}` command: {line}")]
    Syntax { verb: String, line: String },
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("no entity matches `{0}`")]
    UnknownTarget(String),
    #[error("unknown disease `{0}`")]
    UnknownDisease(String),
    #[error("{0} cannot carry diseases")]
    NotACarrier(EntityId),
    #[error("{0} is not a surface")]
    NotASurface(EntityId),
    #[error("an entity named `{0}` already exists")]
    DuplicateName(String),
    #[error("command grammar failed to compile: {0}")]
    Grammar(String),
}

/// Entity reference: `#<id>` or a sandbox name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(EntityId),
    Name(String),
}

impl Target {
    fn parse(token: &str) -> Result<Self, CommandError> {
        match token.strip_prefix('#') {
            Some(raw) => raw
                .parse::<u64>()
                .map(|id| Self::Id(EntityId::new(id)))
                .map_err(|_| CommandError::InvalidNumber(token.to_string())),
            None => Ok(Self::Name(token.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Spawn {
        name: String,
        position: Position,
    },
    Surface {
        name: String,
        position: Position,
    },
    Infect {
        target: Target,
        disease: String,
        stage: Option<u32>,
    },
    Vaccinate {
        target: Target,
        disease: String,
    },
    Advance {
        seconds: f64,
    },
    Diagnose {
        target: Target,
    },
    Contact {
        first: Target,
        second: Target,
    },
    Touch {
        mob: Target,
        surface: Target,
    },
    Cloud {
        position: Position,
        disease: String,
    },
}

const NUMBER: &str = r"-?\d+(?:\.\d+)?";
const TOKEN: &str = r"#?[A-Za-z0-9_\-]+";

struct Grammar {
    verb: Regex,
    rules: Vec<(&'static str, Regex)>,
}

impl Grammar {
    fn compile() -> Result<Self, regex::Error> {
        let rules = [
            ("spawn", format!(r"^spawn\s+({TOKEN})\s+({NUMBER})\s+({NUMBER})$")),
            (
                "surface",
                format!(r"^surface\s+({TOKEN})\s+({NUMBER})\s+({NUMBER})$"),
            ),
            ("infect", format!(r"^infect\s+({TOKEN})\s+({TOKEN})(?:\s+(\d+))?$")),
            ("vaccinate", format!(r"^vaccinate\s+({TOKEN})\s+({TOKEN})$")),
            ("advance", format!(r"^advance\s+({NUMBER})$")),
            ("diagnose", format!(r"^diagnose\s+({TOKEN})$")),
            ("contact", format!(r"^contact\s+({TOKEN})\s+({TOKEN})$")),
            ("touch", format!(r"^touch\s+({TOKEN})\s+({TOKEN})$")),
            (
                "cloud",
                format!(r"^cloud\s+({NUMBER})\s+({NUMBER})\s+({TOKEN})$"),
            ),
        ]
        .into_iter()
        .map(|(verb, pattern)| Regex::new(&pattern).map(|re| (verb, re)))
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            verb: Regex::new(r"^([a-z]+)")?,
            rules,
        })
    }
}

fn grammar() -> Result<&'static Grammar, CommandError> {
    static GRAMMAR: OnceLock<Result<Grammar, String>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| Grammar::compile().map_err(|err| err.to_string()))
        .as_ref()
        .map_err(|err| CommandError::Grammar(err.clone()))
}

fn number(caps: &Captures<'_>, index: usize) -> Result<f64, CommandError> {
    let raw = caps.get(index).map_or("", |m| m.as_str());
    raw.parse::<f64>()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

#[allow(clippy::cast_possible_truncation)]
fn position(caps: &Captures<'_>, x: usize, y: usize) -> Result<Position, CommandError> {
    Ok(Position::new(number(caps, x)? as f32, number(caps, y)? as f32))
}

fn text(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map_or_else(String::new, |m| m.as_str().to_string())
}

fn target(caps: &Captures<'_>, index: usize) -> Result<Target, CommandError> {
    Target::parse(&text(caps, index))
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
///
/// # Errors
///
/// Returns an error for unknown verbs, malformed arguments or bad numbers.
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let grammar = grammar()?;
    let verb = grammar
        .verb
        .captures(line)
        .map_or_else(|| line.to_string(), |caps| text(&caps, 1));
    let Some((_, rule)) = grammar.rules.iter().find(|(name, _)| *name == verb) else {
        return Err(CommandError::UnknownCommand(verb));
    };
    let caps = rule.captures(line).ok_or_else(|| CommandError::Syntax {
        verb: verb.clone(),
        line: line.to_string(),
    })?;

    let command = match verb.as_str() {
        "spawn" => Command::Spawn {
            name: text(&caps, 1),
            position: position(&caps, 2, 3)?,
        },
        "surface" => Command::Surface {
            name: text(&caps, 1),
            position: position(&caps, 2, 3)?,
        },
        "infect" => Command::Infect {
            target: target(&caps, 1)?,
            disease: text(&caps, 2),
            stage: caps
                .get(3)
                .map(|m| {
                    m.as_str()
                        .parse::<u32>()
                        .map_err(|_| CommandError::InvalidNumber(m.as_str().to_string()))
                })
                .transpose()?,
        },
        "vaccinate" => Command::Vaccinate {
            target: target(&caps, 1)?,
            disease: text(&caps, 2),
        },
        "advance" => Command::Advance {
            seconds: number(&caps, 1)?,
        },
        "diagnose" => Command::Diagnose {
            target: target(&caps, 1)?,
        },
        "contact" => Command::Contact {
            first: target(&caps, 1)?,
            second: target(&caps, 2)?,
        },
        "touch" => Command::Touch {
            mob: target(&caps, 1)?,
            surface: target(&caps, 2)?,
        },
        "cloud" => Command::Cloud {
            position: position(&caps, 1, 2)?,
            disease: text(&caps, 3),
        },
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

/// Totals accumulated across the engine updates of one `advance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceTotals {
    pub ticks: u64,
    pub infections: usize,
    pub stage_changes: usize,
    pub symptoms_fired: usize,
    pub cures: usize,
}

/// A sandbox world driven by one engine.
pub struct Session {
    world: SandboxWorld,
    engine: DiseaseEngine,
    clock: f64,
}

impl Session {
    pub fn new(engine: DiseaseEngine) -> Self {
        Self {
            world: SandboxWorld::new(),
            engine,
            clock: 0.0,
        }
    }

    pub const fn world(&self) -> &SandboxWorld {
        &self.world
    }

    pub const fn world_mut(&mut self) -> &mut SandboxWorld {
        &mut self.world
    }

    pub const fn engine(&self) -> &DiseaseEngine {
        &self.engine
    }

    pub const fn clock(&self) -> f64 {
        self.clock
    }

    /// Resolve `target` to an existing entity.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownTarget`] when nothing matches.
    pub fn resolve(&self, target: &Target) -> Result<EntityId, CommandError> {
        match target {
            Target::Id(id) => self
                .world
                .entity(*id)
                .map(|_| *id)
                .ok_or_else(|| CommandError::UnknownTarget(id.to_string())),
            Target::Name(name) => self
                .world
                .find(name)
                .ok_or_else(|| CommandError::UnknownTarget(name.clone())),
        }
    }

    fn known_disease(&self, disease: &str) -> Result<(), CommandError> {
        if self.engine.catalog().disease(disease).is_some() {
            Ok(())
        } else {
            Err(CommandError::UnknownDisease(disease.to_string()))
        }
    }

    fn carrier(&self, target: &Target) -> Result<EntityId, CommandError> {
        let id = self.resolve(target)?;
        if self.world.can_carry(id) {
            Ok(id)
        } else {
            Err(CommandError::NotACarrier(id))
        }
    }

    fn unique_name(&self, name: &str) -> Result<(), CommandError> {
        if self.world.find(name).is_some() {
            Err(CommandError::DuplicateName(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// Infect `target`, reporting the stage the carrier ends up at.
    ///
    /// # Errors
    ///
    /// Returns an error if the target or disease is unknown or the target cannot carry.
    pub fn infect(
        &mut self,
        target: &Target,
        disease: &str,
        stage: Option<u32>,
    ) -> Result<String, CommandError> {
        self.known_disease(disease)?;
        let id = self.carrier(target)?;
        let requested = stage.unwrap_or(DEFAULT_STAGE);
        if !self.engine.infect(&self.world, id, disease, requested) {
            return Err(CommandError::NotACarrier(id));
        }
        let stage = self.engine.stage(id, disease).unwrap_or(requested);
        Ok(format!("infected {id} with {disease} at stage {stage}"))
    }

    /// Vaccinate `target` against `disease`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target or disease is unknown or the target cannot carry.
    pub fn vaccinate(&mut self, target: &Target, disease: &str) -> Result<String, CommandError> {
        self.known_disease(disease)?;
        let id = self.carrier(target)?;
        if !self.engine.vaccinate(&mut self.world, id, disease) {
            return Err(CommandError::NotACarrier(id));
        }
        Ok(format!("vaccinated {id} against {disease}"))
    }

    /// Step the engine forward `seconds`, one configured tick interval at a time.
    pub fn advance(&mut self, seconds: f64) -> AdvanceTotals {
        self.advance_with(seconds, |clock, event| {
            log::debug!("t={clock:.1}s {event:?}");
        })
    }

    /// Like [`Self::advance`], handing every drained engine event to `observe`.
    pub fn advance_with<F>(&mut self, seconds: f64, mut observe: F) -> AdvanceTotals
    where
        F: FnMut(f64, &DiseaseEvent),
    {
        let mut totals = AdvanceTotals::default();
        let step = self.engine.config().tick_interval_secs;
        let step = if step > 0.0 { step } else { seconds };
        let end = self.clock + seconds.max(0.0);
        while self.clock < end {
            let next = (self.clock + step).min(end);
            self.world.advance(next - self.clock);
            let summary = self.engine.update(&mut self.world, next);
            self.clock = next;
            totals.ticks += 1;
            totals.infections += summary.infections;
            totals.stage_changes += summary.stage_changes;
            totals.symptoms_fired += summary.symptoms_fired;
            totals.cures += summary.cures;
            for event in self.engine.drain_events() {
                observe(self.clock, &event);
            }
        }
        totals
    }

    /// Run one parsed command and describe its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the command's arguments do not resolve; nothing is changed then.
    pub fn execute(&mut self, command: &Command) -> Result<String, CommandError> {
        match command {
            Command::Spawn { name, position } => {
                self.unique_name(name)?;
                let id = self.world.spawn_mob(name, *position);
                Ok(format!(
                    "spawned {id} {name} at ({}, {})",
                    position.x, position.y
                ))
            }
            Command::Surface { name, position } => {
                self.unique_name(name)?;
                let id = self.world.spawn_surface(name, *position);
                Ok(format!(
                    "placed surface {id} {name} at ({}, {})",
                    position.x, position.y
                ))
            }
            Command::Infect {
                target,
                disease,
                stage,
            } => self.infect(target, disease, *stage),
            Command::Vaccinate { target, disease } => self.vaccinate(target, disease),
            Command::Advance { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    return Err(CommandError::InvalidNumber(seconds.to_string()));
                }
                let totals = self.advance(*seconds);
                Ok(format!(
                    "advanced to {:.1}s: {} infections, {} stage changes, {} symptoms, {} cures",
                    self.clock,
                    totals.infections,
                    totals.stage_changes,
                    totals.symptoms_fired,
                    totals.cures
                ))
            }
            Command::Diagnose { target } => {
                let id = self.resolve(target)?;
                let subject = self.world.name(id).map(str::to_string);
                let sample = self.engine.sample(id, subject);
                let report = render_report(self.engine.catalog(), &sample, ReportKind::Diagnoser);
                Ok(report.trim_end().to_string())
            }
            Command::Contact { first, second } => {
                let first = self.resolve(first)?;
                let second = self.resolve(second)?;
                let infections = self.engine.contact(&self.world, first, second);
                Ok(format!(
                    "contact {first} <-> {second}: {infections} new infections"
                ))
            }
            Command::Touch { mob, surface } => {
                let mob = self.carrier(mob)?;
                let surface = self.resolve(surface)?;
                if self
                    .world
                    .entity(surface)
                    .is_none_or(|entity| entity.kind != EntityKind::Surface)
                {
                    return Err(CommandError::NotASurface(surface));
                }
                let infections = self.engine.touch_surface(&self.world, mob, surface);
                Ok(format!(
                    "touch {mob} -> {surface}: {infections} new infections"
                ))
            }
            Command::Cloud { position, disease } => {
                self.known_disease(disease)?;
                let spec = CloudSpec::from_config(self.engine.config());
                let cloud = self
                    .engine
                    .spawn_cloud(*position, vec![disease.clone()], spec);
                Ok(format!(
                    "spawned {cloud} at ({}, {}) carrying {disease}",
                    position.x, position.y
                ))
            }
        }
    }

    /// Parse and run one line. Comments and blank lines produce no output.
    pub fn run_line(&mut self, line: &str) -> Option<String> {
        let outcome = parse_line(line).and_then(|command| {
            command
                .map(|command| self.execute(&command))
                .transpose()
        });
        match outcome {
            Ok(output) => output,
            Err(err) => {
                log::warn!("script line `{}` failed: {err}", line.trim());
                Some(format!("error: {err}"))
            }
        }
    }

    /// Run every line of `source`, collecting one result per command.
    pub fn run_script(&mut self, source: &str) -> Vec<String> {
        source
            .lines()
            .filter_map(|line| self.run_line(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(DiseaseEngine::with_default_catalog())
    }

    #[test]
    fn parses_every_verb() {
        let cases = [
            "spawn alice 1 2",
            "surface table 0 0.5",
            "infect alice common_cold 2",
            "infect #1 common_cold",
            "vaccinate alice space_flu",
            "advance 10",
            "diagnose #3",
            "contact alice bob",
            "touch alice table",
            "cloud -1.5 2 space_flu",
        ];
        for line in cases {
            assert!(
                matches!(parse_line(line), Ok(Some(_))),
                "failed to parse `{line}`"
            );
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert_eq!(parse_line("# a note"), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn infect_line_captures_optional_stage() {
        assert_eq!(
            parse_line("infect #4 bleeders 2"),
            Ok(Some(Command::Infect {
                target: Target::Id(EntityId::new(4)),
                disease: "bleeders".to_string(),
                stage: Some(2),
            }))
        );
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(
            parse_line("teleport alice"),
            Err(CommandError::UnknownCommand("teleport".to_string()))
        );
        assert!(matches!(
            parse_line("spawn alice here there"),
            Err(CommandError::Syntax { .. })
        ));
        assert!(matches!(
            parse_line("diagnose #x"),
            Err(CommandError::InvalidNumber(_))
        ));
    }

    #[test]
    fn infect_and_vaccinate_report_outcomes() {
        let mut session = session();
        assert_eq!(
            session.run_line("spawn alice 0 0").as_deref(),
            Some("spawned #1 alice at (0, 0)")
        );
        assert_eq!(
            session.run_line("infect alice common_cold 9").as_deref(),
            Some("infected #1 with common_cold at stage 3")
        );
        assert_eq!(
            session.run_line("vaccinate #1 common_cold").as_deref(),
            Some("vaccinated #1 against common_cold")
        );
        assert!(!session.engine().is_infected(EntityId::new(1), "common_cold"));
    }

    #[test]
    fn failed_commands_leave_state_unchanged() {
        let mut session = session();
        session.run_line("spawn alice 0 0");
        session.run_line("surface table 1 0");

        let unknown = session.run_line("infect alice no_such_thing");
        assert_eq!(
            unknown.as_deref(),
            Some("error: unknown disease `no_such_thing`")
        );
        let surface = session.run_line("infect table common_cold");
        assert_eq!(surface.as_deref(), Some("error: #2 cannot carry diseases"));
        let duplicate = session.run_line("spawn alice 3 3");
        assert!(duplicate.is_some_and(|line| line.starts_with("error:")));

        assert_eq!(session.engine().carriers().count(), 0);
        assert_eq!(session.world().mobs().count(), 1);
    }

    #[test]
    fn touch_requires_a_surface() {
        let mut session = session();
        session.run_line("spawn alice 0 0");
        session.run_line("spawn bob 1 0");
        assert_eq!(
            session.run_line("touch alice bob").as_deref(),
            Some("error: #2 is not a surface")
        );
    }

    #[test]
    fn advance_moves_the_clock_in_tick_steps() {
        let mut session = session();
        session.run_line("spawn alice 0 0");
        session.run_line("infect alice common_cold");
        let interval = session.engine().config().tick_interval_secs;
        let totals = session.advance(interval * 3.0);
        assert_eq!(totals.ticks, 3);
        assert!((session.clock() - interval * 3.0).abs() < 1e-9);
    }

    #[test]
    fn diagnose_prints_the_subject_report() {
        let mut session = session();
        session.run_script("spawn alice 0 0\ninfect alice common_cold\n");
        let report = session.run_line("diagnose alice").unwrap_or_default();
        assert!(report.contains("Subject: alice"));
        assert!(report.contains("Common Cold"));
    }

    #[test]
    fn script_collects_one_result_per_command() {
        let mut session = session();
        let output = session.run_script(
            "# setup\nspawn alice 0 0\nsurface table 1 1\n\ncloud 0 0 space_flu\nbogus\n",
        );
        assert_eq!(output.len(), 4);
        assert_eq!(output[2], "spawned cloud-1 at (0, 0) carrying space_flu");
        assert!(output[3].starts_with("error: unknown command"));
    }
}
