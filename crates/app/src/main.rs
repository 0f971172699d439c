use std::{
    convert::Infallible,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use pose_coach_core::{
    Activity, Exercise, LandmarkFrame, ManualClock, Persona, PoseCoachError, RandomPicker,
    SessionConfig, SessionOutput, WorkoutSession, YogaPose,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

fn main() -> pose_coach_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => run_replay(&args),
        Commands::Exercises => list_activities(),
    }
}

/// One line of a recorded landmark stream.
#[derive(Debug, Deserialize)]
struct Record {
    t_ms: u64,
    landmarks: LandmarkFrame,
}

#[derive(Debug, Serialize)]
struct FrameLine<'a> {
    t_ms: u64,
    #[serde(flatten)]
    output: &'a SessionOutput,
}

fn run_replay(args: &ReplayArgs) -> pose_coach_core::Result<()> {
    let config = build_config(args)?;
    tracing::info!(input = ?args.input, activity = ?config.activity, "replaying landmark stream");

    let clock = ManualClock::new();
    let picker = match args.seed {
        Some(seed) => RandomPicker::seeded(seed),
        None => RandomPicker::from_entropy(),
    };
    let mut session = WorkoutSession::new(config, clock.shared(), Box::new(picker))?;

    let reader = BufReader::new(File::open(&args.input)?);
    let stdout = io::stdout();
    replay(&mut session, &clock, reader, stdout.lock(), args.changes_only)
}

/// Feeds every record of `reader` through `session`, writing one JSON line
/// per printed frame and a final summary line to `out`.
fn replay(
    session: &mut WorkoutSession,
    clock: &ManualClock,
    reader: impl BufRead,
    mut out: impl Write,
    changes_only: bool,
) -> pose_coach_core::Result<()> {
    let mut last_key = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(|err| {
            PoseCoachError::Message(format!("line {}: invalid record: {err}", index + 1))
        })?;

        clock.set(Duration::from_millis(record.t_ms));
        let output = session.process(&record.landmarks);

        let key = change_key(&output);
        let changed = last_key.as_ref() != Some(&key);
        last_key = Some(key);
        if changes_only && !changed && !has_advice(&output) {
            continue;
        }

        let frame = FrameLine {
            t_ms: record.t_ms,
            output: &output,
        };
        writeln!(out, "{}", serde_json::to_string(&frame)?)?;
    }

    let summary = session.summary();
    tracing::info!(frames = summary.frames, "replay finished");
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    Ok(())
}

fn build_config(args: &ReplayArgs) -> pose_coach_core::Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SessionConfig::default(),
    };

    if let Some(exercise) = args.exercise {
        config.activity = Activity::Exercise { name: exercise };
    }
    if let Some(pose) = args.pose {
        config.activity = Activity::Yoga { pose };
    }
    if args.meditation {
        config.activity = Activity::Meditation;
    }
    if let Some(persona) = args.persona {
        config.persona = persona;
    }

    config.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> pose_coach_core::Result<SessionConfig> {
    tracing::debug!(?path, "loading session config");
    SessionConfig::load(path)
}

/// Fields whose change makes a frame worth printing in `--changes-only` mode.
fn change_key(output: &SessionOutput) -> (u64, String) {
    match output {
        SessionOutput::Exercise(tick) => (
            u64::from(tick.exercise.count),
            format!("{:?}/{}", tick.exercise.phase, tick.exercise.is_valid),
        ),
        SessionOutput::Yoga(update) => (update.hold_seconds, update.feedback.clone()),
        SessionOutput::Meditation(update) => {
            (u64::from(update.breath_count), update.feedback.clone())
        }
    }
}

fn has_advice(output: &SessionOutput) -> bool {
    matches!(output, SessionOutput::Exercise(tick) if tick.advice.is_some())
}

fn list_activities() -> pose_coach_core::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "exercises:")?;
    for exercise in Exercise::ALL {
        let kind = if exercise.is_hold() { "hold" } else { "reps" };
        writeln!(out, "  {exercise} ({kind})")?;
    }
    writeln!(out, "yoga poses:")?;
    for pose in YogaPose::ALL {
        writeln!(out, "  {pose}")?;
    }
    writeln!(out, "personas:")?;
    for persona in Persona::ALL {
        writeln!(out, "  {persona}")?;
    }
    Ok(())
}

fn parse_exercise(name: &str) -> Result<Exercise, Infallible> {
    Ok(Exercise::from_name_or_default(name))
}

fn parse_persona(name: &str) -> Result<Persona, Infallible> {
    Ok(Persona::from_name_or_default(name))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Posture scoring and coaching for landmark streams",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded JSON-lines landmark stream through a session.
    Replay(ReplayArgs),
    /// List supported exercises, yoga poses and coach personas.
    Exercises,
}

#[derive(clap::Args, Debug)]
struct ReplayArgs {
    /// JSON-lines file of `{ "t_ms": .., "landmarks": [..] }` records.
    input: PathBuf,
    /// Session configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Track this exercise instead of the configured activity.
    #[arg(
        short,
        long,
        value_parser = parse_exercise,
        conflicts_with_all = ["pose", "meditation"]
    )]
    exercise: Option<Exercise>,
    /// Coach persona for feedback wording.
    #[arg(short, long, value_parser = parse_persona)]
    persona: Option<Persona>,
    /// Evaluate this yoga pose.
    #[arg(long, conflicts_with = "meditation")]
    pose: Option<YogaPose>,
    /// Run a meditation session.
    #[arg(long)]
    meditation: bool,
    /// Seed for coach phrase selection.
    #[arg(long)]
    seed: Option<u64>,
    /// Only print frames carrying advice or a change of state.
    #[arg(long)]
    changes_only: bool,
}

#[cfg(test)]
mod tests {
    use pose_coach_core::Landmark;
    use serde_json::Value;

    use super::*;

    fn meditation_session(clock: &ManualClock) -> WorkoutSession {
        let config = SessionConfig {
            activity: Activity::Meditation,
            ..Default::default()
        };
        WorkoutSession::new(config, clock.shared(), Box::new(RandomPicker::seeded(1))).unwrap()
    }

    fn stream(times: &[u64]) -> String {
        let frame = LandmarkFrame::filled(Landmark::new(0.5, 0.5));
        let frame = serde_json::to_string(&frame).unwrap();
        times
            .iter()
            .map(|t_ms| format!(r#"{{"t_ms": {t_ms}, "landmarks": {frame}}}"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn run(input: &str, changes_only: bool) -> pose_coach_core::Result<Vec<Value>> {
        let clock = ManualClock::new();
        let mut session = meditation_session(&clock);
        let mut out = Vec::new();
        replay(&mut session, &clock, input.as_bytes(), &mut out, changes_only)?;
        Ok(String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect())
    }

    #[test]
    fn replay_prints_every_frame_and_a_summary() {
        let lines = run(&stream(&[0, 100, 200]), false).unwrap();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["t_ms"], 0);
        assert_eq!(lines[0]["activity"], "meditation");
        assert_eq!(lines[2]["t_ms"], 200);
        assert_eq!(lines[2]["feedback"], "Good stillness. Focus on breath.");

        let summary = &lines[3];
        assert_eq!(summary["frames"], 3);
        assert_eq!(summary["breath_count"], 0);
        assert_eq!(summary["activity"]["kind"], "meditation");
    }

    #[test]
    fn changes_only_skips_repeated_state() {
        let lines = run(&stream(&[0, 100, 200]), true).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["t_ms"], 0);
        assert_eq!(lines[1]["frames"], 3);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = format!("{}\n\n", stream(&[0]));
        assert_eq!(run(&input, false).unwrap().len(), 2);
    }

    #[test]
    fn malformed_record_names_its_line() {
        let input = format!("{}\nnot json\n{}", stream(&[0]), stream(&[200]));
        let err = run(&input, false).unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{err}");
    }

    #[test]
    fn cli_names_fall_back_leniently() {
        let cli = Cli::try_parse_from([
            "pose-coach",
            "replay",
            "session.jsonl",
            "--exercise",
            "Burpee",
            "--persona",
            "pirate",
        ])
        .unwrap();

        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        let config = build_config(&args).unwrap();
        assert_eq!(
            config.activity,
            Activity::Exercise {
                name: Exercise::Squat
            }
        );
        assert_eq!(config.persona, Persona::Supportive);
    }

    #[test]
    fn cli_parses_replay_overrides() {
        let cli = Cli::try_parse_from([
            "pose-coach",
            "replay",
            "session.jsonl",
            "--exercise",
            "pushups",
            "--persona",
            "drill-sergeant",
            "--seed",
            "7",
        ])
        .unwrap();

        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        let config = build_config(&args).unwrap();
        assert_eq!(
            config.activity,
            Activity::Exercise {
                name: Exercise::Pushup
            }
        );
        assert_eq!(config.persona, Persona::DrillSergeant);
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn cli_rejects_conflicting_activities() {
        let result = Cli::try_parse_from([
            "pose-coach",
            "replay",
            "session.jsonl",
            "--pose",
            "tree",
            "--meditation",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn record_accepts_visibility_alias() {
        let record: Record = serde_json::from_str(
            r#"{"t_ms": 120, "landmarks": [{"x": 0.5, "y": 0.4, "visibility": 0.9}]}"#,
        )
        .unwrap();
        assert_eq!(record.t_ms, 120);
        assert_eq!(record.landmarks.len(), 1);
    }
}
