use std::collections::VecDeque;

use skyfit::domain::{FitOutcome, HalfWidth, LineFit, LineFitFailure, LineList, SessionConfig, Spectrum};
use skyfit::error::{AppError, CalibError};
use skyfit::plot::{Figure, Plotter, PointPicker};
use skyfit::session::{Collaborators, Console, Session, SessionEnd, run_session};

#[derive(Default)]
struct ScriptedConsole {
    input: VecDeque<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    fn new(lines: &[&str]) -> Self {
        Self {
            input: lines.iter().map(|s| s.to_string()).collect(),
            output: Vec::new(),
        }
    }

    fn saw(&self, needle: &str) -> bool {
        self.output.iter().any(|o| o.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>, AppError> {
        Ok(self.input.pop_front())
    }

    fn print(&mut self, text: &str) -> Result<(), AppError> {
        self.output.push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPlotter {
    shown: Vec<String>,
}

impl Plotter for RecordingPlotter {
    fn render(&mut self, figure: &Figure) -> Result<(), AppError> {
        self.shown.push(figure.title.clone());
        Ok(())
    }
}

impl PointPicker for RecordingPlotter {
    fn pick_points(&mut self, _: &Spectrum, _: &[f64]) -> Result<Vec<f64>, AppError> {
        Ok(Vec::new())
    }
}

/// Three good lines and one that never converges.
fn sky_line_fitter(_: &Spectrum, centre: f64, _: f64) -> FitOutcome {
    let fwhm = match centre {
        c if c == 5500.0 => 2.1,
        c if c == 6200.0 => 2.3,
        c if c == 7000.0 => 2.6,
        _ => return FitOutcome::Failure(LineFitFailure::NoConvergence),
    };
    FitOutcome::Success(LineFit {
        center: centre,
        fwhm,
        fwhm_err: 0.1,
        profile: vec![(centre - 1.0, 0.0), (centre, 1.0), (centre + 1.0, 0.0)],
    })
}

fn scenario_session() -> Session {
    let x: Vec<f64> = (0..=4000).map(|i| 5000.0 + i as f64).collect();
    let n = x.len();
    let spectrum = Spectrum::new(x, vec![1.0; n], vec![0.1; n]).unwrap();

    let mut session = Session::new(SessionConfig::default());
    session.set_spectrum(spectrum);
    session.set_lines(Some(LineList::from_values([5500.0, 6200.0, 7000.0, 7800.0])));
    session
}

fn drive(session: &mut Session, script: &[&str]) -> (SessionEnd, ScriptedConsole, RecordingPlotter) {
    let mut console = ScriptedConsole::new(script);
    let mut plotter = RecordingPlotter::default();
    let mut tools = Collaborators {
        fitter: &sky_line_fitter,
        plotter: &mut plotter,
    };
    let end = run_session(session, &mut console, &mut tools).unwrap();
    (end, console, plotter)
}

#[test]
fn calibration_scenario() {
    let mut session = scenario_session();
    let script = [
        "3", // fit workflow
        "4", "5", // dX = 5
        "1", // run fit
        "2", // plot fit
        "3", "6000", "3", "9500", "7", "7", "y",
    ];
    let (end, console, plotter) = drive(&mut session, &script);

    assert_eq!(end, SessionEnd::Quit);
    assert!(console.saw("3 of 4 succeeded"));
    assert!(console.saw("failed: no convergence"));
    assert_eq!(plotter.shown, vec!["Line profile fits", "Resolution model (degree 1)"]);
    assert!(console.saw("error: wavelength 9500 is outside the spectrum"));

    let run = session.last_fit().unwrap();
    assert_eq!(run.half_width, 5.0);
    assert_eq!(run.points.len(), 3);
    let at_6000 = session.interpolate(6000.0).unwrap();
    assert!(at_6000.resolution > 2.1 && at_6000.resolution < 2.6);
    assert!((at_6000.resolving_power - 6000.0 / at_6000.resolution).abs() < 1e-9);
}

#[test]
fn changing_dx_drops_the_model() {
    let mut session = scenario_session();
    let script = ["3", "4", "5", "1", "4", "0", "-1", "101", "3", "2", "7", "7", "y"];
    let (_, console, plotter) = drive(&mut session, &script);

    assert_eq!(session.config().half_width, HalfWidth::Fixed(3.0));
    assert!(session.last_fit().is_none());
    assert_eq!(console.output.iter().filter(|o| o.starts_with("error: dX must be")).count(), 3);
    assert!(console.saw("error: no resolution model yet"));
    assert!(plotter.shown.is_empty());
}

#[test]
fn too_few_lines_keeps_previous_model() {
    let mut session = scenario_session();
    // Degree 3 needs four good lines; only three fit.
    let script = ["3", "5", "3", "1", "7", "7", "y"];
    let (_, console, _) = drive(&mut session, &script);
    assert!(console.saw("only 3 line fit(s) succeeded; a degree 3 polynomial needs at least 4"));
    assert!(session.last_fit().is_none());

    session.set_degree(1).unwrap();
    session.run_fit(&sky_line_fitter).unwrap();
    let all_fail = |_: &Spectrum, _: f64, _: f64| FitOutcome::Failure(LineFitFailure::NonPhysical);
    assert!(matches!(
        session.run_fit(&all_fail),
        Err(CalibError::InsufficientData { successes: 0, required: 2, .. })
    ));
    assert_eq!(session.last_fit().map(|run| run.points.len()), Some(3));
}

#[test]
fn lines_round_trip_through_the_lines_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        lines_file: dir.path().join("skyline_table.dat"),
        ..SessionConfig::default()
    };
    let mut session = Session::new(config);

    // Nothing to write or read yet.
    let (_, console, _) = drive(&mut session, &["5", "4", "7", "y"]);
    assert!(console.saw("error: no lines yet"));
    assert!(console.saw("error: could not find file"));

    session.set_lines(Some(LineList::from_values([7000.0, 5500.125, 6200.5])));
    let (_, console, _) = drive(&mut session, &["5", "6", "2", "CONFIRM", "4", "7", "y"]);
    assert!(console.saw("3 lines written to"));
    assert!(console.saw("All lines cleared"));
    assert!(console.saw("3 lines read from"));
    assert_eq!(session.lines().unwrap().values(), &[5500.125, 6200.5, 7000.0]);
}

#[test]
fn every_submenu_exit_returns_to_top() {
    let mut session = scenario_session();
    let script = [
        "1", "2", // load menu
        "3", "7", // fit menu
        "6", "3", // edit menu
        "6", "2", "no", "3", // cancelled clear, back in edit menu
        "7", "n", // quit declined
        "2", // identify
        "7", "y",
    ];
    let (end, console, _) = drive(&mut session, &script);
    assert_eq!(end, SessionEnd::Quit);
    assert!(console.saw("Clear cancelled"));
    assert_eq!(session.lines().map(LineList::len), Some(4));
    assert_eq!(console.output.iter().filter(|o| o.starts_with("FIT-SKYLINES")).count(), 7);
}

#[test]
fn end_of_input_inside_a_prompt_interrupts() {
    let mut session = scenario_session();
    let (end, _, _) = drive(&mut session, &["3", "4"]);
    assert_eq!(end, SessionEnd::Interrupted);
    assert_eq!(session.config().half_width, HalfWidth::Auto);
}
